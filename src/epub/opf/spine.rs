//! 脊柱模块
//!
//! 提供EPUB包中阅读顺序（脊柱）的结构定义。

use std::fmt;

/// 脊柱项信息(阅读顺序)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpineItem {
    /// 引用的清单项ID
    pub idref: String,
    /// 是否线性阅读
    pub linear: bool,
}

impl SpineItem {
    /// 创建新的脊柱项
    pub fn new(idref: impl Into<String>) -> Self {
        Self {
            idref: idref.into(),
            linear: true,
        }
    }
}

/// 翻页方向
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PageProgression {
    /// 从右向左(竖排日文)
    #[default]
    Rtl,
    /// 从左向右
    Ltr,
}

impl PageProgression {
    /// 解析属性值，无法识别时回退到`rtl`
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "ltr" => PageProgression::Ltr,
            _ => PageProgression::Rtl,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PageProgression::Rtl => "rtl",
            PageProgression::Ltr => "ltr",
        }
    }
}

impl fmt::Display for PageProgression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
