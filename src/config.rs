//! 转换配置模块
//!
//! 集中管理章节切分与清理流程使用的启发式常量。

use serde::{Deserialize, Serialize};

/// 默认的章节标记类名
pub const DEFAULT_MARKER: &str = "CHAPTER";

/// 默认的外文片段语言标记
pub const DEFAULT_FOREIGN_LANG: &str = "EN-US";

/// 转换选项
///
/// 所有字段都有默认值，命令行只覆盖其中的一部分。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// 章节标记段落的class中包含的字符串
    pub marker: String,
    /// 外文片段(`<span lang=...>`)的语言属性值
    pub foreign_lang: String,
    /// Word私有样式前缀
    pub vendor_prefix: String,
    /// 需要展开的命名空间段落注释元素
    pub annotation_tags: Vec<String>,
    /// 无意义空格片段的样式标记
    pub spacerun_marker: String,
    /// 段落上的默认样式类名
    pub normal_class: String,
    /// 样式表文件名
    pub stylesheet: String,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER.to_string(),
            foreign_lang: DEFAULT_FOREIGN_LANG.to_string(),
            vendor_prefix: "mso-".to_string(),
            annotation_tags: vec!["o:p".to_string()],
            spacerun_marker: "mso-spacerun:yes".to_string(),
            normal_class: "MsoNormal".to_string(),
            stylesheet: "style.css".to_string(),
        }
    }
}

impl ConvertOptions {
    /// 设置章节标记
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    /// 设置外文片段语言标记
    pub fn with_foreign_lang(mut self, lang: impl Into<String>) -> Self {
        self.foreign_lang = lang.into();
        self
    }

    /// 检查标签名是否为需要展开的段落注释元素
    pub fn is_annotation_tag(&self, name: &str) -> bool {
        self.annotation_tags.iter().any(|tag| tag == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = ConvertOptions::default();
        assert_eq!(options.marker, "CHAPTER");
        assert_eq!(options.foreign_lang, "EN-US");
        assert!(options.is_annotation_tag("o:p"));
        assert!(!options.is_annotation_tag("p"));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let options: ConvertOptions = serde_yml::from_str("marker: TITLE\n").unwrap();
        assert_eq!(options.marker, "TITLE");
        assert_eq!(options.normal_class, "MsoNormal");
    }
}
