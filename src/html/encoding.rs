//! 字符编码检测模块
//!
//! Word导出的HTML常见为Shift_JIS或UTF-8，这里做尽力而为的检测与解码。

use encoding_rs::{Encoding, SHIFT_JIS, UTF_16BE, UTF_16LE, UTF_8};

/// 在文档开头查找charset声明的字节数
const SNIFF_LIMIT: usize = 4096;

/// 解码结果
#[derive(Debug, Clone)]
pub struct Decoded {
    /// 解码后的文本
    pub text: String,
    /// 实际使用的编码
    pub encoding: &'static Encoding,
    /// 是否丢弃了无法解码的字节
    pub had_errors: bool,
}

/// 检测编码并解码字节流
///
/// 检测顺序：
/// 1. BOM
/// 2. 合法的UTF-8
/// 3. 文档头部`charset=`声明
/// 4. 回退到Shift_JIS
///
/// 无法解码的字节序列会被直接丢弃，不会报错。
pub fn decode(bytes: &[u8]) -> Decoded {
    let encoding = detect_encoding(bytes);
    let (text, _, had_errors) = encoding.decode(bytes);

    let text = if had_errors {
        text.chars().filter(|&c| c != '\u{FFFD}').collect()
    } else {
        text.into_owned()
    };

    Decoded {
        text,
        encoding,
        had_errors,
    }
}

/// 只检测编码，不解码
pub fn detect_encoding(bytes: &[u8]) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return encoding;
    }

    if std::str::from_utf8(bytes).is_ok() {
        return UTF_8;
    }

    match sniff_charset(bytes) {
        // 没有BOM的UTF-16声明按HTML规则视为UTF-8，而字节流又不是合法UTF-8
        Some(encoding) if encoding == UTF_16LE || encoding == UTF_16BE => SHIFT_JIS,
        Some(encoding) => encoding,
        None => SHIFT_JIS,
    }
}

/// 从文档头部查找`charset=`声明
fn sniff_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(SNIFF_LIMIT)];
    let head = String::from_utf8_lossy(head).to_ascii_lowercase();

    let start = head.find("charset=")? + "charset=".len();
    let label: String = head[start..]
        .trim_start_matches(['"', '\''])
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
        .collect();

    Encoding::for_label(label.as_bytes())
}
