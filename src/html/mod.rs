//! HTML输入模块
//!
//! 字符编码检测、HTML解析以及标记树。

pub mod encoding;
pub mod node;
pub mod parse;

pub use encoding::{decode, Decoded};
pub use node::{Element, Node};
pub use parse::{parse_document, preprocess};
