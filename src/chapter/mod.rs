//! 章节模块
//!
//! 章节切分、清理流水线以及注音(ruby)合成。

pub mod cleanup;
pub mod ruby;
pub mod segment;

use crate::html::Node;

pub use cleanup::{clean_chapter, StyleHints};
pub use ruby::synthesize_ruby;
pub use segment::{split_chapters, TitleParts};

/// 从文档中切分出的一个章节
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    /// 从1开始的章节序号
    pub index: usize,
    /// 目录中显示的标题
    pub title: String,
    /// 章节独占的节点序列，第一个节点为标记段落
    pub nodes: Vec<Node>,
}

impl Chapter {
    /// 章节文件名，如`content-01.xhtml`
    pub fn filename(&self) -> String {
        format!("content-{:02}.xhtml", self.index)
    }

    /// 清单中使用的ID
    pub fn manifest_id(&self) -> String {
        format!("chap{}", self.index)
    }
}
