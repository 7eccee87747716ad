//! 清理流水线模块
//!
//! 每一步都是纯函数：消费旧的节点序列，返回新的节点序列。
//! 步骤按固定顺序执行：
//! 1. 删除重复的标题片段
//! 2. 删除游离的外文片段
//! 3. 删除Word残留标记
//! 4. 把内联样式改写为语义标记(标记段落除外，最后单独处理)

use tracing::debug;

use crate::chapter::segment::{is_foreign_run, TitleParts};
use crate::chapter::Chapter;
use crate::config::ConvertOptions;
use crate::html::{Element, Node};

/// 清理步骤
pub type Pass = fn(Vec<Node>, &ConvertOptions) -> Vec<Node>;

/// 按执行顺序排列的章节级清理步骤
pub const PASSES: [(&str, Pass); 4] = [
    ("duplicate-title", remove_duplicate_title),
    ("orphan-foreign-runs", remove_orphan_foreign_runs),
    ("authoring-garbage", remove_authoring_garbage),
    ("style-rewrite", rewrite_styles),
];

/// 样式声明中识别出的装饰性关键字
///
/// 只做子串匹配，不解析CSS。
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StyleHints {
    /// 含有Word私有前缀
    pub vendor: bool,
    /// 声明了`font-size`或`font-family`
    pub font: bool,
    /// 斜体
    pub italic: bool,
    /// 粗体
    pub bold: bool,
}

impl StyleHints {
    pub fn from_style(style: &str, vendor_prefix: &str) -> Self {
        Self {
            vendor: !vendor_prefix.is_empty() && style.contains(vendor_prefix),
            font: style.contains("font-size") || style.contains("font-family"),
            italic: style.contains("italic"),
            bold: style.contains("bold"),
        }
    }
}

/// 对章节执行完整的清理流水线
pub fn clean_chapter(mut chapter: Chapter, options: &ConvertOptions) -> Chapter {
    for (name, pass) in PASSES {
        let before = chapter.nodes.len();
        chapter.nodes = pass(chapter.nodes, options);
        debug!(
            "章节 {} [{}]: {} -> {} 个节点",
            chapter.index,
            name,
            before,
            chapter.nodes.len()
        );
    }

    chapter.nodes = clean_title_paragraph(chapter.nodes, options);
    chapter
}

/// 删除标题后重复出现的标题片段
///
/// 第一个节点不是段落时不做处理。
pub fn remove_duplicate_title(nodes: Vec<Node>, options: &ConvertOptions) -> Vec<Node> {
    let parts = match nodes.first() {
        Some(Node::Element(first)) if first.name == "p" => TitleParts::from_marker(first, options),
        _ => return nodes,
    };

    let mut iter = nodes.into_iter();
    let mut result: Vec<Node> = iter.next().into_iter().collect();
    result.extend(iter.filter(|node| !is_duplicate_title(node, &parts, options)));
    result
}

fn is_duplicate_title(node: &Node, parts: &TitleParts, options: &ConvertOptions) -> bool {
    let Node::Element(element) = node else {
        return false;
    };
    if element.name != "span" {
        return false;
    }

    let text = element.stripped_text();
    let en_duplicate = !parts.en_text.is_empty()
        && is_foreign_run(element, &options.foreign_lang)
        && text == parts.en_text;
    let jp_duplicate = !parts.jp_text.is_empty() && text == parts.jp_text;

    en_duplicate || jp_duplicate
}

/// 删除段落之外游离的外文片段(无论是否为空白)
pub fn remove_orphan_foreign_runs(nodes: Vec<Node>, options: &ConvertOptions) -> Vec<Node> {
    nodes
        .into_iter()
        .filter(|node| {
            !node
                .as_element()
                .is_some_and(|e| is_foreign_run(e, &options.foreign_lang))
        })
        .collect()
}

/// 删除Word残留：段落注释元素、空格占位片段、默认段落样式类
pub fn remove_authoring_garbage(nodes: Vec<Node>, options: &ConvertOptions) -> Vec<Node> {
    nodes
        .into_iter()
        .filter_map(|node| match node {
            Node::Element(element) if options.is_annotation_tag(&element.name) => None,
            Node::Element(element) if is_spacerun(&element, options) => None,
            Node::Element(mut element) => {
                if element.name == "p" && element.attr("class") == Some(options.normal_class.as_str()) {
                    element.remove_attr("class");
                }
                element.children = remove_authoring_garbage(std::mem::take(&mut element.children), options);
                Some(Node::Element(element))
            }
            text => Some(text),
        })
        .collect()
}

fn is_spacerun(element: &Element, options: &ConvertOptions) -> bool {
    element.name == "span"
        && element
            .attr("style")
            .is_some_and(|style| style.contains(&options.spacerun_marker))
}

/// 样式改写(跳过第一个节点，即标记段落)
pub fn rewrite_styles(nodes: Vec<Node>, options: &ConvertOptions) -> Vec<Node> {
    let mut iter = nodes.into_iter();
    let mut result: Vec<Node> = iter.next().into_iter().collect();
    result.extend(rewrite_nodes(iter.collect(), options));
    result
}

/// 对标记段落内部的片段做同样的样式改写
pub fn clean_title_paragraph(mut nodes: Vec<Node>, options: &ConvertOptions) -> Vec<Node> {
    if let Some(Node::Element(first)) = nodes.first_mut() {
        if first.name == "p" {
            first.children = rewrite_nodes(std::mem::take(&mut first.children), options);
        }
    }
    nodes
}

/// 递归改写节点序列中的所有`<span>`
pub fn rewrite_nodes(nodes: Vec<Node>, options: &ConvertOptions) -> Vec<Node> {
    let mut result = Vec::with_capacity(nodes.len());

    for node in nodes {
        match node {
            Node::Element(element) if element.name == "span" => {
                if let Some(rewritten) = rewrite_span(element, options) {
                    result.push(rewritten);
                }
            }
            Node::Element(mut element) => {
                element.children = rewrite_nodes(std::mem::take(&mut element.children), options);
                result.push(Node::Element(element));
            }
            text => result.push(text),
        }
    }

    result
}

/// 按优先级改写单个片段，返回`None`表示删除
fn rewrite_span(span: Element, options: &ConvertOptions) -> Option<Node> {
    let text = span.text_content();
    if text.trim().is_empty() {
        return None;
    }

    let hints = StyleHints::from_style(span.attr("style").unwrap_or_default(), &options.vendor_prefix);

    if hints.vendor {
        None
    } else if hints.font {
        Some(Node::text(text))
    } else if hints.italic {
        Some(Node::element_with_text("em", text))
    } else if hints.bold {
        Some(Node::element_with_text("strong", text))
    } else if is_foreign_run(&span, &options.foreign_lang) {
        Some(Node::Element(span))
    } else {
        Some(Node::text(text))
    }
}
