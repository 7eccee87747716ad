//! 注音(ruby)合成模块
//!
//! 把`漢字（かんじ）`形式的文本改写为`<ruby>漢字<rt>かんじ</rt></ruby>`。
//! 纯语法匹配，不做读音校验。

use once_cell::sync::Lazy;
use regex::Regex;

use crate::html::{Element, Node};

/// 汉字串 + 全角括号包围的平假名
static RUBY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([一-龥々〆ヵヶ]+)（([ぁ-ゖ]+)）").expect("ruby pattern"));

/// 已经是注音结构的元素，其中的文本不再匹配
const RUBY_TAGS: &[&str] = &["ruby", "rt", "rp"];

/// 构造注音节点
pub fn ruby_node(base: &str, reading: &str) -> Node {
    let mut ruby = Element::new("ruby");
    ruby.children.push(Node::text(base));
    ruby.children.push(Node::element_with_text("rt", reading));
    Node::Element(ruby)
}

/// 递归处理节点序列中的所有文本节点
pub fn synthesize_ruby(nodes: Vec<Node>) -> Vec<Node> {
    let mut result = Vec::with_capacity(nodes.len());

    for node in merge_adjacent_text(nodes) {
        match node {
            Node::Text(text) => expand_text(text, &mut result),
            Node::Element(mut element) if !RUBY_TAGS.contains(&element.name.as_str()) => {
                element.children = synthesize_ruby(std::mem::take(&mut element.children));
                result.push(Node::Element(element));
            }
            element => result.push(element),
        }
    }

    result
}

/// 合并相邻的文本节点，让跨片段的`漢字`与`（かな）`也能匹配
fn merge_adjacent_text(nodes: Vec<Node>) -> Vec<Node> {
    let mut result: Vec<Node> = Vec::with_capacity(nodes.len());

    for node in nodes {
        if let (Node::Text(text), Some(Node::Text(previous))) = (&node, result.last_mut()) {
            previous.push_str(text);
            continue;
        }
        result.push(node);
    }

    result
}

fn expand_text(text: String, out: &mut Vec<Node>) {
    let mut last = 0;

    for caps in RUBY_PATTERN.captures_iter(&text) {
        let (Some(whole), Some(base), Some(reading)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };

        if whole.start() > last {
            out.push(Node::text(&text[last..whole.start()]));
        }
        out.push(ruby_node(base.as_str(), reading.as_str()));
        last = whole.end();
    }

    if last == 0 {
        out.push(Node::Text(text));
    } else if last < text.len() {
        out.push(Node::text(&text[last..]));
    }
}
