//! 标记树模块
//!
//! 解析后的HTML以独立拥有的节点树表示，每个章节持有自己的子树。

use quick_xml::escape::{escape, partial_escape};

/// XHTML中需要自闭合的空元素
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// 标记树节点
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// 元素节点
    Element(Element),
    /// 文本节点
    Text(String),
}

/// 元素节点
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// 小写标签名，可能带命名空间前缀(如`o:p`)
    pub name: String,
    /// 属性列表，按名称查找
    pub attrs: Vec<(String, String)>,
    /// 有序子节点
    pub children: Vec<Node>,
}

impl Node {
    /// 创建文本节点
    pub fn text(content: impl Into<String>) -> Self {
        Node::Text(content.into())
    }

    /// 创建只包含一段文本的元素节点
    pub fn element_with_text(name: &str, content: impl Into<String>) -> Self {
        let mut element = Element::new(name);
        element.children.push(Node::text(content));
        Node::Element(element)
    }

    /// 如果是元素节点则返回其引用
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }

    /// 原样拼接的全部文本
    pub fn text_content(&self) -> String {
        let mut result = String::new();
        self.collect_text(&mut result);
        result
    }

    /// 每段文本去除首尾空白后拼接
    pub fn stripped_text(&self) -> String {
        let mut result = String::new();
        self.collect_stripped_text(&mut result);
        result
    }

    fn collect_text(&self, result: &mut String) {
        match self {
            Node::Text(text) => result.push_str(text),
            Node::Element(element) => {
                for child in &element.children {
                    child.collect_text(result);
                }
            }
        }
    }

    fn collect_stripped_text(&self, result: &mut String) {
        match self {
            Node::Text(text) => result.push_str(text.trim()),
            Node::Element(element) => {
                for child in &element.children {
                    child.collect_stripped_text(result);
                }
            }
        }
    }

    /// 序列化为XHTML片段
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        self.write_markup(&mut out);
        out
    }

    /// 将节点的XHTML表示追加到输出中
    pub fn write_markup(&self, out: &mut String) {
        match self {
            Node::Text(text) => out.push_str(&partial_escape(text.as_str())),
            Node::Element(element) => element.write_markup(out),
        }
    }
}

impl Element {
    /// 创建空元素
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// 读取属性值
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// 设置属性值(存在则覆盖)
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(key, _)| key == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    /// 删除属性，返回被删除的值
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let pos = self.attrs.iter().position(|(key, _)| key == name)?;
        Some(self.attrs.remove(pos).1)
    }

    /// 标签名是否为`prefix:local`形式
    pub fn is_namespaced(&self) -> bool {
        self.name.contains(':')
    }

    /// 原样拼接的全部文本
    pub fn text_content(&self) -> String {
        let mut result = String::new();
        for child in &self.children {
            child.collect_text(&mut result);
        }
        result
    }

    /// 每段文本去除首尾空白后拼接
    pub fn stripped_text(&self) -> String {
        let mut result = String::new();
        for child in &self.children {
            child.collect_stripped_text(&mut result);
        }
        result
    }

    /// 深度优先查找第一个满足条件的后代元素(不含自身)
    pub fn find_first<F>(&self, predicate: F) -> Option<&Element>
    where
        F: Fn(&Element) -> bool + Copy,
    {
        for child in &self.children {
            if let Node::Element(element) = child {
                if predicate(element) {
                    return Some(element);
                }
                if let Some(found) = element.find_first(predicate) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// 是否有满足条件的后代元素
    pub fn has_descendant<F>(&self, predicate: F) -> bool
    where
        F: Fn(&Element) -> bool + Copy,
    {
        self.find_first(predicate).is_some()
    }

    fn write_markup(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attrs {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape(value.as_str()));
            out.push('"');
        }

        if VOID_ELEMENTS.contains(&self.name.as_str()) {
            out.push_str(" />");
            return;
        }

        out.push('>');
        for child in &self.children {
            child.write_markup(out);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}
