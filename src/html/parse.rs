//! HTML解析模块
//!
//! 使用scraper解析HTML，再转换为独立拥有的节点树。

use scraper::{ElementRef, Html};

use crate::config::ConvertOptions;
use crate::html::node::{Element, Node};

/// 解析HTML文本，返回以`<body>`为根的节点树
///
/// 没有body元素时使用文档根元素。注释、文档类型等非内容节点被丢弃。
pub fn parse_document(html: &str) -> Element {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let body = root
        .children()
        .filter_map(ElementRef::wrap)
        .find(|element| element.value().name() == "body")
        .unwrap_or(root);

    convert_element(body)
}

/// 将scraper元素递归转换为拥有所有权的元素
fn convert_element(element: ElementRef) -> Element {
    let value = element.value();
    let mut result = Element::new(&value.name().to_lowercase());

    for (key, val) in value.attrs() {
        result.attrs.push((key.to_lowercase(), val.to_string()));
    }

    for child in element.children() {
        match child.value() {
            scraper::node::Node::Text(text) => {
                result.children.push(Node::text(&**text));
            }
            scraper::node::Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    result.children.push(Node::Element(convert_element(child_element)));
                }
            }
            _ => {}
        }
    }

    result
}

/// 解析前的一次性预处理
///
/// - 删除以Word私有前缀开头的属性，以及值中含有该前缀的`class`/`style`/`lang`属性
/// - 删除`v:shapes`之类带命名空间前缀的属性(`xml:lang`除外)
/// - 展开`o:p`、`st1:place`之类带命名空间前缀的元素(保留其内容)
///
/// 输出文档不声明这些前缀，留下它们会得到不合法的XML。
pub fn preprocess(root: &mut Element, options: &ConvertOptions) {
    strip_vendor_attrs(root, &options.vendor_prefix);
    let children = std::mem::take(&mut root.children);
    root.children = unwrap_annotations(children, options);
}

fn strip_vendor_attrs(element: &mut Element, prefix: &str) {
    element.attrs.retain(|(key, value)| {
        let vendor_name = key.starts_with(prefix);
        let vendor_value = matches!(key.as_str(), "class" | "style" | "lang") && value.contains(prefix);
        let prefixed = key.contains(':') && key != "xml:lang";
        !(vendor_name || vendor_value || prefixed)
    });

    for child in &mut element.children {
        if let Node::Element(child) = child {
            strip_vendor_attrs(child, prefix);
        }
    }
}

fn unwrap_annotations(nodes: Vec<Node>, options: &ConvertOptions) -> Vec<Node> {
    let mut result = Vec::with_capacity(nodes.len());

    for node in nodes {
        match node {
            Node::Element(mut element) => {
                let children = std::mem::take(&mut element.children);
                let children = unwrap_annotations(children, options);

                if element.is_namespaced() || options.is_annotation_tag(&element.name) {
                    result.extend(children);
                } else {
                    element.children = children;
                    result.push(Node::Element(element));
                }
            }
            text => result.push(text),
        }
    }

    result
}
