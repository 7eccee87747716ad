//! 章节切分模块
//!
//! 以标记段落(`<p class="...CHAPTER...">`)为界，把整棵树切成有序章节。

use tracing::{debug, warn};

use crate::chapter::Chapter;
use crate::config::ConvertOptions;
use crate::html::{Element, Node};

/// 章节标题的两部分：外文片段与其余文本
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleParts {
    /// 外文片段文本
    pub en_text: String,
    /// 去掉外文片段后的文本
    pub jp_text: String,
}

impl TitleParts {
    /// 从标记段落中提取标题两部分
    pub fn from_marker(marker: &Element, options: &ConvertOptions) -> Self {
        let en_text = marker
            .find_first(|e| is_foreign_run(e, &options.foreign_lang))
            .map(Element::stripped_text)
            .unwrap_or_default();

        let full_text = marker.stripped_text();
        let jp_text = if en_text.is_empty() {
            full_text.trim().to_string()
        } else {
            full_text.replacen(&en_text, "", 1).trim().to_string()
        };

        Self { en_text, jp_text }
    }

    /// 合成目录中使用的标题
    pub fn title(&self) -> String {
        match (self.en_text.is_empty(), self.jp_text.is_empty()) {
            (false, false) => format!("{} - {}", self.en_text, self.jp_text),
            (false, true) => self.en_text.clone(),
            (true, _) => self.jp_text.clone(),
        }
    }
}

/// 是否为章节标记段落
pub fn is_marker(element: &Element, marker: &str) -> bool {
    element.name == "p"
        && element
            .attr("class")
            .is_some_and(|class| class.contains(marker))
}

/// 是否为外文片段
pub fn is_foreign_run(element: &Element, foreign_lang: &str) -> bool {
    element.name == "span" && element.attr("lang") == Some(foreign_lang)
}

/// 切分状态
struct Segmenter<'a> {
    options: &'a ConvertOptions,
    chapters: Vec<Chapter>,
    current: Option<Chapter>,
}

impl<'a> Segmenter<'a> {
    fn visit(&mut self, nodes: Vec<Node>) {
        for node in nodes {
            let Node::Element(element) = node else {
                continue;
            };

            if is_marker(&element, &self.options.marker) {
                self.open(element);
            } else if element.has_descendant(|e| is_marker(e, &self.options.marker)) {
                // 容器本身丢弃，只继续查找其中的标记段落
                self.visit(element.children);
            } else if let Some(chapter) = self.current.as_mut() {
                chapter.nodes.push(Node::Element(element));
            }
        }
    }

    fn open(&mut self, marker: Element) {
        self.close();

        let title = TitleParts::from_marker(&marker, self.options).title();
        let index = self.chapters.len() + 1;
        debug!("发现章节 {}: {}", index, title);

        self.current = Some(Chapter {
            index,
            title,
            nodes: vec![Node::Element(marker)],
        });
    }

    fn close(&mut self) {
        if let Some(chapter) = self.current.take() {
            self.chapters.push(chapter);
        }
    }
}

/// 将整棵树切分为章节
///
/// 按文档顺序深度优先遍历元素节点。遇到标记段落时关闭当前章节并开启新章节，
/// 其余元素连同子树一起移入当前章节；第一个标记之前的节点被丢弃。
pub fn split_chapters(root: Element, options: &ConvertOptions) -> Vec<Chapter> {
    let mut segmenter = Segmenter {
        options,
        chapters: Vec::new(),
        current: None,
    };

    segmenter.visit(root.children);
    segmenter.close();

    if segmenter.chapters.is_empty() {
        warn!("没有找到章节标记 (class 包含 '{}')", options.marker);
    }

    segmenter.chapters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::parse_document;

    fn split(html: &str) -> Vec<Chapter> {
        split_chapters(parse_document(html), &ConvertOptions::default())
    }

    #[test]
    fn test_two_chapters_with_titles() {
        let chapters = split(
            r#"<body>
<p class="CHAPTER"><span lang="EN-US">Prelude</span>序章</p>
<p>はじまり</p>
<p class="CHAPTER"><span lang="EN-US">Chapter One</span>鍛造</p>
<p>つづき</p>
</body>"#,
        );

        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].index, 1);
        assert_eq!(chapters[0].title, "Prelude - 序章");
        assert_eq!(chapters[1].index, 2);
        assert_eq!(chapters[1].title, "Chapter One - 鍛造");
        assert_eq!(chapters[0].nodes.len(), 2);
        assert_eq!(chapters[1].nodes[1].text_content(), "つづき");
    }

    #[test]
    fn test_nodes_before_first_marker_are_discarded() {
        let chapters = split(r#"<body><p>前書き</p><p class="CHAPTER">第一章</p><p>本文</p></body>"#);
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].title, "第一章");
        let texts: Vec<String> = chapters[0].nodes.iter().map(Node::text_content).collect();
        assert_eq!(texts, vec!["第一章", "本文"]);
    }

    #[test]
    fn test_markers_inside_sections_are_found() {
        let chapters = split(
            r#"<body>
<div class="WordSection1"><p class="MsoNormal CHAPTER">一</p><p>a</p></div>
<div class="WordSection2"><p class="CHAPTER">二</p><p>b</p></div>
</body>"#,
        );

        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].title, "一");
        assert_eq!(chapters[1].title, "二");
        assert_eq!(chapters[0].nodes.len(), 2);
        assert_eq!(chapters[1].nodes.len(), 2);
    }

    #[test]
    fn test_nested_content_is_not_duplicated() {
        let chapters = split(r#"<body><p class="CHAPTER">章</p><p><span>甲</span>乙</p></body>"#);
        assert_eq!(chapters[0].nodes.len(), 2);
        assert_eq!(chapters[0].nodes[1].text_content(), "甲乙");
    }

    #[test]
    fn test_zero_markers_yield_zero_chapters() {
        assert!(split("<body><p>本文だけ</p></body>").is_empty());
    }

    #[test]
    fn test_indices_are_dense() {
        let html: String = (0..5).map(|i| format!(r#"<p class="CHAPTER">第{}章</p><p>x</p>"#, i)).collect();
        let chapters = split(&format!("<body>{}</body>", html));
        let indices: Vec<usize> = chapters.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_title_parts() {
        let root = parse_document(r#"<body><p class="CHAPTER"><span lang="EN-US">Only English</span></p></body>"#);
        let marker = root.children.iter().find_map(Node::as_element).unwrap();
        let parts = TitleParts::from_marker(marker, &ConvertOptions::default());
        assert_eq!(parts.en_text, "Only English");
        assert_eq!(parts.jp_text, "");
        assert_eq!(parts.title(), "Only English");
        assert_eq!(TitleParts::default().title(), "");
    }
}
