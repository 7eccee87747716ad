//! XHTML内容文档模块
//!
//! 章节、目录与图片页都套用固定的XHTML骨架。

use quick_xml::escape::{escape, partial_escape};

use crate::chapter::Chapter;

/// 目录文档文件名
pub const TOC_FILENAME: &str = "toc.xhtml";

/// 目录标题
pub const TOC_TITLE: &str = "目次";

/// 默认样式表(竖排)
pub const STYLE_CSS: &str = r#"@charset "UTF-8";
body {
  writing-mode: vertical-rl;
  -epub-writing-mode: vertical-rl;
  line-height: 1.8;
  font-family: "YuMincho", serif;
}
p {
  margin: 0 0 1em 0;
}
"#;

/// 已渲染的内容文档
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    /// 包内文件名(相对于OEBPS)
    pub filename: String,
    /// XHTML内容
    pub content: String,
}

/// 生成完整的XHTML文档
fn xhtml_document(title: &str, language: &str, stylesheet: &str, extra_ns: &str, body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml"{extra_ns} lang="{lang}" xml:lang="{lang}">
<head>
  <meta charset="utf-8" />
  <title>{title}</title>
  <link rel="stylesheet" type="text/css" href="{css}" />
</head>
<body>
{body}
</body>
</html>
"#,
        extra_ns = extra_ns,
        lang = escape(language),
        title = partial_escape(title),
        css = escape(stylesheet),
        body = body,
    )
}

/// 把清理后的章节序列化为XHTML文档
pub fn render_chapter(chapter: &Chapter, language: &str, stylesheet: &str) -> RenderedDocument {
    let mut body = String::new();
    for node in &chapter.nodes {
        node.write_markup(&mut body);
    }

    RenderedDocument {
        filename: chapter.filename(),
        content: xhtml_document(&chapter.title, language, stylesheet, "", &body),
    }
}

/// 生成目录导航文档，按章节序号升序列出
pub fn build_toc(chapters: &[Chapter], language: &str, stylesheet: &str) -> RenderedDocument {
    let mut ordered: Vec<&Chapter> = chapters.iter().collect();
    ordered.sort_by_key(|chapter| chapter.index);

    let items: Vec<String> = ordered
        .iter()
        .map(|chapter| {
            format!(
                r#"      <li><a href="{}">{}</a></li>"#,
                escape(chapter.filename().as_str()),
                partial_escape(chapter.title.as_str())
            )
        })
        .collect();

    let list = if items.is_empty() {
        // 空的<ol>不合法，没有章节时放一个指向自身的条目
        format!(r#"      <li><a href="{}">{}</a></li>"#, TOC_FILENAME, TOC_TITLE)
    } else {
        items.join("\n")
    };

    let body = format!(
        r#"  <nav epub:type="toc" id="toc">
    <h1>{title}</h1>
    <ol>
{list}
    </ol>
  </nav>"#,
        title = TOC_TITLE,
        list = list,
    );

    RenderedDocument {
        filename: TOC_FILENAME.to_string(),
        content: xhtml_document(
            TOC_TITLE,
            language,
            stylesheet,
            r#" xmlns:epub="http://www.idpf.org/2007/ops""#,
            &body,
        ),
    }
}

/// 第`position`个(从0开始)图片页的文件名
pub fn image_page_filename(position: usize) -> String {
    if position == 0 {
        "image.xhtml".to_string()
    } else {
        format!("image-{}.xhtml", position + 1)
    }
}

/// 生成只包含一张居中图片的页面
pub fn build_image_page(position: usize, image_href: &str, language: &str, stylesheet: &str) -> RenderedDocument {
    let body = format!(
        r#"  <div style="text-align:center;">
    <img src="{}" alt="" style="max-width:100%; height:auto;" />
  </div>"#,
        escape(image_href)
    );

    RenderedDocument {
        filename: image_page_filename(position),
        content: xhtml_document("Image", language, stylesheet, "", &body),
    }
}
