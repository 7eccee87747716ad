//! 转换流水线
//!
//! 字节流 → 解码 → 标记树 → 预处理 → 章节切分 → 逐章清理与注音 → 打包。

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::chapter::{clean_chapter, split_chapters, synthesize_ruby, Chapter};
use crate::config::ConvertOptions;
use crate::epub::error::{EpubError, Result};
use crate::epub::opf::PackageMeta;
use crate::epub::writer::Package;
use crate::html::{decode, parse_document, preprocess};

/// 一次转换的结果
#[derive(Debug, Clone)]
pub struct Conversion {
    /// 检测到的输入编码名称
    pub encoding: &'static str,
    /// 清理后的章节
    pub chapters: Vec<Chapter>,
    /// 组装完成的EPUB包
    pub package: Package,
}

/// 把已解码的HTML文本处理为清理后的章节
pub fn prepare_chapters(html: &str, options: &ConvertOptions) -> Vec<Chapter> {
    let mut root = parse_document(html);
    preprocess(&mut root, options);

    let chapters = split_chapters(root, options);
    info!("共找到 {} 个章节", chapters.len());

    chapters
        .into_iter()
        .map(|chapter| {
            let mut chapter = clean_chapter(chapter, options);
            chapter.nodes = synthesize_ruby(chapter.nodes);
            chapter
        })
        .collect()
}

/// 转换内存中的HTML字节流
pub fn convert_bytes(bytes: &[u8], meta: &PackageMeta, options: &ConvertOptions) -> Result<Conversion> {
    let decoded = decode(bytes);
    info!("输入编码: {}", decoded.encoding.name());
    if decoded.had_errors {
        warn!("输入中存在无法解码的字节，已丢弃");
    }

    let chapters = prepare_chapters(&decoded.text, options);
    let package = Package::build(&chapters, meta, options)?;

    Ok(Conversion {
        encoding: decoded.encoding.name(),
        chapters,
        package,
    })
}

/// 读取输入文件，转换后写出EPUB
///
/// # 参数
/// * `input` - Word导出的HTML文件
/// * `output` - 输出的EPUB路径
/// * `meta` - 书籍元数据
/// * `options` - 转换选项
///
/// # 返回值
/// * `Result<Conversion, EpubError>` - 输入无法读取或输出无法写入时返回错误
pub fn convert_file<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    meta: &PackageMeta,
    options: &ConvertOptions,
) -> Result<Conversion> {
    let input = input.as_ref();
    let bytes = fs::read(input).map_err(|source| EpubError::InputRead {
        path: input.to_path_buf(),
        source,
    })?;

    let conversion = convert_bytes(&bytes, meta, options)?;
    conversion.package.save(output)?;
    Ok(conversion)
}

/// 查找元数据文件：先找输入文件所在目录，再找当前目录
pub fn discover_metadata(input: &Path) -> Option<PathBuf> {
    const METADATA_FILE: &str = "metadata.yaml";

    let beside_input = input
        .parent()
        .map(|dir| dir.join(METADATA_FILE))
        .filter(|path| path.is_file());

    beside_input.or_else(|| {
        let in_cwd = Path::new(METADATA_FILE);
        in_cwd.is_file().then(|| in_cwd.to_path_buf())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epub::reader::Epub;
    use crate::epub::xhtml::render_chapter;
    use crate::html::Node;
    use crate::test_support::capture_warnings;
    use quick_xml::events::Event;
    use quick_xml::name::ResolveResult;
    use quick_xml::NsReader;

    const TWO_CHAPTERS: &str = r#"<html><head><meta charset="utf-8"></head><body>
<div class="WordSection1">
<p class="MsoNormal">表紙の言葉</p>
<p class="MsoNormal CHAPTER"><span lang="EN-US">Prelude</span><span style="font-family:游明朝">序章</span></p>
<p class="MsoNormal">はじまり<o:p></o:p></p>
<p class="MsoNormal CHAPTER"><span lang="EN-US">Chapter One</span>鍛造</p>
<p class="MsoNormal">彼女（かのじょ）は<span style="font-style:italic">静かに</span>笑った</p>
</div>
</body></html>"#;

    fn texts(chapter: &Chapter) -> Vec<String> {
        chapter.nodes.iter().map(Node::stripped_text).collect()
    }

    #[test]
    fn test_two_chapter_book() {
        let conversion = convert_bytes(
            TWO_CHAPTERS.as_bytes(),
            &PackageMeta::default(),
            &ConvertOptions::default(),
        )
        .unwrap();

        assert_eq!(conversion.encoding, "UTF-8");
        assert_eq!(conversion.chapters.len(), 2);
        assert_eq!(conversion.chapters[0].title, "Prelude - 序章");
        assert_eq!(conversion.chapters[1].title, "Chapter One - 鍛造");
        assert_eq!(texts(&conversion.chapters[0]), vec!["Prelude序章", "はじまり"]);

        let spine: Vec<&str> = conversion
            .package
            .spine
            .iter()
            .map(|item| item.idref.as_str())
            .collect();
        assert_eq!(spine, vec!["toc", "chap1", "chap2"]);
        assert!(conversion.package.file("content-01.xhtml").is_some());
        assert!(conversion.package.file("content-02.xhtml").is_some());
    }

    #[test]
    fn test_ruby_and_emphasis_survive_cleanup() {
        let conversion = convert_bytes(
            TWO_CHAPTERS.as_bytes(),
            &PackageMeta::default(),
            &ConvertOptions::default(),
        )
        .unwrap();

        let body = conversion.chapters[1].nodes[1].to_markup();
        assert_eq!(
            body,
            "<p><ruby>彼女<rt>かのじょ</rt></ruby>は<em>静かに</em>笑った</p>"
        );
    }

    #[test]
    fn test_no_markers_still_produce_a_book() {
        let (conversion, logs) = capture_warnings(|| {
            convert_bytes(
                "<html><body><p>本文だけ</p></body></html>".as_bytes(),
                &PackageMeta::default(),
                &ConvertOptions::default(),
            )
        });
        let conversion = conversion.unwrap();

        assert!(logs.contains("没有找到章节标记 (class 包含 'CHAPTER')"));
        assert!(conversion.chapters.is_empty());
        assert_eq!(conversion.package.spine.len(), 1);
        assert!(conversion.package.to_bytes().is_ok());
    }

    #[test]
    fn test_rendered_chapter_is_namespace_well_formed() {
        let html = r#"<body><p class="CHAPTER">章</p>
<p>僕は<st1:place w:st="on">大阪</st1:place>へ行った</p>
<p><img src="a.png" v:shapes="Picture_x0020_1"></p></body>"#;
        let chapters = prepare_chapters(html, &ConvertOptions::default());
        assert_eq!(chapters[0].nodes[1].text_content(), "僕は大阪へ行った");

        let document = render_chapter(&chapters[0], "ja", "style.css");
        assert!(document.content.contains(r#"<img src="a.png" />"#));

        let mut reader = NsReader::from_str(&document.content);
        loop {
            let (namespace, event) = reader.read_resolved_event().unwrap();
            if let ResolveResult::Unknown(prefix) = namespace {
                panic!("未绑定的元素前缀: {}", String::from_utf8_lossy(&prefix));
            }
            match event {
                Event::Start(e) | Event::Empty(e) => {
                    for attr in e.attributes() {
                        let attr = attr.unwrap();
                        if let (ResolveResult::Unknown(prefix), _) = reader.resolve_attribute(attr.key) {
                            panic!("未绑定的属性前缀: {}", String::from_utf8_lossy(&prefix));
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }
    }

    #[test]
    fn test_shift_jis_input() {
        let html = r#"<html><body><p class="CHAPTER">第一章</p><p>本文</p></body></html>"#;
        let (bytes, _, _) = encoding_rs::SHIFT_JIS.encode(html);
        let conversion =
            convert_bytes(&bytes, &PackageMeta::default(), &ConvertOptions::default()).unwrap();

        assert_eq!(conversion.encoding, "Shift_JIS");
        assert_eq!(conversion.chapters[0].title, "第一章");
    }

    #[test]
    fn test_custom_marker() {
        let html = r#"<body><p class="Heading">一</p><p>a</p><p class="Heading">二</p></body>"#;
        let options = ConvertOptions::default().with_marker("Heading");
        let chapters = prepare_chapters(html, &options);
        assert_eq!(chapters.len(), 2);
    }

    #[test]
    fn test_convert_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("book.htm");
        let output = dir.path().join("book.epub");
        fs::write(&input, TWO_CHAPTERS).unwrap();

        let meta = PackageMeta::from_yaml_str("title: [{ text: 作品名 }]\ncreator: 著者名\n").unwrap();
        convert_file(&input, &output, &meta, &ConvertOptions::default()).unwrap();

        let mut epub = Epub::from_path(&output).unwrap();
        let opf = epub.parse_opf().unwrap();
        assert_eq!(opf.title.as_deref(), Some("作品名"));
        assert_eq!(opf.creator.as_deref(), Some("著者名"));
        assert!(opf.check_spine().is_empty());
    }

    #[test]
    fn test_missing_input_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let result = convert_file(
            dir.path().join("none.htm"),
            dir.path().join("out.epub"),
            &PackageMeta::default(),
            &ConvertOptions::default(),
        );
        assert!(matches!(result, Err(EpubError::InputRead { .. })));
        assert!(!dir.path().join("out.epub").exists());
    }

    #[test]
    fn test_discover_metadata_beside_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("book.htm");
        fs::write(dir.path().join("metadata.yaml"), "title: x\n").unwrap();

        assert_eq!(discover_metadata(&input), Some(dir.path().join("metadata.yaml")));
    }
}
