//! EPUB打包模块
//!
//! 生成目录、图片页、清单与脊柱，并写出zip容器。
//! `mimetype`总是第一个条目且不压缩。

use std::collections::HashSet;
use std::fs;
use std::io::{Cursor, Seek, Write};
use std::path::Path;

use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::chapter::Chapter;
use crate::config::ConvertOptions;
use crate::epub::container::{Container, CONTAINER_PATH, OPF_PATH};
use crate::epub::error::{EpubError, Result};
use crate::epub::opf::{
    build_opf, media_type_for, ImageSpec, ManifestItem, PackageMeta, PackageStamp, SpineItem,
};
use crate::epub::xhtml::{build_image_page, build_toc, render_chapter, STYLE_CSS};

/// mimetype条目名
pub const MIMETYPE_PATH: &str = "mimetype";

/// mimetype条目内容
pub const EPUB_MIMETYPE: &str = "application/epub+zip";

/// 内容文件所在目录
pub const CONTENT_DIR: &str = "OEBPS";

/// 包内的一个文件(路径相对于OEBPS)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageFile {
    pub href: String,
    pub data: Vec<u8>,
}

/// 已读取的插图
#[derive(Debug, Clone)]
struct ResolvedImage {
    spec: ImageSpec,
    id: String,
    href: String,
    data: Vec<u8>,
}

/// 组装完成、尚未写出的EPUB包
#[derive(Debug, Clone)]
pub struct Package {
    /// 清单(声明顺序)
    pub manifest: Vec<ManifestItem>,
    /// 脊柱(阅读顺序)
    pub spine: Vec<SpineItem>,
    /// content.opf内容
    pub opf: String,
    /// OEBPS下的文件(不含content.opf)
    pub files: Vec<PackageFile>,
}

impl Package {
    /// 由章节和元数据组装EPUB包
    pub fn build(chapters: &[Chapter], meta: &PackageMeta, options: &ConvertOptions) -> Result<Self> {
        Self::build_with_stamp(chapters, meta, options, &PackageStamp::for_meta(meta))
    }

    /// 使用指定的标识符与时间组装EPUB包
    pub fn build_with_stamp(
        chapters: &[Chapter],
        meta: &PackageMeta,
        options: &ConvertOptions,
        stamp: &PackageStamp,
    ) -> Result<Self> {
        let language = meta.language.as_str();
        let stylesheet = options.stylesheet.as_str();

        let mut ordered: Vec<&Chapter> = chapters.iter().collect();
        ordered.sort_by_key(|chapter| chapter.index);

        let mut manifest = Vec::new();
        let mut spine = Vec::new();
        let mut files = Vec::new();

        // 章节
        for chapter in &ordered {
            let document = render_chapter(chapter, language, stylesheet);
            manifest.push(ManifestItem::xhtml(chapter.manifest_id(), &document.filename));
            files.push(PackageFile {
                href: document.filename,
                data: document.content.into_bytes(),
            });
        }

        // 目录
        let toc = build_toc(chapters, language, stylesheet);
        manifest.push(ManifestItem::xhtml("toc", &toc.filename).with_properties("nav"));
        spine.push(SpineItem::new("toc"));

        // 图片页
        let images = resolve_images(meta);
        let mut page_files = Vec::new();
        for (position, image) in images.iter().filter(|image| image.spec.inserts_after_toc()).enumerate() {
            let page = build_image_page(position, &image.href, language, stylesheet);
            let id = format!("imgpage{}", position);
            manifest.push(ManifestItem::xhtml(&id, &page.filename));
            spine.push(SpineItem::new(id));
            page_files.push(PackageFile {
                href: page.filename,
                data: page.content.into_bytes(),
            });
        }

        // 章节按序号进入脊柱
        spine.extend(ordered.iter().map(|chapter| SpineItem::new(chapter.manifest_id())));

        // 图片文件与样式表
        for image in &images {
            manifest.push(ManifestItem::new(&image.id, &image.href, media_type_for(&image.href)));
        }
        manifest.push(ManifestItem::new("style", stylesheet, "text/css"));

        files.push(PackageFile {
            href: toc.filename,
            data: toc.content.into_bytes(),
        });
        files.push(PackageFile {
            href: stylesheet.to_string(),
            data: STYLE_CSS.as_bytes().to_vec(),
        });
        files.extend(page_files);
        files.extend(images.into_iter().map(|image| PackageFile {
            href: image.href,
            data: image.data,
        }));

        let opf = build_opf(meta, stamp, &manifest, &spine)?;
        debug!("清单 {} 项，脊柱 {} 项", manifest.len(), spine.len());

        Ok(Self {
            manifest,
            spine,
            opf,
            files,
        })
    }

    /// 按包内路径查找文件
    pub fn file(&self, href: &str) -> Option<&PackageFile> {
        self.files.iter().find(|file| file.href == href)
    }

    /// 写出zip容器
    ///
    /// 条目顺序：mimetype(不压缩)、container.xml、OEBPS下的所有文件。
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<W> {
        let mut zip = ZipWriter::new(writer);

        zip.start_file(MIMETYPE_PATH, stored())?;
        zip.write_all(EPUB_MIMETYPE.as_bytes())?;

        zip.start_file(CONTAINER_PATH, deflated())?;
        zip.write_all(Container::default().to_xml()?.as_bytes())?;

        for file in &self.files {
            zip.start_file(format!("{}/{}", CONTENT_DIR, file.href), deflated())?;
            zip.write_all(&file.data)?;
        }

        zip.start_file(OPF_PATH, deflated())?;
        zip.write_all(self.opf.as_bytes())?;

        Ok(zip.finish()?)
    }

    /// 在内存中生成完整的zip字节
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.write_to(Cursor::new(Vec::new()))?.into_inner())
    }

    /// 写入文件
    ///
    /// 先在内存中生成完整的容器再一次性写出，失败时不会留下半成品。
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        fs::write(path, bytes).map_err(|source| EpubError::OutputWrite {
            path: path.to_path_buf(),
            source,
        })?;
        info!("已写出 {}", path.display());
        Ok(())
    }
}

fn stored() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Stored)
}

fn deflated() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

/// 读取元数据中的所有插图，缺失或重名的文件给出警告并跳过
fn resolve_images(meta: &PackageMeta) -> Vec<ResolvedImage> {
    let mut images = Vec::new();
    let mut hrefs = HashSet::new();
    let mut ids = HashSet::new();

    for spec in &meta.images {
        let path = spec.resolve(meta.base_dir.as_deref());
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) => {
                warn!("图片文件无法读取，已跳过: {} ({})", spec.file, e);
                continue;
            }
        };

        let href = spec.basename().to_string();
        if !hrefs.insert(href.clone()) {
            warn!("图片文件名重复，已跳过: {}", spec.file);
            continue;
        }

        let base_id = format!("imgfile_{}", sanitize_id(file_stem(&href)));
        let mut id = base_id.clone();
        let mut suffix = 2;
        while !ids.insert(id.clone()) {
            id = format!("{}_{}", base_id, suffix);
            suffix += 1;
        }

        images.push(ResolvedImage {
            spec: spec.clone(),
            id,
            href,
            data,
        });
    }

    images
}

fn file_stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(pos) if pos > 0 => &name[..pos],
        _ => name,
    }
}

/// 把文件名转换为合法的XML ID片段
fn sanitize_id(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epub::opf::INSERT_AFTER_TOC;
    use crate::html::{Element, Node};
    use crate::test_support::capture_warnings;
    use std::io::Read;
    use zip::ZipArchive;

    fn chapter(index: usize, title: &str) -> Chapter {
        let mut p = Element::new("p");
        p.set_attr("class", "CHAPTER");
        p.children.push(Node::text(title));
        Chapter {
            index,
            title: title.to_string(),
            nodes: vec![Node::Element(p)],
        }
    }

    fn stamp() -> PackageStamp {
        PackageStamp {
            identifier: "urn:uuid:fixed".to_string(),
            timestamp: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    fn build(chapters: &[Chapter], meta: &PackageMeta) -> Package {
        Package::build_with_stamp(chapters, meta, &ConvertOptions::default(), &stamp()).unwrap()
    }

    fn ids(items: &[SpineItem]) -> Vec<&str> {
        items.iter().map(|item| item.idref.as_str()).collect()
    }

    #[test]
    fn test_manifest_and_spine_order() {
        // 故意打乱顺序，输出仍按序号排列
        let chapters = vec![chapter(2, "Chapter One - 鍛造"), chapter(1, "Prelude - 序章")];
        let package = build(&chapters, &PackageMeta::default());

        assert_eq!(ids(&package.spine), vec!["toc", "chap1", "chap2"]);
        let manifest_ids: Vec<&str> = package.manifest.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(manifest_ids, vec!["chap1", "chap2", "toc", "style"]);
        assert!(package.manifest[2].is_nav());
        assert!(package.file("content-01.xhtml").is_some());
        assert!(package.file("content-02.xhtml").is_some());
        assert!(package.opf.contains("page-progression-direction=\"rtl\""));
    }

    #[test]
    fn test_images_and_pages() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("cover.jpg"), [0xFF, 0xD8, 0xFF]).unwrap();
        fs::write(dir.path().join("map.png"), [0x89, 0x50]).unwrap();

        let meta = PackageMeta {
            images: vec![
                ImageSpec::new("cover.jpg", Some(INSERT_AFTER_TOC)),
                ImageSpec::new("missing.gif", Some(INSERT_AFTER_TOC)),
                ImageSpec::new("map.png", None),
                ImageSpec::new("sub/cover.jpg", None),
            ],
            base_dir: Some(dir.path().to_path_buf()),
            ..PackageMeta::default()
        };
        let package = build(&[chapter(1, "一")], &meta);

        assert_eq!(ids(&package.spine), vec!["toc", "imgpage0", "chap1"]);

        let cover = package.manifest.iter().find(|m| m.href == "cover.jpg").unwrap();
        assert_eq!(cover.id, "imgfile_cover");
        assert_eq!(cover.media_type, "image/jpeg");
        let map = package.manifest.iter().find(|m| m.href == "map.png").unwrap();
        assert_eq!(map.media_type, "image/png");
        assert!(package.manifest.iter().all(|m| m.href != "missing.gif"));

        let page = package.file("image.xhtml").unwrap();
        assert!(String::from_utf8_lossy(&page.data).contains(r#"<img src="cover.jpg""#));
        assert_eq!(package.file("cover.jpg").unwrap().data, vec![0xFF, 0xD8, 0xFF]);
    }

    #[test]
    fn test_unreadable_and_duplicate_images_are_warned() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("cover.jpg"), [0xFF]).unwrap();
        fs::write(dir.path().join("sub/cover.jpg"), [0xD8]).unwrap();

        let meta = PackageMeta {
            images: vec![
                ImageSpec::new("missing.gif", Some(INSERT_AFTER_TOC)),
                ImageSpec::new("cover.jpg", None),
                ImageSpec::new("sub/cover.jpg", None),
            ],
            base_dir: Some(dir.path().to_path_buf()),
            ..PackageMeta::default()
        };

        let (package, logs) = capture_warnings(|| build(&[chapter(1, "一")], &meta));
        assert!(logs.contains("图片文件无法读取，已跳过: missing.gif"));
        assert!(logs.contains("图片文件名重复，已跳过: sub/cover.jpg"));
        assert_eq!(package.manifest.iter().filter(|m| m.is_image()).count(), 1);
        assert!(package.file("image.xhtml").is_none());
    }

    #[test]
    fn test_no_images() {
        let package = build(&[chapter(1, "一")], &PackageMeta::default());
        assert!(package.manifest.iter().all(|m| !m.is_image() && !m.id.starts_with("imgpage")));
        assert_eq!(ids(&package.spine), vec!["toc", "chap1"]);
    }

    #[test]
    fn test_mimetype_is_first_and_stored() {
        let bytes = build(&[chapter(1, "一")], &PackageMeta::default()).to_bytes().unwrap();

        // 本地文件头固定30字节，随后是文件名与未压缩的内容
        assert_eq!(&bytes[0..4], b"PK\x03\x04");
        assert_eq!(&bytes[30..38], b"mimetype");
        let extra_len = u16::from_le_bytes([bytes[28], bytes[29]]) as usize;
        let start = 38 + extra_len;
        assert_eq!(&bytes[start..start + EPUB_MIMETYPE.len()], EPUB_MIMETYPE.as_bytes());

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let first = archive.by_index(0).unwrap();
        assert_eq!(first.name(), "mimetype");
        assert_eq!(first.compression(), CompressionMethod::Stored);
        drop(first);

        let names: Vec<String> = archive.file_names().map(str::to_string).collect();
        assert_eq!(names[1], "META-INF/container.xml");
        for expected in ["OEBPS/content-01.xhtml", "OEBPS/toc.xhtml", "OEBPS/content.opf", "OEBPS/style.css"] {
            assert!(names.iter().any(|name| name == expected), "缺少 {}", expected);
        }

        let mut container = String::new();
        archive
            .by_name("META-INF/container.xml")
            .unwrap()
            .read_to_string(&mut container)
            .unwrap();
        assert!(container.contains("OEBPS/content.opf"));
    }

    #[test]
    fn test_empty_book_is_still_valid() {
        let package = build(&[], &PackageMeta::default());
        assert_eq!(ids(&package.spine), vec!["toc"]);
        assert!(package.file("toc.xhtml").is_some());
        assert!(package.to_bytes().is_ok());
    }

    #[test]
    fn test_save_to_missing_directory_is_output_error() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("no/such/dir/book.epub");
        let result = build(&[], &PackageMeta::default()).save(&target);
        assert!(matches!(result, Err(EpubError::OutputWrite { .. })));
        assert!(!target.exists());
    }

    #[test]
    fn test_sanitize_id() {
        assert_eq!(sanitize_id("cover image"), "cover_image");
        assert_eq!(sanitize_id("表紙"), "__");
        assert_eq!(file_stem("a.b.png"), "a.b");
        assert_eq!(file_stem(".hidden"), ".hidden");
    }
}
