//! OPF解析器模块
//!
//! 读取包文档中的元数据、清单与脊柱，并检查脊柱引用是否完整。

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::collections::HashMap;

use crate::epub::error::{EpubError, Result};
use crate::epub::opf::manifest::ManifestItem;
use crate::epub::opf::spine::{PageProgression, SpineItem};

/// OPF文件解析结果
#[derive(Debug, Clone, Default)]
pub struct Opf {
    /// EPUB版本
    pub version: String,
    /// 书名
    pub title: Option<String>,
    /// 作者
    pub creator: Option<String>,
    /// 语言
    pub language: Option<String>,
    /// 清单项(保持文档顺序)
    pub manifest: Vec<ManifestItem>,
    /// 脊柱(阅读顺序)
    pub spine: Vec<SpineItem>,
    /// 翻页方向
    pub page_progression: Option<PageProgression>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Metadata,
    Manifest,
    Spine,
}

impl Opf {
    /// 解析OPF文件内容
    ///
    /// # 参数
    /// * `xml_content` - OPF文件的XML内容
    ///
    /// # 返回值
    /// * `Result<Opf, EpubError>` - 解析后的OPF信息
    pub fn parse_xml(xml_content: &str) -> Result<Opf> {
        let mut reader = Reader::from_str(xml_content);
        reader.config_mut().trim_text(true);

        let mut opf = Opf::default();
        let mut section = Section::None;
        let mut current_field: Option<String> = None;
        let mut text_content = String::new();
        let mut found_package = false;

        loop {
            match reader.read_event()? {
                Event::Start(ref e) => {
                    let local_name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    match (section, local_name.as_str()) {
                        (_, "package") => {
                            found_package = true;
                            opf.version = attribute(e, b"version")?.unwrap_or_default();
                        }
                        (_, "metadata") => section = Section::Metadata,
                        (_, "manifest") => section = Section::Manifest,
                        (_, "spine") => {
                            section = Section::Spine;
                            opf.page_progression = attribute(e, b"page-progression-direction")?
                                .map(|value| PageProgression::parse_lenient(&value));
                        }
                        (Section::Metadata, _) => {
                            current_field = Some(local_name.clone());
                            text_content.clear();
                        }
                        (Section::Manifest, "item") => Self::parse_manifest_item(e, &mut opf.manifest)?,
                        (Section::Spine, "itemref") => Self::parse_spine_item(e, &mut opf.spine)?,
                        _ => {}
                    }
                }
                Event::Empty(ref e) => match (section, e.local_name().as_ref()) {
                    (Section::Manifest, b"item") => Self::parse_manifest_item(e, &mut opf.manifest)?,
                    (Section::Spine, b"itemref") => Self::parse_spine_item(e, &mut opf.spine)?,
                    _ => {}
                },
                Event::Text(e) => {
                    if current_field.is_some() {
                        text_content.push_str(&e.unescape()?);
                    }
                }
                Event::End(ref e) => match e.local_name().as_ref() {
                    b"metadata" | b"manifest" | b"spine" => section = Section::None,
                    _ => {
                        if let Some(field) = current_field.take() {
                            let value = text_content.trim().to_string();
                            match field.as_str() {
                                "title" if opf.title.is_none() => opf.title = Some(value),
                                "creator" if opf.creator.is_none() => opf.creator = Some(value),
                                "language" if opf.language.is_none() => opf.language = Some(value),
                                _ => {}
                            }
                        }
                    }
                },
                Event::Eof => break,
                _ => {}
            }
        }

        if !found_package {
            return Err(EpubError::OpfParseError("缺少package元素".to_string()));
        }

        Ok(opf)
    }

    /// 解析清单项
    fn parse_manifest_item(e: &BytesStart, manifest: &mut Vec<ManifestItem>) -> Result<()> {
        let id = attribute(e, b"id")?.unwrap_or_default();
        let href = attribute(e, b"href")?.unwrap_or_default();
        let media_type = attribute(e, b"media-type")?.unwrap_or_default();

        if !id.is_empty() && !href.is_empty() && !media_type.is_empty() {
            let mut item = ManifestItem::new(id, href, media_type);
            item.properties = attribute(e, b"properties")?;
            manifest.push(item);
        }

        Ok(())
    }

    /// 解析脊柱项
    fn parse_spine_item(e: &BytesStart, spine: &mut Vec<SpineItem>) -> Result<()> {
        if let Some(idref) = attribute(e, b"idref")?.filter(|idref| !idref.is_empty()) {
            let mut item = SpineItem::new(idref);
            item.linear = attribute(e, b"linear")?.as_deref() != Some("no");
            spine.push(item);
        }
        Ok(())
    }

    /// 按ID查找清单项
    pub fn get_manifest_item(&self, id: &str) -> Option<&ManifestItem> {
        self.manifest.iter().find(|item| item.id == id)
    }

    /// 获取导航文档的路径
    pub fn get_nav_path(&self) -> Option<String> {
        self.manifest
            .iter()
            .find(|item| item.is_nav())
            .map(|item| item.href.clone())
    }

    /// 按阅读顺序获取脊柱对应的文件路径
    pub fn get_spine_paths(&self) -> Vec<String> {
        self.spine
            .iter()
            .filter_map(|item| self.get_manifest_item(&item.idref))
            .map(|item| item.href.clone())
            .collect()
    }

    /// 检查清单与脊柱的结构约束，返回发现的问题
    ///
    /// - 清单ID与href必须唯一
    /// - 每个脊柱项必须恰好对应一个清单项
    /// - 导航文档必须排在所有内容文档之前
    pub fn check_spine(&self) -> Vec<String> {
        let mut problems = Vec::new();

        let mut ids: HashMap<&str, usize> = HashMap::new();
        let mut hrefs: HashMap<&str, usize> = HashMap::new();
        for item in &self.manifest {
            *ids.entry(item.id.as_str()).or_default() += 1;
            *hrefs.entry(item.href.as_str()).or_default() += 1;
        }
        for item in &self.manifest {
            if ids.get(item.id.as_str()) > Some(&1) {
                problems.push(format!("清单ID重复: {}", item.id));
                ids.remove(item.id.as_str());
            }
            if hrefs.get(item.href.as_str()) > Some(&1) {
                problems.push(format!("清单href重复: {}", item.href));
                hrefs.remove(item.href.as_str());
            }
        }

        let mut seen_content = false;
        for item in &self.spine {
            let matches = self.manifest.iter().filter(|m| m.id == item.idref).count();
            if matches != 1 {
                problems.push(format!("脊柱项 {} 对应 {} 个清单项", item.idref, matches));
                continue;
            }

            if let Some(manifest_item) = self.get_manifest_item(&item.idref) {
                if manifest_item.is_nav() && seen_content {
                    problems.push(format!("导航文档 {} 位于内容文档之后", item.idref));
                } else if !manifest_item.is_nav() && manifest_item.is_xhtml() {
                    seen_content = true;
                }
            }
        }

        problems
    }
}

/// 读取属性值
fn attribute(e: &BytesStart, name: &[u8]) -> Result<Option<String>> {
    for attr_result in e.attributes() {
        let attr = attr_result.map_err(|e| EpubError::XmlError(quick_xml::Error::InvalidAttr(e)))?;
        if attr.key.local_name().as_ref() == name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}
