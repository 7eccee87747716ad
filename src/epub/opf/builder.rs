//! OPF生成模块
//!
//! 根据清单和脊柱生成EPUB3包文档(`content.opf`)。

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;

use crate::epub::error::Result;
use crate::epub::opf::manifest::ManifestItem;
use crate::epub::opf::metadata::PackageMeta;
use crate::epub::opf::spine::SpineItem;

const OPF_NAMESPACE: &str = "http://www.idpf.org/2007/opf";
const DC_NAMESPACE: &str = "http://purl.org/dc/elements/1.1/";

/// 包文档中需要的动态值
#[derive(Debug, Clone)]
pub struct PackageStamp {
    /// 唯一标识符
    pub identifier: String,
    /// 生成时间(UTC，`YYYY-MM-DDThh:mm:ssZ`)
    pub timestamp: String,
}

impl PackageStamp {
    /// 使用元数据中的标识符，未设置时生成新的UUID
    pub fn for_meta(meta: &PackageMeta) -> Self {
        let identifier = meta
            .identifier
            .clone()
            .unwrap_or_else(|| format!("urn:uuid:{}", uuid::Uuid::new_v4()));
        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();

        Self {
            identifier,
            timestamp,
        }
    }
}

/// 生成`content.opf`
pub fn build_opf(
    meta: &PackageMeta,
    stamp: &PackageStamp,
    manifest: &[ManifestItem],
    spine: &[SpineItem],
) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let package = BytesStart::new("package").with_attributes([
        ("xmlns", OPF_NAMESPACE),
        ("xmlns:dc", DC_NAMESPACE),
        ("unique-identifier", "BookId"),
        ("version", "3.0"),
    ]);
    writer.write_event(Event::Start(package))?;

    // 元数据
    writer.write_event(Event::Start(BytesStart::new("metadata")))?;
    write_text_element(
        &mut writer,
        BytesStart::new("dc:identifier").with_attributes([("id", "BookId")]),
        &stamp.identifier,
    )?;
    write_text_element(&mut writer, BytesStart::new("dc:title"), &meta.title)?;
    write_text_element(&mut writer, BytesStart::new("dc:language"), &meta.language)?;
    write_text_element(&mut writer, BytesStart::new("dc:creator"), &meta.author)?;
    write_text_element(&mut writer, BytesStart::new("dc:date"), &stamp.timestamp)?;
    for (property, value) in [
        ("dcterms:modified", stamp.timestamp.as_str()),
        ("rendition:layout", "reflowable"),
        ("rendition:orientation", "auto"),
        ("rendition:spread", "auto"),
    ] {
        write_text_element(
            &mut writer,
            BytesStart::new("meta").with_attributes([("property", property)]),
            value,
        )?;
    }
    writer.write_event(Event::End(BytesEnd::new("metadata")))?;

    // 清单
    writer.write_event(Event::Start(BytesStart::new("manifest")))?;
    for item in manifest {
        let mut element = BytesStart::new("item").with_attributes([
            ("id", item.id.as_str()),
            ("href", item.href.as_str()),
            ("media-type", item.media_type.as_str()),
        ]);
        if let Some(properties) = &item.properties {
            element.push_attribute(("properties", properties.as_str()));
        }
        writer.write_event(Event::Empty(element))?;
    }
    writer.write_event(Event::End(BytesEnd::new("manifest")))?;

    // 脊柱
    let spine_start = BytesStart::new("spine")
        .with_attributes([("page-progression-direction", meta.page_progression.as_str())]);
    writer.write_event(Event::Start(spine_start))?;
    for item in spine {
        let mut element = BytesStart::new("itemref").with_attributes([("idref", item.idref.as_str())]);
        if !item.linear {
            element.push_attribute(("linear", "no"));
        }
        writer.write_event(Event::Empty(element))?;
    }
    writer.write_event(Event::End(BytesEnd::new("spine")))?;

    writer.write_event(Event::End(BytesEnd::new("package")))?;

    let mut xml = String::from_utf8_lossy(&writer.into_inner()).into_owned();
    xml.push('\n');
    Ok(xml)
}

/// 写入只包含文本的元素
fn write_text_element<W: Write>(writer: &mut Writer<W>, start: BytesStart, text: &str) -> Result<()> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    writer.write_event(Event::Start(start))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}
