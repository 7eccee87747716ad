use crate::epub::error::{EpubError, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::reader::Reader;
use quick_xml::Writer;

/// 容器描述文件在包内的路径
pub const CONTAINER_PATH: &str = "META-INF/container.xml";

/// 包文档在包内的默认路径
pub const OPF_PATH: &str = "OEBPS/content.opf";

/// OPF包文档的媒体类型
pub const OPF_MEDIA_TYPE: &str = "application/oebps-package+xml";

const CONTAINER_NAMESPACE: &str = "urn:oasis:names:tc:opendocument:xmlns:container";

/// Container.xml中的rootfile信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootFile {
    pub full_path: String,
    pub media_type: String,
}

/// Container.xml的内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub rootfiles: Vec<RootFile>,
}

impl Default for Container {
    /// 指向`OEBPS/content.opf`的标准容器
    fn default() -> Self {
        Self {
            rootfiles: vec![RootFile {
                full_path: OPF_PATH.to_string(),
                media_type: OPF_MEDIA_TYPE.to_string(),
            }],
        }
    }
}

impl RootFile {
    /// 从`<rootfile>`元素读取路径与媒体类型，缺少任一属性时返回`None`
    fn from_element(element: &BytesStart) -> Result<Option<Self>> {
        let mut full_path = None;
        let mut media_type = None;

        for attr in element.attributes() {
            let attr = attr.map_err(|e| EpubError::XmlError(quick_xml::Error::InvalidAttr(e)))?;
            let slot = match attr.key.local_name().as_ref() {
                b"full-path" => &mut full_path,
                b"media-type" => &mut media_type,
                _ => continue,
            };
            *slot = Some(attr.unescape_value()?.into_owned()).filter(|value| !value.is_empty());
        }

        Ok(full_path.zip(media_type).map(|(full_path, media_type)| Self { full_path, media_type }))
    }
}

impl Container {
    /// 解析container.xml，至少要有一个完整的rootfile
    pub fn parse_xml(xml_content: &str) -> Result<Container> {
        let mut reader = Reader::from_str(xml_content);
        reader.config_mut().trim_text(true);

        let mut rootfiles = Vec::new();
        loop {
            match reader.read_event()? {
                Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"rootfile" => {
                    rootfiles.extend(RootFile::from_element(&e)?);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if rootfiles.is_empty() {
            return Err(EpubError::ContainerParseError("没有找到任何rootfile条目".to_string()));
        }

        Ok(Container { rootfiles })
    }

    /// 生成container.xml内容
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        writer.write_event(Event::Start(
            BytesStart::new("container").with_attributes([("version", "1.0"), ("xmlns", CONTAINER_NAMESPACE)]),
        ))?;
        writer.write_event(Event::Start(BytesStart::new("rootfiles")))?;
        for rootfile in &self.rootfiles {
            writer.write_event(Event::Empty(BytesStart::new("rootfile").with_attributes([
                ("full-path", rootfile.full_path.as_str()),
                ("media-type", rootfile.media_type.as_str()),
            ])))?;
        }
        writer.write_event(Event::End(BytesEnd::new("rootfiles")))?;
        writer.write_event(Event::End(BytesEnd::new("container")))?;

        let mut xml = String::from_utf8_lossy(&writer.into_inner()).into_owned();
        xml.push('\n');
        Ok(xml)
    }

    /// 包文档路径：优先取OPF类型的rootfile，否则取第一个
    pub fn get_opf_path(&self) -> Option<String> {
        self.rootfiles
            .iter()
            .find(|rootfile| rootfile.media_type == OPF_MEDIA_TYPE)
            .or_else(|| self.rootfiles.first())
            .map(|rootfile| rootfile.full_path.clone())
    }
}
