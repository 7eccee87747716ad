use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use tracing::debug;
use zip::{CompressionMethod, ZipArchive};

use crate::epub::container::{Container, CONTAINER_PATH};
use crate::epub::error::{EpubError, Result};
use crate::epub::opf::Opf;
use crate::epub::writer::{EPUB_MIMETYPE, MIMETYPE_PATH};

/// 表示一个已打开的EPUB文件
pub struct Epub<R = File> {
    archive: ZipArchive<R>,
}

impl Epub<File> {
    /// 从文件路径打开EPUB
    ///
    /// # 参数
    /// * `path` - epub文件的路径
    ///
    /// # 返回值
    /// * `Result<Epub, EpubError>` - 成功返回Epub实例，失败返回错误
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| EpubError::InputRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file)
    }
}

impl<R: Read + Seek> Epub<R> {
    /// 从任意可读可定位的数据源打开EPUB
    pub fn from_reader(reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader)?;
        let mut epub = Epub { archive };
        epub.validate()?;
        Ok(epub)
    }

    /// 验证EPUB文件的合法性
    ///
    /// 检查步骤：
    /// 1. 第一个条目必须是mimetype
    /// 2. mimetype必须不压缩存储
    /// 3. 内容必须恰好是"application/epub+zip"
    fn validate(&mut self) -> Result<()> {
        if self.archive.is_empty() {
            return Err(EpubError::MissingMimetype);
        }

        let has_mimetype = self.archive_has_mimetype();
        let mut first = self.archive.by_index(0)?;
        if first.name() != MIMETYPE_PATH {
            return if has_mimetype {
                Err(EpubError::InvalidEpub("mimetype不是第一个条目".to_string()))
            } else {
                Err(EpubError::MissingMimetype)
            };
        }

        if first.compression() != CompressionMethod::Stored {
            return Err(EpubError::MimetypeCompressed);
        }

        let mut content = String::new();
        first.read_to_string(&mut content)?;
        if content != EPUB_MIMETYPE {
            return Err(EpubError::InvalidMimetype {
                expected: EPUB_MIMETYPE.to_string(),
                found: content,
            });
        }

        debug!("EPUB验证成功: mimetype正确");
        Ok(())
    }

    fn archive_has_mimetype(&self) -> bool {
        self.archive.file_names().any(|name| name == MIMETYPE_PATH)
    }

    /// 列出EPUB文件中的所有条目(按存储顺序)
    pub fn list_files(&mut self) -> Result<Vec<String>> {
        let mut files = Vec::new();

        for i in 0..self.archive.len() {
            let file = self.archive.by_index(i)?;
            files.push(file.name().to_string());
        }

        Ok(files)
    }

    /// 提取指定文件的文本内容
    ///
    /// # 参数
    /// * `filename` - 要提取的文件名
    ///
    /// # 返回值
    /// * `Result<String, EpubError>` - 文件内容
    pub fn extract_file(&mut self, filename: &str) -> Result<String> {
        let mut file = self.archive.by_name(filename)?;
        let mut content = String::new();
        file.read_to_string(&mut content)?;
        Ok(content)
    }

    /// 解析container.xml文件
    pub fn parse_container(&mut self) -> Result<Container> {
        let container_content = self.extract_file(CONTAINER_PATH)?;
        Container::parse_xml(&container_content)
    }

    /// 获取主要的OPF文件路径
    pub fn get_opf_path(&mut self) -> Result<String> {
        let container = self.parse_container()?;

        container.get_opf_path().ok_or_else(|| {
            EpubError::ContainerParseError("container.xml中没有找到有效的rootfile".to_string())
        })
    }

    /// 解析OPF文件
    pub fn parse_opf(&mut self) -> Result<Opf> {
        let opf_path = self.get_opf_path()?;
        let opf_content = self.extract_file(&opf_path)?;
        Opf::parse_xml(&opf_content)
    }

    /// OPF所在目录(用于拼接清单中的相对路径)
    pub fn get_opf_directory(&mut self) -> Result<String> {
        let opf_path = self.get_opf_path()?;
        Ok(match opf_path.rfind('/') {
            Some(pos) => opf_path[..pos + 1].to_string(),
            None => String::new(),
        })
    }
}
