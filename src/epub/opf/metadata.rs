//! 书籍元数据模块
//!
//! 从YAML文件加载书名、作者、翻页方向以及插图列表。
//!
//! ```yaml
//! title:
//!   - text: 作品名
//! creator:
//!   - text: 著者名
//! page-progression-direction: rtl
//! images:
//!   - file: cover.jpg
//!     type: insert_after_toc
//! ```

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::epub::error::{EpubError, Result};
use crate::epub::opf::spine::PageProgression;

/// 未设置书名时使用的标题
pub const DEFAULT_TITLE: &str = "タイトル未設定";

/// 未设置作者时使用的名字
pub const DEFAULT_AUTHOR: &str = "著者未設定";

/// 默认语言
pub const DEFAULT_LANGUAGE: &str = "ja";

/// 插入到目录之后的图片类型
pub const INSERT_AFTER_TOC: &str = "insert_after_toc";

/// 插图描述
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImageSpec {
    /// 图片文件路径
    pub file: String,
    /// 插入位置，如`insert_after_toc`
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl ImageSpec {
    pub fn new(file: impl Into<String>, kind: Option<&str>) -> Self {
        Self {
            file: file.into(),
            kind: kind.map(str::to_string),
        }
    }

    /// 是否需要在目录后生成单独的图片页
    pub fn inserts_after_toc(&self) -> bool {
        self.kind.as_deref() == Some(INSERT_AFTER_TOC)
    }

    /// 包内使用的文件名(去掉目录部分)
    pub fn basename(&self) -> &str {
        self.file
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.file)
    }

    /// 解析图片的实际路径
    ///
    /// 相对路径优先相对于元数据文件所在目录，找不到时相对于当前目录。
    pub fn resolve(&self, base_dir: Option<&Path>) -> PathBuf {
        let path = PathBuf::from(&self.file);
        if path.is_absolute() {
            return path;
        }

        if let Some(dir) = base_dir {
            let candidate = dir.join(&path);
            if candidate.exists() {
                return candidate;
            }
        }

        path
    }
}

/// 书籍元数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageMeta {
    /// 书名
    pub title: String,
    /// 作者
    pub author: String,
    /// 语言
    pub language: String,
    /// 唯一标识符，未设置时生成`urn:uuid:`
    pub identifier: Option<String>,
    /// 翻页方向
    pub page_progression: PageProgression,
    /// 插图列表(按声明顺序)
    pub images: Vec<ImageSpec>,
    /// 元数据文件所在目录，用于解析图片的相对路径
    pub base_dir: Option<PathBuf>,
}

impl Default for PackageMeta {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            author: DEFAULT_AUTHOR.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            identifier: None,
            page_progression: PageProgression::default(),
            images: Vec::new(),
            base_dir: None,
        }
    }
}

/// YAML中的文本字段：可以是字符串，也可以是`[{text: ...}]`列表
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TextField {
    Plain(String),
    Entries(Vec<TextEntry>),
}

#[derive(Debug, Deserialize)]
struct TextEntry {
    #[serde(default)]
    text: String,
}

impl TextField {
    fn first_text(&self) -> Option<String> {
        let text = match self {
            TextField::Plain(text) => text.trim(),
            TextField::Entries(entries) => entries.first()?.text.trim(),
        };
        (!text.is_empty()).then(|| text.to_string())
    }
}

/// 元数据文件的原始结构
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMetadata {
    title: Option<TextField>,
    creator: Option<TextField>,
    #[serde(rename = "page-progression-direction")]
    page_progression_direction: Option<String>,
    language: Option<String>,
    identifier: Option<String>,
    images: Vec<ImageSpec>,
}

impl PackageMeta {
    /// 从YAML字符串解析元数据
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let raw: RawMetadata = if content.trim().is_empty() {
            RawMetadata::default()
        } else {
            serde_yml::from_str(content)
                .map_err(|e| EpubError::ConfigError(format!("元数据格式错误: {}", e)))?
        };

        let defaults = Self::default();
        Ok(Self {
            title: raw
                .title
                .and_then(|field| field.first_text())
                .unwrap_or(defaults.title),
            author: raw
                .creator
                .and_then(|field| field.first_text())
                .unwrap_or(defaults.author),
            language: raw
                .language
                .filter(|lang| !lang.trim().is_empty())
                .unwrap_or(defaults.language),
            identifier: raw.identifier.filter(|id| !id.trim().is_empty()),
            page_progression: raw
                .page_progression_direction
                .as_deref()
                .map(PageProgression::parse_lenient)
                .unwrap_or_default(),
            images: raw.images,
            base_dir: None,
        })
    }

    /// 从YAML文件加载元数据
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| EpubError::ConfigError(format!("无法读取元数据文件 {}: {}", path.display(), e)))?;

        let mut meta = Self::from_yaml_str(&content)?;
        meta.base_dir = path.parent().map(Path::to_path_buf);
        Ok(meta)
    }

    /// 尝试加载元数据，失败时给出警告并使用默认值
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            warn!("未指定元数据文件，使用默认值");
            return Self::default();
        };

        if !path.is_file() {
            warn!("元数据文件 '{}' 不存在，使用默认值", path.display());
            return Self::default();
        }

        match Self::from_file(path) {
            Ok(meta) => meta,
            Err(e) => {
                warn!("{}，使用默认值", e);
                Self::default()
            }
        }
    }
}
