pub mod chapter;
pub mod config;
pub mod epub;
pub mod html;
pub mod pipeline;

#[cfg(test)]
mod test_support;

// === 核心API重新导出 ===

/// 转换流水线(主要接口)
pub use pipeline::{convert_bytes, convert_file, discover_metadata, prepare_chapters, Conversion};

/// 转换选项
pub use config::ConvertOptions;

/// 错误处理
pub use epub::{EpubError, Result};

// === 数据结构 ===

/// 章节
pub use chapter::{Chapter, TitleParts};

/// 书籍元数据与插图
pub use epub::{ImageSpec, PackageMeta, PageProgression};

/// 组装完成的EPUB包
pub use epub::{Package, PackageFile};

/// 标记树
pub use html::{Element, Node};

// === 底层组件（高级用法） ===

/// 容器组件
pub use epub::{Container, RootFile};

/// OPF组件
pub use epub::{ManifestItem, Opf, PackageStamp, SpineItem};

/// EPUB读取器
pub use epub::Epub;

// === 库信息 ===

/// WordForge库的版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WordForge库的描述
pub const DESCRIPTION: &str = "将Word导出的HTML文档转换为EPUB3电子书";

// === 便捷函数 ===

/// 快速打开EPUB文件
///
/// 这是 `Epub::from_path` 的便捷包装函数。
///
/// # 参数
/// * `path` - EPUB文件路径
///
/// # 返回值
/// * `Result<Epub>` - 通过mimetype校验的EPUB实例
///
/// # 示例
///
/// ```no_run
/// let mut epub = wordforge::open("book.epub")?;
/// let opf = epub.parse_opf()?;
/// println!("书名: {:?}", opf.title);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Epub> {
    Epub::from_path(path)
}
