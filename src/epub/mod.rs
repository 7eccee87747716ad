pub mod error;
pub mod container;
pub mod opf;
pub mod xhtml;
pub mod writer;
pub mod reader;

// 重新导出错误处理
pub use error::{EpubError, Result};

// 重新导出容器相关
pub use container::{Container, RootFile};

// 重新导出OPF相关
pub use opf::{
    ImageSpec,
    ManifestItem,
    Opf,
    PackageMeta,
    PackageStamp,
    PageProgression,
    SpineItem,
};

// 重新导出内容文档与打包
pub use xhtml::{build_image_page, build_toc, render_chapter, RenderedDocument};
pub use writer::{Package, PackageFile};

// 重新导出EPUB读取器
pub use reader::Epub;
