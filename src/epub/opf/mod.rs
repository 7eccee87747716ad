//! OPF（Open Packaging Format）模块
//!
//! 此模块负责包文档的生成与解析，包括元数据、清单、脊柱等信息。

mod builder;
mod manifest;
mod metadata;
mod parser;
mod spine;

// 重新导出公共类型
pub use builder::{build_opf, PackageStamp};
pub use manifest::{media_type_for, ManifestItem, XHTML_MEDIA_TYPE};
pub use metadata::{
    ImageSpec,
    PackageMeta,
    DEFAULT_AUTHOR,
    DEFAULT_LANGUAGE,
    DEFAULT_TITLE,
    INSERT_AFTER_TOC,
};
pub use parser::Opf;
pub use spine::{PageProgression, SpineItem};
