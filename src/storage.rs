//! 自定义壁纸存储模块
//!
//! # 设计思路
//!
//! 两层存储：体积小、需要启动即用的元数据放在 JSON 文件，
//! 体积大、按需读取的全尺寸图片放在 SQLite blob 表。两者按壁纸 ID 关联。
//!
//! # 实现思路
//!
//! - `blob`：`Blob` 值类型与 `BlobStore` 异步接口
//! - `sqlite_blob`：基于 `rusqlite` 的 blob 存储（`schema` 负责建表与迁移）
//! - `metadata`：元数据模型、版本化 JSON 信封与 `MetadataStore`
//! - `object_url`：进程内的 `blob:` 地址注册表
//! - `registry`：`CustomWallpaperStore`，组合以上各层并负责启动对账

mod blob;
mod error;
mod metadata;
mod object_url;
mod registry;
mod schema;
mod sqlite_blob;

pub use blob::{Blob, BlobStore};
pub use error::StorageError;
pub use metadata::{
    JsonMetadataStore, METADATA_VERSION, MetadataStore, OriginalSource, WallpaperMetadata,
    is_valid_thumbnail_data_url,
};
pub use object_url::{ObjectUrl, ObjectUrlRegistry};
pub use registry::CustomWallpaperStore;
pub use sqlite_blob::SqliteBlobStore;
