//! 二进制存储抽象
//!
//! `Blob` 等价于浏览器里的 Blob：字节 + 内容类型。
//! `BlobStore` 是按壁纸 ID 寻址的持久化键值存储，所有访问都是异步挂起点。

use async_trait::async_trait;
use bytes::Bytes;

use super::StorageError;

/// 编码后的图片数据。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub bytes: Bytes,
    /// `image/avif` 或 `image/jpeg`。
    pub content_type: String,
}

impl Blob {
    pub fn new(bytes: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// 按 ID 寻址的二进制存储。
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// 写入（同 ID 覆盖）。
    async fn put(&self, id: &str, blob: Blob) -> Result<(), StorageError>;

    /// 读取；不存在时返回 `Ok(None)`。
    async fn get(&self, id: &str) -> Result<Option<Blob>, StorageError>;

    /// 删除；不存在时视为成功。
    async fn delete(&self, id: &str) -> Result<(), StorageError>;

    /// 当前存储中的全部 ID（按字典序）。
    async fn ids(&self) -> Result<Vec<String>, StorageError>;
}
