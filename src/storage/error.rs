//! 存储层错误类型
//!
//! 二进制存储与元数据存储共用一个错误枚举，上层统一归入 `AppError::Storage`。

/// 存储层错误。
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// 二进制（blob）存储读写失败
    #[error("图片数据存储失败：{0}")]
    Blob(String),

    /// 元数据存储读写失败
    #[error("元数据存储失败：{0}")]
    Metadata(String),

    #[error("元数据序列化失败：{0}")]
    Serialization(#[from] serde_json::Error),

    #[error("文件读写失败：{0}")]
    Io(#[from] std::io::Error),

    /// 元数据内容不满足约束（例如缩略图不是合法 Data URL）
    #[error("元数据不合法：{0}")]
    InvalidMetadata(String),

    #[error("不支持的元数据版本：{found}（当前支持 {supported}）")]
    UnsupportedVersion { found: u64, supported: u64 },
}

impl From<rusqlite::Error> for StorageError {
    fn from(error: rusqlite::Error) -> Self {
        StorageError::Blob(format!("数据库错误：{}", error))
    }
}

impl From<StorageError> for String {
    fn from(error: StorageError) -> Self {
        error.to_string()
    }
}
