//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义全局统一的 `AppError` 枚举，处理流水线与存储层各自的错误通过 `From`
//! 汇入，调用方（CLI / UI 适配层）只需面对一种错误类型。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `ProcessingError`、`StorageError` 提供 `From` 转换，无需手动 map。
//! - 实现 `Serialize` 将错误序列化为字符串，便于直接传给前端展示。

use serde::Serialize;

use crate::processing::ProcessingError;
use crate::storage::StorageError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 图片处理流水线错误（加载 / 校验 / 编码）
    #[error("{0}")]
    Processing(#[from] ProcessingError),

    /// 元数据或图片数据存储失败
    #[error("{0}")]
    Storage(#[from] StorageError),

    /// 配置不可用
    #[error("配置错误: {0}")]
    Config(String),

    /// 自定义壁纸数量已达上限
    #[error("自定义壁纸数量已达上限（{limit} 张），请先删除不需要的壁纸")]
    CapacityReached { limit: usize },

    #[error("未找到自定义壁纸: {0}")]
    NotFound(String),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),
}

/// 将错误序列化为人类可读的字符串。
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
