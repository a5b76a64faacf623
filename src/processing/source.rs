//! # 数据源与中间模型
//!
//! 将“外部输入类型”和“流水线中间结果”解耦：
//! - `ImageSource` 表示外部来源语义
//! - `RawImageData` 表示已加载但未解码的字节
//! - `ProcessedWallpaper` 表示可直接持久化的处理结果

use std::path::PathBuf;

use bytes::Bytes;

use crate::storage::{Blob, OriginalSource};

/// 本地文件来源：路径 + 可选的声明类型。
///
/// 未声明类型时按文件头（magic bytes）推断。
#[derive(Debug, Clone)]
pub struct LocalFile {
    pub path: PathBuf,
    pub mime_type: Option<String>,
}

impl LocalFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// 文件名部分，用于派生显示名称。
    pub(crate) fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.to_string_lossy().to_string())
    }
}

/// 图片输入来源。
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// 网络地址来源。
    Url(String),
    /// 本地文件路径来源。
    File(LocalFile),
    /// 内存中的文件对象（文件名 + 声明类型 + 字节）。
    Memory {
        name: String,
        mime_type: String,
        bytes: Bytes,
    },
}

impl ImageSource {
    /// 来源标签（写入元数据的 `originalSource`）。
    pub fn kind(&self) -> OriginalSource {
        match self {
            Self::Url(_) => OriginalSource::Url,
            Self::File(_) | Self::Memory { .. } => OriginalSource::File,
        }
    }

    /// 原始名称：URL 原文或文件名。
    pub fn original_name(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::File(file) => file.file_name(),
            Self::Memory { name, .. } => name.clone(),
        }
    }

    /// 把命令行参数解析为来源：`http(s)://` 开头视为 URL，其余视为本地路径。
    pub fn from_cli_arg(arg: &str, mime_type: Option<String>) -> Self {
        let lowered = arg.trim().to_ascii_lowercase();
        if lowered.starts_with("http://") || lowered.starts_with("https://") {
            return Self::Url(arg.trim().to_string());
        }
        Self::File(LocalFile {
            path: PathBuf::from(arg),
            mime_type,
        })
    }
}

/// 加载阶段输出：原始字节与来源标识。
pub(crate) struct RawImageData {
    pub(crate) bytes: Vec<u8>,
    /// 来源提示（用于日志与诊断）。
    pub(crate) source_hint: &'static str,
}

/// 流水线最终产物。
#[derive(Debug, Clone)]
pub struct ProcessedWallpaper {
    /// 全尺寸编码结果。
    pub blob: Blob,
    /// 内嵌到元数据中的缩略图 Data URL。
    pub thumbnail_data_url: String,
    /// 处理后宽度。
    pub width: u32,
    /// 处理后高度。
    pub height: u32,
    pub original_width: u32,
    pub original_height: u32,
    /// 全尺寸编码结果字节数。
    pub size_bytes: u64,
    /// 派生出的显示名称。
    pub name: String,
    pub original_source: OriginalSource,
    pub original_name: String,
    /// 原图宽或高超过超大图阈值。
    pub oversized: bool,
}
