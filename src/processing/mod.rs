//! # 壁纸处理模块（processing）
//!
//! ## 设计思路
//!
//! 该模块将“来源识别 → 加载校验 → 解码缩放 → 编码 → 缩略图”按职责拆分为多个子模块，
//! 只产出 `ProcessedWallpaper`，不触碰任何持久化存储。
//!
//! - `processor`：编排整条处理流水线
//! - `loader`：负责 URL / 文件 / 内存来源加载与安全校验
//! - `transform`：负责解码、像素限制、尺寸校验、缩放
//! - `encoder`：负责 AVIF / JPEG 编码与能力探测
//! - `naming`：显示名称与 ID 派生
//! - `config/error/progress/source`：配置、错误、进度、中间数据模型
//!
//! ## 新同事快速上手
//!
//! ```text
//! WallpaperService::import
//!    ↓
//! processor.rs（统一编排 + 进度 + 阶段耗时日志）
//!    ├─ loader.rs（来源加载 + 类型/体积校验）
//!    ├─ transform.rs（解码 + 最小宽度 + 缩放）
//!    └─ encoder.rs（AVIF 优先，JPEG 回退）
//!    ↓
//! ProcessedWallpaper
//! ```

mod config;
mod encoder;
mod error;
mod loader;
mod naming;
mod processor;
mod progress;
mod source;
mod transform;

pub use config::{ACCEPTED_MIME_TYPES, ProcessingConfig, ResizeFilter};
pub use encoder::{FormatSupport, OutputFormat};
pub use error::ProcessingError;
pub use naming::{
    CUSTOM_ID_PREFIX, DEFAULT_DISPLAY_NAME, ensure_unique_id, extract_display_name, name_to_id,
};
pub use processor::WallpaperProcessor;
pub use progress::{ProcessingProgress, ProcessingStatus, ProgressSink};
pub(crate) use progress::ProgressTracker;
pub use source::{ImageSource, LocalFile, ProcessedWallpaper};
pub use transform::scaled_dimensions;
