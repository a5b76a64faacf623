//! # 自定义壁纸库：库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │            调用方（CLI / UI 适配层）                      │
//! │                    │ Result<T, AppError>                  │
//! └────────────────────┼─────────────────────────────────────┘
//!                      ↓
//! ┌────────────────────┼─────────────────────────────────────┐
//! │  service ──── WallpaperService（显式构建，无全局状态）    │
//! │    │                                                     │
//! │    ├─ processing   加载·校验·缩放·编码·缩略图·进度        │
//! │    │   └─ encoder   AVIF 优先，JPEG 回退（能力探测一次）  │
//! │    │                                                     │
//! │    └─ storage      两层存储 + 启动对账                    │
//! │        ├─ metadata     JSON 元数据（版本化信封）          │
//! │        ├─ sqlite_blob  SQLite 全尺寸数据 (rusqlite)       │
//! │        └─ registry     元数据 ⋈ blob → blob: 运行时句柄   │
//! │                                                          │
//! │  config ───── AppConfig（JSON，字段缺省回落默认值）       │
//! │  error ────── AppError（统一错误类型）                    │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError` |
//! | [`config`] | 应用配置加载与数据目录解析 |
//! | [`processing`] | 从 URL / 文件 / 内存加载图片并产出全图与缩略图 |
//! | [`storage`] | 元数据与 blob 两层持久化、运行时句柄、启动对账 |
//! | [`service`] | 导入 / 删除 / 查询的业务入口与数量上限策略 |

pub mod config;
pub mod error;
pub mod processing;
pub mod service;
pub mod storage;

pub use config::AppConfig;
pub use error::AppError;
pub use service::{ImportedWallpaper, WallpaperService};
