//! # 服务层
//!
//! ## 设计思路
//!
//! `WallpaperService` 由调用方显式构建并持有，替代全局单例：
//! 一个处理器（含记忆化的编码能力）加一个存储实例，生命周期由入口统一管理，
//! 测试可以创建互不干扰的独立实例。
//!
//! ## 实现思路
//!
//! 导入流程：容量检查 → 处理 → 派生唯一 ID → 写入存储 → 返回运行时句柄。
//! 处理阶段可以并发；保存阶段由 `save_lock` 串行化，
//! 容量复查、ID 派生与写入在同一临界区内完成，并发导入不会撞 ID 或越过上限。
//! 处理器的 `complete` 信号被拦截，改由服务在存储写入完成后发出，
//! 中间插入 `saving` 阶段。

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::processing::{
    FormatSupport, ImageSource, ProcessingProgress, ProcessingStatus, ProgressSink,
    ProgressTracker, WallpaperProcessor, ensure_unique_id, name_to_id,
};
use crate::storage::{
    Blob, BlobStore, CustomWallpaperStore, JsonMetadataStore, MetadataStore, ObjectUrl,
    SqliteBlobStore, WallpaperMetadata,
};

/// 导入成功后的结果。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedWallpaper {
    pub metadata: WallpaperMetadata,
    #[serde(serialize_with = "serialize_object_url")]
    pub url: ObjectUrl,
}

fn serialize_object_url<S>(url: &ObjectUrl, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(url.as_str())
}

/// 自定义壁纸服务。
pub struct WallpaperService {
    processor: WallpaperProcessor,
    store: CustomWallpaperStore,
    max_wallpapers: usize,
    save_lock: tokio::sync::Mutex<()>,
}

impl WallpaperService {
    /// 由已构建的组件组装服务。
    pub fn new(processor: WallpaperProcessor, store: CustomWallpaperStore, max_wallpapers: usize) -> Self {
        Self {
            processor,
            store,
            max_wallpapers,
            save_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// 按配置在数据目录下打开服务（SQLite blob + JSON 元数据）。
    pub fn open(config: &AppConfig, data_dir: &Path) -> Result<Self, AppError> {
        Self::open_with_format_support(config, data_dir, FormatSupport::default())
    }

    pub fn open_with_format_support(
        config: &AppConfig,
        data_dir: &Path,
        format_support: FormatSupport,
    ) -> Result<Self, AppError> {
        let processor =
            WallpaperProcessor::with_format_support(config.processing.clone(), format_support)?;

        let blobs: Arc<dyn BlobStore> =
            Arc::new(SqliteBlobStore::open(&config.storage.blob_path(data_dir))?);
        let metadata: Arc<dyn MetadataStore> =
            Arc::new(JsonMetadataStore::new(config.storage.metadata_path(data_dir)));
        let store = CustomWallpaperStore::open(blobs, metadata)?;

        Ok(Self::new(processor, store, config.storage.max_wallpapers))
    }

    pub fn processor(&self) -> &WallpaperProcessor {
        &self.processor
    }

    pub fn store(&self) -> &CustomWallpaperStore {
        &self.store
    }

    pub fn max_wallpapers(&self) -> usize {
        self.max_wallpapers
    }

    /// 启动对账，生成全部运行时句柄。
    pub async fn initialize(&self) {
        self.store.initialize_object_urls().await;
    }

    /// 导入一张自定义壁纸。
    ///
    /// 进度序列：`loading → validating → resizing → converting → generating-thumbnail → saving → complete`，
    /// 任一步失败以 `error` 结束。
    pub async fn import(
        &self,
        source: ImageSource,
        on_progress: &ProgressSink<'_>,
    ) -> Result<ImportedWallpaper, AppError> {
        self.check_capacity()?;

        let tracker = ProgressTracker::new(on_progress);
        let forward = |progress: ProcessingProgress| {
            if progress.status != ProcessingStatus::Complete {
                tracker.emit(progress.status, progress.message);
            }
        };

        let processed = self.processor.process(source, &forward).await?;

        tracker.emit(ProcessingStatus::Saving, "正在保存…");

        let _guard = self.save_lock.lock().await;
        if let Err(err) = self.check_capacity() {
            tracker.emit(ProcessingStatus::Error, err.to_string());
            return Err(err);
        }

        let id = ensure_unique_id(&name_to_id(&processed.name), &self.store.ids());
        let metadata = WallpaperMetadata::from_processed(id, &processed);

        match self.store.add_wallpaper(metadata.clone(), processed.blob).await {
            Ok(url) => {
                tracker.emit(ProcessingStatus::Complete, "导入完成");
                Ok(ImportedWallpaper { metadata, url })
            }
            Err(err) => {
                tracker.emit(ProcessingStatus::Error, err.to_string());
                Err(err.into())
            }
        }
    }

    fn check_capacity(&self) -> Result<(), AppError> {
        if self.store.len() >= self.max_wallpapers {
            log::warn!("⚠️ 自定义壁纸已达上限 {}，拒绝导入", self.max_wallpapers);
            return Err(AppError::CapacityReached {
                limit: self.max_wallpapers,
            });
        }
        Ok(())
    }

    /// 删除壁纸；不存在时返回 `NotFound`。
    pub async fn remove(&self, id: &str) -> Result<(), AppError> {
        if self.store.remove_wallpaper(id).await {
            Ok(())
        } else {
            Err(AppError::NotFound(id.to_string()))
        }
    }

    pub async fn clear(&self) -> usize {
        self.store.clear_all().await
    }

    pub fn list(&self) -> Vec<WallpaperMetadata> {
        self.store.wallpapers()
    }

    pub fn get(&self, id: &str) -> Result<WallpaperMetadata, AppError> {
        self.store
            .get_wallpaper(id)
            .ok_or_else(|| AppError::NotFound(id.to_string()))
    }

    /// 读取全尺寸数据。
    pub async fn blob(&self, id: &str) -> Result<Blob, AppError> {
        self.store
            .get_blob(id)
            .await?
            .ok_or_else(|| AppError::NotFound(id.to_string()))
    }
}
