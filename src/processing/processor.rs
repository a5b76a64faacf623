//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `WallpaperProcessor` 只负责流程编排与配置管理，不触碰任何持久化存储。
//! 处理链路固定为：
//! 1. 读取配置快照
//! 2. 按来源加载原始字节
//! 3. 解码并校验尺寸
//! 4. 缩放 → 编码全图
//! 5. 独立缩放 → 编码缩略图
//!
//! ## 实现思路
//!
//! - 配置通过 `Arc<RwLock<ProcessingConfig>>` 支持运行时更新，单次处理内使用同一快照。
//! - 解码、缩放、编码属于 CPU 密集操作，放到 `spawn_blocking` 线程池执行。
//! - 每个阶段切换时上报一次进度；任一阶段失败立即中止并上报 `error`。
//! - 记录 `load/decode/resize/encode/thumbnail/total` 阶段耗时，便于性能诊断。

use std::sync::{Arc, RwLock};
use std::time::Instant;

use image::DynamicImage;

use super::encoder::{EncodeSettings, FormatSupport, to_data_url};
use super::naming::extract_display_name;
use super::progress::{ProcessingStatus, ProgressSink, ProgressTracker};
use super::source::{ImageSource, ProcessedWallpaper, RawImageData};
use super::{ProcessingConfig, ProcessingError};
use crate::storage::Blob;

/// 壁纸处理器。
///
/// 持有配置状态与（惰性探测的）编码能力，可跨任务共享。
pub struct WallpaperProcessor {
    pub(super) config: Arc<RwLock<ProcessingConfig>>,
    pub(super) format_support: Arc<FormatSupport>,
}

impl WallpaperProcessor {
    /// 根据初始配置创建处理器。
    ///
    /// # 示例
    /// ```rust
    /// use wallpaper_vault::processing::{ProcessingConfig, WallpaperProcessor};
    ///
    /// let processor = WallpaperProcessor::new(ProcessingConfig::default())?;
    /// assert_eq!(processor.config_snapshot()?.target_width, 1920);
    /// # Ok::<(), wallpaper_vault::processing::ProcessingError>(())
    /// ```
    pub fn new(config: ProcessingConfig) -> Result<Self, ProcessingError> {
        Self::with_format_support(config, FormatSupport::default())
    }

    /// 使用指定的编码能力探测器创建处理器。
    pub fn with_format_support(
        config: ProcessingConfig,
        format_support: FormatSupport,
    ) -> Result<Self, ProcessingError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            format_support: Arc::new(format_support),
        })
    }

    /// 获取配置快照。
    pub fn config_snapshot(&self) -> Result<ProcessingConfig, ProcessingError> {
        self.config
            .read()
            .map(|cfg| cfg.clone())
            .map_err(|_| ProcessingError::Load("配置读取锁已中毒".to_string()))
    }

    /// 替换处理配置，后续请求生效。
    pub fn update_config(&self, config: ProcessingConfig) -> Result<(), ProcessingError> {
        config.validate()?;
        let mut current = self
            .config
            .write()
            .map_err(|_| ProcessingError::Load("配置写入锁已中毒".to_string()))?;
        *current = config;
        log::info!("⚙️ 已更新图片处理配置");
        Ok(())
    }

    pub fn format_support(&self) -> &FormatSupport {
        &self.format_support
    }

    /// 处理主入口：加载、校验、缩放、编码并生成缩略图。
    ///
    /// 每次阶段切换都会回调 `on_progress`；失败时额外回调一次 `error`。
    pub async fn process(
        &self,
        source: ImageSource,
        on_progress: &ProgressSink<'_>,
    ) -> Result<ProcessedWallpaper, ProcessingError> {
        let tracker = ProgressTracker::new(on_progress);

        match self.run_stages(source, &tracker).await {
            Ok(processed) => {
                tracker.emit(ProcessingStatus::Complete, "处理完成");
                Ok(processed)
            }
            Err(err) => {
                log::warn!("❌ 壁纸处理失败 [{}]：{}", err.code(), err);
                tracker.emit(ProcessingStatus::Error, err.to_string());
                Err(err)
            }
        }
    }

    async fn run_stages(
        &self,
        source: ImageSource,
        tracker: &ProgressTracker<'_>,
    ) -> Result<ProcessedWallpaper, ProcessingError> {
        let config = self.config_snapshot()?;
        let total_start = Instant::now();

        let original_source = source.kind();
        let original_name = source.original_name();
        let name = extract_display_name(&original_name);

        tracker.emit(ProcessingStatus::Loading, "正在加载图片…");
        let load_start = Instant::now();
        let raw = match source {
            ImageSource::Url(url) => self.load_from_url(&url, &config).await?,
            ImageSource::File(file) => self.load_from_file(&file, &config).await?,
            ImageSource::Memory {
                mime_type, bytes, ..
            } => self.load_from_memory(&mime_type, &bytes, &config)?,
        };
        let load_elapsed = load_start.elapsed();

        let decode_start = Instant::now();
        let decoded = Arc::new(decode_blocking(raw, config.clone()).await?);
        let decode_elapsed = decode_start.elapsed();

        tracker.emit(ProcessingStatus::Validating, "正在校验图片尺寸…");
        let report = Self::validate_dimensions(&decoded, &config)?;

        tracker.emit(ProcessingStatus::Resizing, "正在调整尺寸…");
        let resize_start = Instant::now();
        let resized = {
            let source = Arc::clone(&decoded);
            let (target_width, filter) = (config.target_width, config.resize_filter);
            run_blocking(ProcessingError::Encode, move || {
                Ok(Self::resize_to_width(&source, target_width, filter))
            })
            .await?
        };
        let resize_elapsed = resize_start.elapsed();
        let (width, height) = (resized.width(), resized.height());

        tracker.emit(ProcessingStatus::Converting, "正在编码图片…");
        let encode_start = Instant::now();
        let encoded = {
            let support = Arc::clone(&self.format_support);
            let settings = EncodeSettings {
                preferred_quality: config.preferred_quality,
                fallback_quality: config.fallback_quality,
                avif_speed: config.avif_speed,
            };
            run_blocking(ProcessingError::Encode, move || support.encode(&resized, settings)).await?
        };
        let encode_elapsed = encode_start.elapsed();

        tracker.emit(ProcessingStatus::GeneratingThumbnail, "正在生成缩略图…");
        let thumbnail_start = Instant::now();
        let thumbnail_data_url = {
            let support = Arc::clone(&self.format_support);
            let source = Arc::clone(&decoded);
            let (thumbnail_width, filter) = (config.thumbnail_width, config.resize_filter);
            let settings = EncodeSettings {
                preferred_quality: config.thumbnail_quality,
                fallback_quality: config.thumbnail_quality,
                avif_speed: config.avif_speed,
            };
            run_blocking(ProcessingError::Encode, move || {
                let thumbnail = Self::resize_to_width(&source, thumbnail_width, filter);
                support
                    .encode(&thumbnail, settings)
                    .map(|encoded| to_data_url(&encoded))
            })
            .await?
        };
        let thumbnail_elapsed = thumbnail_start.elapsed();

        let size_bytes = encoded.bytes.len() as u64;
        let blob = Blob::new(encoded.bytes, encoded.format.mime_type());

        log::info!(
            "✅ 壁纸处理完成 - {}x{} -> {}x{} {} {}KB load={}ms decode={}ms resize={}ms encode={}ms thumbnail={}ms total={}ms",
            report.width,
            report.height,
            width,
            height,
            encoded.format.mime_type(),
            size_bytes / 1024,
            load_elapsed.as_millis(),
            decode_elapsed.as_millis(),
            resize_elapsed.as_millis(),
            encode_elapsed.as_millis(),
            thumbnail_elapsed.as_millis(),
            total_start.elapsed().as_millis()
        );

        Ok(ProcessedWallpaper {
            blob,
            thumbnail_data_url,
            width,
            height,
            original_width: report.width,
            original_height: report.height,
            size_bytes,
            name,
            original_source,
            original_name,
            oversized: report.oversized,
        })
    }
}

async fn decode_blocking(
    raw: RawImageData,
    config: ProcessingConfig,
) -> Result<DynamicImage, ProcessingError> {
    run_blocking(ProcessingError::Load, move || {
        WallpaperProcessor::decode(&raw, &config)
    })
    .await
}

/// 在阻塞线程池中执行 CPU 密集任务；任务异常终止时按 `on_join_error` 映射错误。
async fn run_blocking<T, F>(
    on_join_error: fn(String) -> ProcessingError,
    task: F,
) -> Result<T, ProcessingError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ProcessingError> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| on_join_error(format!("后台任务异常终止：{}", e)))?
}
