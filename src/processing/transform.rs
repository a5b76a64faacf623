//! # 解码与缩放模块
//!
//! ## 设计思路
//!
//! 将“字节 → 图像 → 目标尺寸”的过程集中管理，并在完整解码之前按图片头做像素上限检查，
//! 降低恶意输入触发高内存开销的风险。
//!
//! ## 实现思路
//!
//! 1. 读取 header 尺寸，按像素上限快速拒绝
//! 2. 完整解码
//! 3. 最小宽度校验，超大图仅标记
//! 4. 等比缩放（只缩不放），优先 `fast_image_resize`，失败回退 `image::resize_exact`

use std::io::Cursor;

use fast_image_resize as fr;
use image::{DynamicImage, GenericImageView, ImageBuffer, ImageReader, Limits, Rgba};

use super::source::RawImageData;

/// 解码缓冲按 16 位 RGBA 估算。
const MAX_BYTES_PER_PIXEL: u64 = 8;
use super::{ProcessingConfig, ProcessingError, ResizeFilter, WallpaperProcessor};

/// 校验结论。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ValidationReport {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) oversized: bool,
}

/// 计算等比缩放后的尺寸：`scale = min(1, target / width)`。
///
/// 缩小时宽度恰好等于 `target_width`，高度四舍五入且至少为 1。
pub fn scaled_dimensions(width: u32, height: u32, target_width: u32) -> (u32, u32) {
    if width == 0 || width <= target_width {
        return (width, height);
    }

    let scale = target_width as f64 / width as f64;
    let scaled_height = ((height as f64 * scale).round() as u32).max(1);
    (target_width, scaled_height)
}

impl WallpaperProcessor {
    /// 将原始字节解码为图像。
    ///
    /// 像素策略只由 `max_decoded_pixels` 决定，解码器的内存上限随之放宽。
    pub(super) fn decode(
        raw: &RawImageData,
        config: &ProcessingConfig,
    ) -> Result<DynamicImage, ProcessingError> {
        let (header_width, header_height) = Self::inspect_dimensions(&raw.bytes)?;
        Self::validate_pixel_limits(config, header_width, header_height)?;

        let mut reader = ImageReader::new(Cursor::new(raw.bytes.as_slice()))
            .with_guessed_format()
            .map_err(|e| ProcessingError::Load(format!("无法识别图片格式：{}", e)))?;
        reader.limits(Self::decode_limits(config));

        let decoded = reader
            .decode()
            .map_err(|e| ProcessingError::Load(format!("图片解码失败：{}", e)))?;

        log::debug!(
            "🧩 解码完成 - 来源: {} 尺寸: {}x{}",
            raw.source_hint,
            decoded.width(),
            decoded.height()
        );

        Ok(decoded)
    }

    /// 校验最小宽度，并标记超大图。
    pub(super) fn validate_dimensions(
        image: &DynamicImage,
        config: &ProcessingConfig,
    ) -> Result<ValidationReport, ProcessingError> {
        let (width, height) = image.dimensions();

        if width < config.min_width {
            return Err(ProcessingError::Validation(format!(
                "图片宽度 {}px 小于最小要求 {}px，请选择更高分辨率的图片",
                width, config.min_width
            )));
        }

        let oversized = width > config.oversize_threshold || height > config.oversize_threshold;
        if oversized {
            log::info!(
                "📐 超大图片 {}x{}（阈值 {}px），将在缩放阶段处理",
                width,
                height,
                config.oversize_threshold
            );
        }

        Ok(ValidationReport {
            width,
            height,
            oversized,
        })
    }

    /// 按目标宽度等比缩放；不需要缩放时原样返回。
    pub(super) fn resize_to_width(
        image: &DynamicImage,
        target_width: u32,
        filter: ResizeFilter,
    ) -> DynamicImage {
        let (width, height) = image.dimensions();
        let (target_w, target_h) = scaled_dimensions(width, height, target_width);

        if (target_w, target_h) == (width, height) {
            return image.clone();
        }

        log::debug!("🧩 缩放：{}x{} -> {}x{}（filter={:?}）", width, height, target_w, target_h, filter);

        match Self::resize_with_fast_image_resize(image, target_w, target_h, filter) {
            Ok(resized) => resized,
            Err(err) => {
                log::warn!("⚠️ fast_image_resize 缩放失败，回退 image::resize_exact：{}", err);
                image.resize_exact(target_w, target_h, filter.to_image_filter())
            }
        }
    }

    pub(super) fn decode_limits(config: &ProcessingConfig) -> Limits {
        let mut limits = Limits::default();
        limits.max_alloc = Some(config.max_decoded_pixels.saturating_mul(MAX_BYTES_PER_PIXEL));
        limits
    }

    fn inspect_dimensions(bytes: &[u8]) -> Result<(u32, u32), ProcessingError> {
        ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| ProcessingError::Load(format!("无法识别图片格式：{}", e)))?
            .into_dimensions()
            .map_err(|e| ProcessingError::Load(format!("无法读取图片尺寸：{}", e)))
    }

    fn validate_pixel_limits(
        config: &ProcessingConfig,
        width: u32,
        height: u32,
    ) -> Result<(), ProcessingError> {
        let pixels = width as u64 * height as u64;

        if pixels > config.max_decoded_pixels {
            return Err(ProcessingError::Load(format!(
                "图片像素过大：{} 像素（限制：{} 像素）",
                pixels, config.max_decoded_pixels
            )));
        }

        Ok(())
    }

    fn resize_with_fast_image_resize(
        image: &DynamicImage,
        target_width: u32,
        target_height: u32,
        filter: ResizeFilter,
    ) -> Result<DynamicImage, ProcessingError> {
        let src = image.to_rgba8();
        let (src_width, src_height) = src.dimensions();

        let src_image = fr::images::Image::from_vec_u8(
            src_width,
            src_height,
            src.into_raw(),
            fr::PixelType::U8x4,
        )
        .map_err(|e| ProcessingError::Encode(format!("构建源图像缓冲失败：{}", e)))?;

        let mut dst_image = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x4);

        let mut resizer = fr::Resizer::new();
        let options = fr::ResizeOptions::new()
            .resize_alg(fr::ResizeAlg::Convolution(filter.to_fast_filter()));

        resizer
            .resize(&src_image, &mut dst_image, Some(&options))
            .map_err(|e| ProcessingError::Encode(format!("fast_image_resize 执行失败：{}", e)))?;

        let rgba = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(
            target_width,
            target_height,
            dst_image.into_vec(),
        )
        .ok_or_else(|| ProcessingError::Encode("fast_image_resize 输出缓冲长度异常".to_string()))?;

        Ok(DynamicImage::ImageRgba8(rgba))
    }
}
