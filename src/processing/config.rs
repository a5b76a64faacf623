//! # 配置模块
//!
//! ## 设计思路
//!
//! 将流水线所有“可调阈值”集中到 `ProcessingConfig`，保证行为可观测、可调整、可测试。
//! 默认值即生产策略：50 MB 输入上限、最小宽度 800px、全图 1920px、缩略图 320px。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用配置。
//! - 整个结构体可由 JSON 配置文件反序列化，缺省字段回落到默认值。
//! - `validate` 在服务构建时拒绝自相矛盾的参数组合。

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use super::ProcessingError;

/// 允许的输入 MIME 类型。
pub const ACCEPTED_MIME_TYPES: [&str; 7] = [
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/avif",
    "image/gif",
    "image/tiff",
    "image/bmp",
];

/// 降采样滤镜。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResizeFilter {
    Nearest,
    Bilinear,
    CatmullRom,
    Lanczos3,
}

impl ResizeFilter {
    pub(crate) fn to_image_filter(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Bilinear => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }

    pub(crate) fn to_fast_filter(self) -> fast_image_resize::FilterType {
        match self {
            Self::Nearest => fast_image_resize::FilterType::Box,
            Self::Bilinear => fast_image_resize::FilterType::Bilinear,
            Self::CatmullRom => fast_image_resize::FilterType::CatmullRom,
            Self::Lanczos3 => fast_image_resize::FilterType::Lanczos3,
        }
    }
}

/// 壁纸处理配置。
///
/// 字段覆盖加载、校验、缩放、编码与缩略图五个阶段。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// 本地文件 / 下载内容允许的最大体积（字节）。
    pub max_file_size: u64,
    /// 解码前按图片头信息检查的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 最小宽度，低于该值直接判定校验失败。
    pub min_width: u32,
    /// 超过该宽/高即标记为超大图（仅记录，不报错）。
    pub oversize_threshold: u32,
    /// 全尺寸输出的目标宽度。
    pub target_width: u32,
    /// 缩略图目标宽度。
    pub thumbnail_width: u32,
    /// 首选格式（AVIF）的编码质量，0~100。
    pub preferred_quality: u8,
    /// 回退格式（JPEG）的编码质量，0~100。
    pub fallback_quality: u8,
    /// 缩略图编码质量，0~100。
    pub thumbnail_quality: u8,
    /// AVIF 编码速度，1（最慢）~10（最快）。
    pub avif_speed: u8,
    /// 降采样滤镜策略。
    pub resize_filter: ResizeFilter,
    /// 网络下载总超时（秒）。
    pub download_timeout: u64,
    /// 建立连接超时（秒）。
    pub connect_timeout: u64,
    /// 下载分块读取超时（毫秒）。
    pub stream_chunk_timeout_ms: u64,
    /// 最大重定向次数。
    pub max_redirects: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_file_size: 50 * 1024 * 1024,
            max_decoded_pixels: 16_384 * 16_384,
            min_width: 800,
            oversize_threshold: 8000,
            target_width: 1920,
            thumbnail_width: 320,
            preferred_quality: 50,
            fallback_quality: 78,
            thumbnail_quality: 60,
            avif_speed: 8,
            resize_filter: ResizeFilter::Lanczos3,
            download_timeout: 60,
            connect_timeout: 10,
            stream_chunk_timeout_ms: 15_000,
            max_redirects: 5,
        }
    }
}

impl ProcessingConfig {
    /// 校验参数组合是否自洽。
    pub fn validate(&self) -> Result<(), ProcessingError> {
        if self.target_width == 0 || self.thumbnail_width == 0 {
            return Err(ProcessingError::Validation(
                "目标宽度与缩略图宽度必须大于 0".to_string(),
            ));
        }
        if self.thumbnail_width > self.target_width {
            return Err(ProcessingError::Validation(format!(
                "缩略图宽度 {} 不能大于全图目标宽度 {}",
                self.thumbnail_width, self.target_width
            )));
        }
        for (label, quality) in [
            ("preferred_quality", self.preferred_quality),
            ("fallback_quality", self.fallback_quality),
            ("thumbnail_quality", self.thumbnail_quality),
        ] {
            if quality == 0 || quality > 100 {
                return Err(ProcessingError::Validation(format!(
                    "{label} 必须在 1~100 之间（当前 {quality}）"
                )));
            }
        }
        if !(1..=10).contains(&self.avif_speed) {
            return Err(ProcessingError::Validation(format!(
                "avif_speed 必须在 1~10 之间（当前 {}）",
                self.avif_speed
            )));
        }
        if self.max_file_size == 0 {
            return Err(ProcessingError::Validation("max_file_size 不能为 0".to_string()));
        }
        Ok(())
    }

    /// 判断 MIME 类型是否在允许集合内（大小写、参数不敏感）。
    pub fn is_accepted_mime(mime: &str) -> bool {
        let normalized = normalize_mime(mime);
        ACCEPTED_MIME_TYPES.contains(&normalized.as_str())
    }
}

/// 统一 MIME 表示：去掉参数、转小写，`image/jpg` 视为 `image/jpeg`。
pub(crate) fn normalize_mime(mime: &str) -> String {
    let base = mime
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if base == "image/jpg" {
        "image/jpeg".to_string()
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        ProcessingConfig::default()
            .validate()
            .expect("default config should be valid");
    }

    #[test]
    fn rejects_thumbnail_wider_than_target() {
        let config = ProcessingConfig {
            thumbnail_width: 4000,
            ..ProcessingConfig::default()
        };
        assert!(matches!(config.validate(), Err(ProcessingError::Validation(_))));
    }

    #[test]
    fn rejects_out_of_range_quality() {
        let config = ProcessingConfig {
            fallback_quality: 0,
            ..ProcessingConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn mime_check_ignores_case_and_params() {
        assert!(ProcessingConfig::is_accepted_mime("IMAGE/PNG"));
        assert!(ProcessingConfig::is_accepted_mime("image/jpeg; charset=binary"));
        assert!(ProcessingConfig::is_accepted_mime("image/jpg"));
        assert!(!ProcessingConfig::is_accepted_mime("image/svg+xml"));
        assert!(!ProcessingConfig::is_accepted_mime("application/pdf"));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: ProcessingConfig =
            serde_json::from_str(r#"{ "target_width": 2560, "resize_filter": "catmull-rom" }"#)
                .expect("partial config should parse");
        assert_eq!(config.target_width, 2560);
        assert_eq!(config.resize_filter, ResizeFilter::CatmullRom);
        assert_eq!(config.min_width, 800);
        assert_eq!(config.max_file_size, 50 * 1024 * 1024);
    }
}
