//! # 编码模块
//!
//! ## 设计思路
//!
//! 首选高压缩率的 AVIF；运行时不支持或编码失败时回退到通用的 JPEG。
//! AVIF 能力探测只做一次：首次编码时惰性执行并缓存到 `FormatSupport`，
//! 进程内不会重复探测，从不调用流水线时也不会产生探测开销。
//!
//! ## 实现思路
//!
//! - `FormatSupport` 内部用 `once_cell::sync::OnceCell<bool>` 记忆探测结果。
//! - 探测函数可注入，测试可以强制走回退分支。
//! - 缩略图同样走“首选 → 回退”链路，最后包装为 base64 Data URL。

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

use base64::{Engine as _, engine::general_purpose};
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder};
use once_cell::sync::OnceCell;

use super::ProcessingError;

/// 输出编码格式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Avif,
    Jpeg,
}

impl OutputFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Avif => "image/avif",
            Self::Jpeg => "image/jpeg",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Avif => "avif",
            Self::Jpeg => "jpg",
        }
    }

    /// 按 MIME 反查格式，未知类型返回 `None`。
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime {
            "image/avif" => Some(Self::Avif),
            "image/jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }
}

/// 编码结果。
pub(crate) struct EncodedImage {
    pub(crate) bytes: Vec<u8>,
    pub(crate) format: OutputFormat,
}

/// 一次编码请求的参数。
#[derive(Debug, Clone, Copy)]
pub(crate) struct EncodeSettings {
    pub(crate) preferred_quality: u8,
    pub(crate) fallback_quality: u8,
    pub(crate) avif_speed: u8,
}

/// AVIF 编码能力（惰性探测、结果记忆）。
pub struct FormatSupport {
    avif: OnceCell<bool>,
    probe: fn() -> bool,
    probes_run: AtomicUsize,
}

impl Default for FormatSupport {
    fn default() -> Self {
        Self::with_probe(probe_avif_encoder)
    }
}

impl FormatSupport {
    /// 使用自定义探测函数。
    ///
    /// ```rust
    /// use wallpaper_vault::processing::FormatSupport;
    ///
    /// let support = FormatSupport::with_probe(|| false);
    /// assert!(!support.supports_avif());
    /// assert_eq!(support.probe_count(), 1);
    /// ```
    pub fn with_probe(probe: fn() -> bool) -> Self {
        Self {
            avif: OnceCell::new(),
            probe,
            probes_run: AtomicUsize::new(0),
        }
    }

    /// 当前运行时能否编码 AVIF。首次调用时探测，之后直接返回缓存值。
    pub fn supports_avif(&self) -> bool {
        *self.avif.get_or_init(|| {
            self.probes_run.fetch_add(1, Ordering::SeqCst);
            let supported = (self.probe)();
            log::info!("🔍 AVIF 编码能力探测结果：{}", if supported { "支持" } else { "不支持，回退 JPEG" });
            supported
        })
    }

    /// 已执行的探测次数（至多为 1）。
    pub fn probe_count(&self) -> usize {
        self.probes_run.load(Ordering::SeqCst)
    }

    /// 按“首选 AVIF → 回退 JPEG”编码。
    pub(crate) fn encode(
        &self,
        image: &DynamicImage,
        settings: EncodeSettings,
    ) -> Result<EncodedImage, ProcessingError> {
        if self.supports_avif() {
            match encode_avif(image, settings.preferred_quality, settings.avif_speed) {
                Ok(bytes) => {
                    return Ok(EncodedImage {
                        bytes,
                        format: OutputFormat::Avif,
                    });
                }
                Err(err) => {
                    log::warn!("⚠️ AVIF 编码失败，回退 JPEG：{}", err);
                }
            }
        }

        let bytes = encode_jpeg(image, settings.fallback_quality).map_err(|err| {
            ProcessingError::Encode(format!("当前环境没有可用的图片编码器：{}", err))
        })?;

        Ok(EncodedImage {
            bytes,
            format: OutputFormat::Jpeg,
        })
    }
}

/// 把编码结果包装为 Data URL。
pub(crate) fn to_data_url(encoded: &EncodedImage) -> String {
    format!(
        "data:{};base64,{}",
        encoded.format.mime_type(),
        general_purpose::STANDARD.encode(&encoded.bytes)
    )
}

fn encode_avif(image: &DynamicImage, quality: u8, speed: u8) -> Result<Vec<u8>, String> {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut cursor = Cursor::new(Vec::new());

    AvifEncoder::new_with_speed_quality(&mut cursor, speed, quality)
        .write_image(rgba.as_raw(), width, height, ExtendedColorType::Rgba8)
        .map_err(|e| e.to_string())?;

    let bytes = cursor.into_inner();
    if bytes.is_empty() {
        return Err("AVIF 编码器未产出数据".to_string());
    }
    Ok(bytes)
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, String> {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    let mut cursor = Cursor::new(Vec::new());

    JpegEncoder::new_with_quality(&mut cursor, quality)
        .encode(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
        .map_err(|e| e.to_string())?;

    let bytes = cursor.into_inner();
    if bytes.is_empty() {
        return Err("JPEG 编码器未产出数据".to_string());
    }
    Ok(bytes)
}

/// 默认探测：尝试编码一张 2x2 的 AVIF。
fn probe_avif_encoder() -> bool {
    let probe = DynamicImage::new_rgba8(2, 2);
    encode_avif(&probe, 50, 10).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> EncodeSettings {
        EncodeSettings {
            preferred_quality: 50,
            fallback_quality: 78,
            avif_speed: 10,
        }
    }

    #[test]
    fn probe_runs_at_most_once() {
        let support = FormatSupport::with_probe(|| false);
        assert_eq!(support.probe_count(), 0);

        for _ in 0..5 {
            assert!(!support.supports_avif());
        }
        assert_eq!(support.probe_count(), 1);
    }

    #[test]
    fn falls_back_to_jpeg_when_avif_unsupported() {
        let support = FormatSupport::with_probe(|| false);
        let encoded = support
            .encode(&DynamicImage::new_rgb8(16, 9), settings())
            .expect("jpeg fallback should encode");

        assert_eq!(encoded.format, OutputFormat::Jpeg);
        assert_eq!(&encoded.bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn encodes_avif_when_supported() {
        let support = FormatSupport::with_probe(|| true);
        let encoded = support
            .encode(&DynamicImage::new_rgb8(16, 16), settings())
            .expect("avif should encode");

        assert_eq!(encoded.format, OutputFormat::Avif);
        assert_eq!(
            infer::get(&encoded.bytes).map(|kind| kind.mime_type()),
            Some("image/avif")
        );
    }

    #[test]
    fn data_url_has_mime_prefix() {
        let encoded = EncodedImage {
            bytes: vec![1, 2, 3],
            format: OutputFormat::Jpeg,
        };
        assert_eq!(to_data_url(&encoded), "data:image/jpeg;base64,AQID");
    }

    #[test]
    fn mime_lookup_roundtrips_known_formats() {
        for format in [OutputFormat::Avif, OutputFormat::Jpeg] {
            assert_eq!(OutputFormat::from_mime_type(format.mime_type()), Some(format));
        }
        assert_eq!(OutputFormat::from_mime_type("image/png"), None);
    }
}
