use std::fs::File;
use std::io::Cursor;
use std::sync::Mutex;

use bytes::Bytes;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use wallpaper_vault::processing::{
    FormatSupport, ImageSource, LocalFile, ProcessingConfig, ProcessingError, ProcessingProgress,
    ProcessingStatus, WallpaperProcessor,
};

fn jpeg_processor() -> WallpaperProcessor {
    WallpaperProcessor::with_format_support(
        ProcessingConfig::default(),
        FormatSupport::with_probe(|| false),
    )
    .expect("processor init failed")
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x % 251) as u8, (y % 251) as u8, ((x ^ y) % 251) as u8])
    });
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut cursor, ImageFormat::Png)
        .expect("failed to encode test image");
    cursor.into_inner()
}

fn memory_png(name: &str, width: u32, height: u32) -> ImageSource {
    ImageSource::Memory {
        name: name.to_string(),
        mime_type: "image/png".to_string(),
        bytes: Bytes::from(png_bytes(width, height)),
    }
}

async fn process_collecting(
    processor: &WallpaperProcessor,
    source: ImageSource,
) -> (Result<wallpaper_vault::processing::ProcessedWallpaper, ProcessingError>, Vec<ProcessingProgress>) {
    let seen = Mutex::new(Vec::new());
    let sink = |p: ProcessingProgress| seen.lock().expect("lock poisoned").push(p);
    let result = processor.process(source, &sink).await;
    (result, seen.into_inner().expect("lock poisoned"))
}

#[tokio::test]
async fn wide_image_is_scaled_to_exactly_1920() {
    let processor = jpeg_processor();
    let (result, progress) = process_collecting(&processor, memory_png("wide-shot.png", 2400, 100)).await;
    let processed = result.expect("processing should succeed");

    assert_eq!(processed.width, 1920);
    assert_eq!(processed.height, 80);
    assert_eq!(processed.original_width, 2400);
    assert_eq!(processed.name, "Wide Shot");

    let values: Vec<u8> = progress.iter().map(|p| p.progress).collect();
    assert!(values.windows(2).all(|w| w[0] <= w[1]), "progress must be monotonic: {values:?}");
    assert_eq!(progress.last().map(|p| p.status), Some(ProcessingStatus::Complete));
}

#[tokio::test]
async fn image_between_min_and_target_keeps_its_size() {
    let processor = jpeg_processor();
    let (result, _) = process_collecting(&processor, memory_png("medium.png", 1000, 40)).await;
    let processed = result.expect("processing should succeed");

    assert_eq!((processed.width, processed.height), (1000, 40));
    assert!(processed.width <= processed.original_width);
}

#[tokio::test]
async fn width_of_exactly_800_is_accepted() {
    let processor = jpeg_processor();
    let (result, _) = process_collecting(&processor, memory_png("edge.png", 800, 12)).await;
    let processed = result.expect("800px wide image should be accepted");

    assert_eq!((processed.width, processed.height), (800, 12));
    assert!(!processed.oversized);
}

#[tokio::test]
async fn width_over_8000_is_flagged_but_completes() {
    let processor = jpeg_processor();
    let (result, progress) = process_collecting(&processor, memory_png("panorama.png", 8001, 4)).await;
    let processed = result.expect("oversized image should still complete");

    assert!(processed.oversized);
    assert_eq!(processed.original_width, 8001);
    assert_eq!(processed.width, 1920);
    assert_eq!(progress.last().map(|p| p.status), Some(ProcessingStatus::Complete));
}

#[tokio::test]
async fn width_below_800_fails_validation_before_resize() {
    let processor = jpeg_processor();
    let (result, progress) = process_collecting(&processor, memory_png("small.png", 799, 600)).await;

    let err = result.expect_err("narrow image must be rejected");
    assert!(matches!(err, ProcessingError::Validation(_)));
    assert_eq!(err.code(), "E_VALIDATION");

    let statuses: Vec<ProcessingStatus> = progress.iter().map(|p| p.status).collect();
    assert!(!statuses.contains(&ProcessingStatus::Resizing));
    assert!(!statuses.contains(&ProcessingStatus::Converting));
    assert_eq!(statuses.last(), Some(&ProcessingStatus::Error));
}

#[tokio::test]
async fn file_over_50mb_is_rejected_before_decode() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("huge.png");
    let file = File::create(&path).expect("create file");
    file.set_len(50 * 1024 * 1024 + 1).expect("grow file");
    drop(file);

    let processor = jpeg_processor();
    let source = ImageSource::File(LocalFile::new(&path).with_mime_type("image/png"));
    let (result, progress) = process_collecting(&processor, source).await;

    assert!(matches!(result, Err(ProcessingError::Load(_))));
    let statuses: Vec<ProcessingStatus> = progress.iter().map(|p| p.status).collect();
    assert_eq!(statuses, vec![ProcessingStatus::Loading, ProcessingStatus::Error]);
}

#[tokio::test]
async fn disallowed_declared_type_is_rejected() {
    let processor = jpeg_processor();
    let source = ImageSource::Memory {
        name: "diagram.svg".to_string(),
        mime_type: "image/svg+xml".to_string(),
        bytes: Bytes::from(png_bytes(900, 10)),
    };
    let (result, _) = process_collecting(&processor, source).await;
    assert!(matches!(result, Err(ProcessingError::Load(_))));
}

#[tokio::test]
async fn local_file_with_sniffed_type_is_processed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("coastal_sunrise.png");
    std::fs::write(&path, png_bytes(900, 30)).expect("write png");

    let processor = jpeg_processor();
    let (result, _) = process_collecting(&processor, ImageSource::File(LocalFile::new(&path))).await;
    let processed = result.expect("processing should succeed");

    assert_eq!(processed.name, "Coastal Sunrise");
    assert_eq!(processed.original_name, "coastal_sunrise.png");
    assert_eq!(processed.blob.content_type, "image/jpeg");
    assert!(processed.thumbnail_data_url.starts_with("data:image/jpeg;base64,"));
}

#[tokio::test]
async fn corrupt_bytes_fail_at_load() {
    let processor = jpeg_processor();
    let mut bytes = png_bytes(900, 10);
    bytes.truncate(bytes.len() / 2);
    let source = ImageSource::Memory {
        name: "broken.png".to_string(),
        mime_type: "image/png".to_string(),
        bytes: Bytes::from(bytes),
    };

    let (result, _) = process_collecting(&processor, source).await;
    assert!(matches!(result, Err(ProcessingError::Load(_))));
}
