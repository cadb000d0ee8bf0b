//! End-to-end preview flow against an in-process provider.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use treatviz::prelude::*;
use treatviz::{GenerationMetadata, ImageFormat, ImageProviderKind, TreatVizError};

/// Returns a fixed PNG, records every request, and can fail a set number of
/// times with a retryable error first.
struct RecordingProvider {
    output: Vec<u8>,
    requests: Mutex<Vec<GenerationRequest>>,
    transient_failures: AtomicU32,
}

impl RecordingProvider {
    fn new() -> Self {
        Self::failing(0)
    }

    fn failing(times: u32) -> Self {
        Self {
            output: png(8, 6, [90, 60, 40]),
            requests: Mutex::new(Vec::new()),
            transient_failures: AtomicU32::new(times),
        }
    }

    fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageProvider for RecordingProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        self.requests.lock().unwrap().push(request.clone());

        if self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(TreatVizError::RateLimited {
                retry_after: Some(Duration::from_millis(1)),
            });
        }

        Ok(GeneratedImage::new(
            self.output.clone(),
            ImageFormat::Png,
            ImageProviderKind::Fal,
            GenerationMetadata {
                model: Some("recording".into()),
                seed: request.seed,
                duration_ms: Some(1),
                safety_filtered: false,
            },
        ))
    }

    fn kind(&self) -> ImageProviderKind {
        ImageProviderKind::Fal
    }

    fn model(&self) -> &str {
        "recording"
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

fn png(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(width, height, image::Rgb(rgb)))
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(width, height, image::Rgb([200, 160, 140])))
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Jpeg)
        .unwrap();
    buf
}

#[tokio::test]
async fn test_render_sends_prompt_image_and_strength() {
    let preview = TreatmentPreview::new(RecordingProvider::new());
    let before = BeforeImage::from_bytes(&jpeg(16, 12)).unwrap();
    let selection = Selection::new().with("lip_filler", 3).with("nose_filler", 8);

    let after = preview.render(&before, &selection).await.unwrap();

    let expected_prompt = synthesize_prompt([("lip_filler", 3), ("nose_filler", 8)]);
    assert_eq!(after.prompt, expected_prompt);

    let requests = preview.provider().requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].prompt, expected_prompt);
    assert_eq!(requests[0].strength, Some(0.2));
    assert!(!requests[0].enable_safety_checker);

    let sent = image::load_from_memory(requests[0].input_image.as_deref().unwrap()).unwrap();
    assert_eq!(sent.to_rgb8().dimensions(), (16, 12));
}

#[tokio::test]
async fn test_render_produces_png_download() {
    let preview = TreatmentPreview::new(RecordingProvider::new());
    let before = BeforeImage::from_bytes(&png(4, 4, [255, 255, 255])).unwrap();

    let after = preview
        .render(&before, &Selection::new().with("cheek_filler", 5))
        .await
        .unwrap();

    assert_eq!(after.download.file_name, "after_treatment.png");
    assert_eq!(after.download.mime_type, "image/png");
    let decoded = image::load_from_memory(&after.download.data).unwrap().to_rgb8();
    assert_eq!(decoded.dimensions(), (8, 6));
    assert_eq!(decoded.get_pixel(0, 0), &image::Rgb([90, 60, 40]));
}

#[tokio::test]
async fn test_unknown_treatments_are_dropped_from_prompt() {
    let preview = TreatmentPreview::new(RecordingProvider::new());
    let before = BeforeImage::from_bytes(&png(2, 2, [0, 0, 0])).unwrap();
    let selection = Selection::new()
        .with("brow_lift", 4)
        .with("temple_filler", 11);

    let after = preview.render(&before, &selection).await.unwrap();
    assert_eq!(after.prompt, Treatment::TempleFiller.fragment(11));
    assert!(after
        .prompt
        .contains("subtle, natural enhancement, soft and understated"));
}

#[tokio::test]
async fn test_empty_selection_never_reaches_provider() {
    let preview = TreatmentPreview::new(RecordingProvider::new());
    let before = BeforeImage::from_bytes(&png(2, 2, [0, 0, 0])).unwrap();

    let err = preview.render(&before, &Selection::new()).await.unwrap_err();
    assert!(matches!(err, TreatVizError::InvalidRequest(_)));
    assert!(preview.provider().requests().is_empty());
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let preview = TreatmentPreview::builder(RecordingProvider::failing(2))
        .max_retries(2)
        .seed(7)
        .build()
        .unwrap();
    let before = BeforeImage::from_bytes(&png(2, 2, [0, 0, 0])).unwrap();

    let after = preview
        .render(&before, &Selection::new().with("facial_botox", 6))
        .await
        .unwrap();

    assert_eq!(preview.provider().requests().len(), 3);
    assert_eq!(after.image.metadata.seed, Some(7));
}

#[tokio::test]
async fn test_retries_exhausted_returns_error() {
    let preview = TreatmentPreview::builder(RecordingProvider::failing(5))
        .max_retries(1)
        .build()
        .unwrap();
    let before = BeforeImage::from_bytes(&png(2, 2, [0, 0, 0])).unwrap();

    let err = preview
        .render(&before, &Selection::new().with("facial_botox", 6))
        .await
        .unwrap_err();

    assert!(matches!(err, TreatVizError::RateLimited { .. }));
    assert_eq!(preview.provider().requests().len(), 2);
}
