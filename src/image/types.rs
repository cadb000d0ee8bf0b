//! Core types for image-to-image generation.

use crate::error::{Result, TreatVizError};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::Path;

/// File name offered for the downloadable after image.
pub const DOWNLOAD_FILE_NAME: &str = "after_treatment.png";

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format (lossless).
    #[default]
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format (modern, efficient).
    WebP,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }

    /// Attempts to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 12 {
            return None;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        None
    }

    /// Returns true for formats accepted as a before image.
    pub fn is_upload_format(&self) -> bool {
        matches!(self, Self::Png | Self::Jpeg)
    }
}

/// Image provider kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageProviderKind {
    /// fal.ai hosted image-to-image models.
    Fal,
}

impl std::fmt::Display for ImageProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fal => write!(f, "fal"),
        }
    }
}

/// Metadata about the generation process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationMetadata {
    /// Model used for generation.
    pub model: Option<String>,
    /// Seed used (if deterministic).
    pub seed: Option<u64>,
    /// Generation duration in milliseconds.
    pub duration_ms: Option<u64>,
    /// Whether the provider reported a safety filter hit.
    pub safety_filtered: bool,
}

/// A request to transform an input image according to a prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The instruction prompt.
    pub prompt: String,
    /// How far the output may drift from the input, 0.0 to 1.0.
    pub strength: Option<f32>,
    /// Seed for deterministic generation.
    pub seed: Option<u64>,
    /// Whether the provider should run its own safety checker.
    pub enable_safety_checker: bool,
    /// Input image (raw encoded bytes).
    #[serde(skip)]
    pub input_image: Option<Vec<u8>>,
}

impl GenerationRequest {
    /// Creates a new request with the given prompt.
    ///
    /// The provider's safety checker starts disabled.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            strength: None,
            seed: None,
            enable_safety_checker: false,
            input_image: None,
        }
    }

    /// Sets the transformation strength.
    pub fn with_strength(mut self, strength: f32) -> Self {
        self.strength = Some(strength);
        self
    }

    /// Sets the seed for deterministic generation.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Turns the provider's safety checker on or off.
    pub fn with_safety_checker(mut self, enabled: bool) -> Self {
        self.enable_safety_checker = enabled;
        self
    }

    /// Sets the input image to transform.
    pub fn with_input_image(mut self, image: Vec<u8>) -> Self {
        self.input_image = Some(image);
        self
    }

    /// Checks parameters before anything is sent.
    pub fn validate(&self) -> Result<()> {
        if let Some(strength) = self.strength {
            if !(0.0..=1.0).contains(&strength) {
                return Err(TreatVizError::InvalidRequest(format!(
                    "strength must be within 0.0..=1.0, got {strength}"
                )));
            }
        }
        if self.input_image.as_ref().is_some_and(|img| img.is_empty()) {
            return Err(TreatVizError::InvalidRequest("input image is empty".into()));
        }
        Ok(())
    }
}

/// A generated image with its data and metadata.
#[derive(Debug, Clone)]
#[must_use = "generated image should be saved or processed"]
pub struct GeneratedImage {
    /// Raw image bytes.
    pub data: Vec<u8>,
    /// Image format.
    pub format: ImageFormat,
    /// Provider that generated this image.
    pub provider: ImageProviderKind,
    /// Generation metadata.
    pub metadata: GenerationMetadata,
}

impl GeneratedImage {
    /// Creates a new generated image.
    pub fn new(
        data: Vec<u8>,
        format: ImageFormat,
        provider: ImageProviderKind,
        metadata: GenerationMetadata,
    ) -> Self {
        Self {
            data,
            format,
            provider,
            metadata,
        }
    }

    /// Decodes the image into an RGB bitmap.
    pub fn to_rgb(&self) -> Result<::image::RgbImage> {
        Ok(::image::load_from_memory(&self.data)?.to_rgb8())
    }

    /// Re-encodes the image as PNG.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        encode_png(self.to_rgb()?)
    }

    /// Builds the downloadable PNG payload.
    pub fn download(&self) -> Result<DownloadPayload> {
        Ok(DownloadPayload {
            file_name: DOWNLOAD_FILE_NAME.to_string(),
            mime_type: ImageFormat::Png.mime_type().to_string(),
            data: self.to_png()?,
        })
    }
}

/// A binary payload offered to the user as a file download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadPayload {
    /// Suggested file name.
    pub file_name: String,
    /// MIME type of `data`.
    pub mime_type: String,
    /// Encoded file contents.
    pub data: Vec<u8>,
}

impl DownloadPayload {
    /// Writes the payload into `dir` under its suggested file name.
    pub fn save_in(&self, dir: impl AsRef<Path>) -> Result<std::path::PathBuf> {
        let path = dir.as_ref().join(&self.file_name);
        std::fs::write(&path, &self.data)?;
        Ok(path)
    }

    /// Writes the payload to an explicit path.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, &self.data)?;
        Ok(())
    }
}

/// Encodes an RGB bitmap as PNG bytes.
pub(crate) fn encode_png(rgb: ::image::RgbImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ::image::DynamicImage::ImageRgb8(rgb)
        .write_to(&mut Cursor::new(&mut buf), ::image::ImageFormat::Png)?;
    Ok(buf)
}

/// Encodes bytes as a `data:` URL with the given format's MIME type.
#[cfg(feature = "fal-image")]
pub(crate) fn to_data_url(data: &[u8], format: ImageFormat) -> String {
    use base64::Engine;
    format!(
        "data:{};base64,{}",
        format.mime_type(),
        base64::engine::general_purpose::STANDARD.encode(data)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 12] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const JPEG_MAGIC: [u8; 12] = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0, 0, 0, 0, 0];
    const WEBP_MAGIC: [u8; 12] = *b"RIFF\x00\x00\x00\x00WEBP";

    fn tiny_png() -> Vec<u8> {
        encode_png(::image::RgbImage::from_pixel(2, 3, ::image::Rgb([200, 150, 120]))).unwrap()
    }

    #[test]
    fn test_format_from_magic_bytes() {
        assert_eq!(
            ImageFormat::from_magic_bytes(&PNG_MAGIC),
            Some(ImageFormat::Png)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&JPEG_MAGIC),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&WEBP_MAGIC),
            Some(ImageFormat::WebP)
        );
        assert_eq!(ImageFormat::from_magic_bytes(b"GIF89a"), None);
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ImageFormat::from_extension("png"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_extension("JPEG"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_extension("webp"), Some(ImageFormat::WebP));
        assert_eq!(ImageFormat::from_extension("gif"), None);
    }

    #[test]
    fn test_upload_formats() {
        assert!(ImageFormat::Png.is_upload_format());
        assert!(ImageFormat::Jpeg.is_upload_format());
        assert!(!ImageFormat::WebP.is_upload_format());
    }

    #[test]
    fn test_request_defaults() {
        let req = GenerationRequest::new("Apply a lip filler");
        assert!(!req.enable_safety_checker);
        assert!(req.strength.is_none());
        assert!(req.input_image.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_request_validation() {
        let req = GenerationRequest::new("x").with_strength(1.5);
        assert!(matches!(req.validate(), Err(TreatVizError::InvalidRequest(_))));

        let req = GenerationRequest::new("x").with_input_image(Vec::new());
        assert!(matches!(req.validate(), Err(TreatVizError::InvalidRequest(_))));

        let req = GenerationRequest::new("x")
            .with_strength(0.2)
            .with_input_image(tiny_png());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_download_is_png() {
        let image = GeneratedImage::new(
            tiny_png(),
            ImageFormat::Png,
            ImageProviderKind::Fal,
            GenerationMetadata::default(),
        );
        let download = image.download().unwrap();

        assert_eq!(download.file_name, "after_treatment.png");
        assert_eq!(download.mime_type, "image/png");
        assert_eq!(
            ImageFormat::from_magic_bytes(&download.data),
            Some(ImageFormat::Png)
        );
        let decoded = ::image::load_from_memory(&download.data).unwrap();
        assert_eq!(decoded.to_rgb8().dimensions(), (2, 3));
    }

    #[test]
    fn test_download_converts_webp_output() {
        let mut webp = Vec::new();
        ::image::DynamicImage::ImageRgb8(::image::RgbImage::from_pixel(
            3,
            2,
            ::image::Rgb([10, 20, 30]),
        ))
        .write_to(&mut Cursor::new(&mut webp), ::image::ImageFormat::WebP)
        .unwrap();
        assert_eq!(ImageFormat::from_magic_bytes(&webp), Some(ImageFormat::WebP));

        let image = GeneratedImage::new(
            webp,
            ImageFormat::WebP,
            ImageProviderKind::Fal,
            GenerationMetadata::default(),
        );
        let download = image.download().unwrap();

        assert_eq!(download.mime_type, "image/png");
        assert_eq!(
            ImageFormat::from_magic_bytes(&download.data),
            Some(ImageFormat::Png)
        );
        let decoded = ::image::load_from_memory(&download.data).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(decoded.get_pixel(2, 1), &::image::Rgb([10, 20, 30]));
    }

    #[test]
    fn test_download_of_undecodable_image_fails() {
        let image = GeneratedImage::new(
            vec![0u8; 16],
            ImageFormat::Png,
            ImageProviderKind::Fal,
            GenerationMetadata::default(),
        );
        assert!(matches!(image.download(), Err(TreatVizError::Image(_))));
    }

    #[cfg(feature = "fal-image")]
    #[test]
    fn test_data_url() {
        let url = to_data_url(&[1, 2, 3], ImageFormat::Jpeg);
        assert_eq!(url, "data:image/jpeg;base64,AQID");
    }

    #[test]
    fn test_provider_kind_display() {
        assert_eq!(ImageProviderKind::Fal.to_string(), "fal");
    }
}
