//! Before-to-after treatment previews.
//!
//! A [`TreatmentPreview`] owns one provider for its whole lifetime and turns
//! a [`BeforeImage`] plus a [`Selection`] into an [`AfterImage`]:
//!
//! 1. the before image is decoded to RGB and re-encoded as PNG,
//! 2. the selection is synthesized into a prompt,
//! 3. the provider transforms the image at a low, fixed strength,
//! 4. the result is re-encoded as a PNG download.

use crate::error::{Result, TreatVizError};
use crate::image::{
    encode_png, DownloadPayload, GeneratedImage, GenerationRequest, ImageFormat, ImageProvider,
    ImageProviderExt,
};
use crate::treatment::Selection;
use std::path::Path;

/// Transformation strength sent with every preview unless overridden.
///
/// Low enough that the subject stays recognisable.
pub const DEFAULT_STRENGTH: f32 = 0.2;

/// File extensions accepted for before images.
pub const UPLOAD_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// A decoded before image.
#[derive(Debug, Clone)]
pub struct BeforeImage {
    rgb: ::image::RgbImage,
    png: Vec<u8>,
}

impl BeforeImage {
    /// Decodes an uploaded JPEG or PNG into RGB.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        match ImageFormat::from_magic_bytes(data) {
            Some(format) if format.is_upload_format() => {}
            Some(format) => {
                return Err(TreatVizError::InvalidRequest(format!(
                    "unsupported before image format: {}",
                    format.extension()
                )))
            }
            None => {
                return Err(TreatVizError::InvalidRequest(
                    "before image is not a JPEG or PNG".into(),
                ))
            }
        }

        let rgb = ::image::load_from_memory(data)?.to_rgb8();
        Self::from_rgb(rgb)
    }

    /// Wraps an already decoded bitmap.
    pub fn from_rgb(rgb: ::image::RgbImage) -> Result<Self> {
        let png = encode_png(rgb.clone())?;
        Ok(Self { rgb, png })
    }

    /// Reads and decodes a before image from disk.
    ///
    /// Only `.jpg`, `.jpeg` and `.png` files are accepted.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        if !UPLOAD_EXTENSIONS.contains(&ext.as_str()) {
            return Err(TreatVizError::InvalidRequest(format!(
                "unsupported before image file: {} (expected one of {})",
                path.display(),
                UPLOAD_EXTENSIONS.join(", ")
            )));
        }

        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }

    /// Returns the RGB bitmap.
    pub fn rgb(&self) -> &::image::RgbImage {
        &self.rgb
    }

    /// Returns `(width, height)` in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        self.rgb.dimensions()
    }

    /// Returns the bitmap encoded as PNG.
    pub fn png_bytes(&self) -> &[u8] {
        &self.png
    }
}

/// The outcome of one preview.
#[derive(Debug, Clone)]
pub struct AfterImage {
    /// Prompt the provider was given.
    pub prompt: String,
    /// Image as returned by the provider.
    pub image: GeneratedImage,
    /// The same image as a PNG download.
    pub download: DownloadPayload,
}

/// Builder for [`TreatmentPreview`].
pub struct TreatmentPreviewBuilder<P> {
    provider: P,
    strength: f32,
    seed: Option<u64>,
    max_retries: u32,
    safety_checker: bool,
}

impl<P: ImageProvider> TreatmentPreviewBuilder<P> {
    /// Sets the transformation strength (0.0 to 1.0).
    pub fn strength(mut self, strength: f32) -> Self {
        self.strength = strength;
        self
    }

    /// Fixes the seed so repeated previews are reproducible.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets how many times transient provider failures are retried.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Turns the provider's safety checker back on.
    pub fn safety_checker(mut self, enabled: bool) -> Self {
        self.safety_checker = enabled;
        self
    }

    /// Builds the preview.
    pub fn build(self) -> Result<TreatmentPreview<P>> {
        if !(0.0..=1.0).contains(&self.strength) {
            return Err(TreatVizError::InvalidRequest(format!(
                "strength must be within 0.0..=1.0, got {}",
                self.strength
            )));
        }

        Ok(self.assemble())
    }

    fn assemble(self) -> TreatmentPreview<P> {
        TreatmentPreview {
            provider: self.provider,
            strength: self.strength,
            seed: self.seed,
            max_retries: self.max_retries,
            safety_checker: self.safety_checker,
        }
    }
}

/// Generates after images for treatment selections.
pub struct TreatmentPreview<P> {
    provider: P,
    strength: f32,
    seed: Option<u64>,
    max_retries: u32,
    safety_checker: bool,
}

impl<P: ImageProvider> TreatmentPreview<P> {
    /// Creates a builder around `provider`.
    pub fn builder(provider: P) -> TreatmentPreviewBuilder<P> {
        TreatmentPreviewBuilder {
            provider,
            strength: DEFAULT_STRENGTH,
            seed: None,
            max_retries: 0,
            safety_checker: false,
        }
    }

    /// Creates a preview with the builder's default settings.
    pub fn new(provider: P) -> Self {
        Self::builder(provider).assemble()
    }

    /// Returns the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Returns the configured transformation strength.
    pub fn strength(&self) -> f32 {
        self.strength
    }

    /// Builds the provider request for a selection.
    ///
    /// Fails with `InvalidRequest` when no selected treatment is in the
    /// catalog, since the provider would receive an empty prompt.
    pub fn request_for(&self, before: &BeforeImage, selection: &Selection) -> Result<GenerationRequest> {
        for unknown in selection.unknown_treatments() {
            tracing::warn!(treatment = %unknown, "skipping unknown treatment");
        }

        let prompt = selection.prompt();
        if prompt.is_empty() {
            return Err(TreatVizError::InvalidRequest(
                "no known treatments selected".into(),
            ));
        }

        let mut request = GenerationRequest::new(prompt)
            .with_strength(self.strength)
            .with_safety_checker(self.safety_checker)
            .with_input_image(before.png_bytes().to_vec());
        if let Some(seed) = self.seed {
            request = request.with_seed(seed);
        }
        request.validate()?;
        Ok(request)
    }

    /// Generates the after image for `selection`.
    pub async fn render(&self, before: &BeforeImage, selection: &Selection) -> Result<AfterImage> {
        let request = self.request_for(before, selection)?;
        let (width, height) = before.dimensions();
        tracing::info!(
            provider = %self.provider.kind(),
            model = %self.provider.model(),
            treatments = selection.len(),
            width,
            height,
            strength = self.strength,
            "rendering treatment preview"
        );

        let image = self
            .provider
            .generate_with_retries(&request, self.max_retries)
            .await?;
        if image.metadata.safety_filtered {
            tracing::warn!("provider flagged the generated image");
        }

        let download = image.download().inspect_err(|e| {
            tracing::error!(
                format = image.format.extension(),
                bytes = image.data.len(),
                "generated image could not be converted to PNG: {e}"
            );
        })?;
        Ok(AfterImage {
            prompt: request.prompt,
            image,
            download,
        })
    }
}
