//! fal.ai image-to-image provider.

use crate::error::{sanitize_error_message, Result, TreatVizError};
use crate::image::provider::ImageProvider;
use crate::image::to_data_url;
use crate::image::types::{
    GeneratedImage, GenerationMetadata, GenerationRequest, ImageFormat, ImageProviderKind,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const QUEUE_URL: &str = "https://queue.fal.run";

/// fal.ai image-to-image model variants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FalImageModel {
    /// Fast SDXL image-to-image (default).
    #[default]
    FastSdxl,
    /// Lightning SDXL image-to-image, fewer steps.
    FastLightningSdxl,
    /// Flux dev image-to-image.
    FluxDev,
    /// Custom fal.ai model by ID (e.g., "fal-ai/some-model/image-to-image").
    Custom(String),
}

impl FalImageModel {
    /// Returns the fal.ai model identifier string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::FastSdxl => "fal-ai/fast-sdxl/image-to-image",
            Self::FastLightningSdxl => "fal-ai/fast-lightning-sdxl/image-to-image",
            Self::FluxDev => "fal-ai/flux/dev/image-to-image",
            Self::Custom(id) => id,
        }
    }

    /// Parses a short name (`fast-sdxl`, `lightning`, `flux-dev`) or a full model ID.
    pub fn parse(name: &str) -> Self {
        match name {
            "fast-sdxl" | "sdxl" => Self::FastSdxl,
            "lightning" | "fast-lightning-sdxl" => Self::FastLightningSdxl,
            "flux-dev" | "flux" => Self::FluxDev,
            other => [Self::FastSdxl, Self::FastLightningSdxl, Self::FluxDev]
                .into_iter()
                .find(|m| m.as_str() == other)
                .unwrap_or_else(|| Self::Custom(other.to_string())),
        }
    }
}

/// Builder for [`FalImageProvider`].
#[derive(Debug, Clone)]
pub struct FalImageProviderBuilder {
    api_key: Option<String>,
    model: FalImageModel,
    poll_interval: Duration,
    timeout: Duration,
    request_timeout: Duration,
}

impl Default for FalImageProviderBuilder {
    fn default() -> Self {
        Self {
            api_key: None,
            model: FalImageModel::default(),
            poll_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(300),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl FalImageProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `FAL_KEY` env var.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the fal.ai model variant.
    pub fn model(mut self, model: FalImageModel) -> Self {
        self.model = model;
        self
    }

    /// Sets the polling interval for queued generation.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the maximum time to wait for generation.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the per-request HTTP timeout (submit, poll, fetch and download).
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Builds the provider, resolving credentials.
    pub fn build(self) -> Result<FalImageProvider> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("FAL_KEY").ok())
            .ok_or_else(|| TreatVizError::Auth("FAL_KEY not set and no API key provided".into()))?;

        let client = reqwest::Client::builder()
            .timeout(self.request_timeout)
            .build()?;

        Ok(FalImageProvider {
            client,
            api_key,
            model: self.model,
            poll_interval: self.poll_interval,
            timeout: self.timeout,
            request_timeout: self.request_timeout,
        })
    }
}

/// fal.ai image-to-image provider.
///
/// Submits to the fal.ai queue API, polls until the job completes, then
/// downloads the first output image.
pub struct FalImageProvider {
    client: reqwest::Client,
    api_key: String,
    model: FalImageModel,
    poll_interval: Duration,
    timeout: Duration,
    request_timeout: Duration,
}

impl FalImageProvider {
    /// Creates a new [`FalImageProviderBuilder`].
    pub fn builder() -> FalImageProviderBuilder {
        FalImageProviderBuilder::new()
    }

    fn auth_header(&self) -> String {
        format!("Key {}", self.api_key)
    }

    fn parse_error(&self, status: u16, text: &str) -> TreatVizError {
        let message = match serde_json::from_str::<FalErrorResponse>(text) {
            Ok(FalErrorResponse {
                detail: serde_json::Value::String(detail),
            }) => sanitize_error_message(&detail),
            Ok(error_resp) => sanitize_error_message(&error_resp.detail.to_string()),
            Err(_) => sanitize_error_message(text),
        };

        match status {
            401 | 403 => TreatVizError::Auth(message),
            429 => TreatVizError::RateLimited { retry_after: None },
            _ => TreatVizError::Api { status, message },
        }
    }

    /// Submits an image-to-image job to the fal.ai queue.
    ///
    /// Returns the queue's own status and response URLs, which differ from
    /// the submit path for models with nested IDs.
    async fn submit(&self, request: &GenerationRequest) -> Result<FalSubmitResponse> {
        let url = format!("{}/{}", QUEUE_URL, self.model.as_str());
        let body = FalImageToImageRequest::from_request(request)?;

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(self.parse_error(status.as_u16(), &text));
        }

        Ok(response.json().await?)
    }

    /// Polls the queue until the job completes.
    async fn poll_until_ready(&self, request_id: &str, status_url: &str) -> Result<()> {
        let start = Instant::now();

        loop {
            if start.elapsed() > self.timeout {
                return Err(TreatVizError::Timeout(self.timeout));
            }

            let response = self
                .client
                .get(status_url)
                .header("Authorization", self.auth_header())
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(self.parse_error(status.as_u16(), &text));
            }

            let poll_response: FalStatusResponse = response.json().await?;

            match poll_response.status.as_str() {
                "COMPLETED" => return Ok(()),
                "IN_QUEUE" | "IN_PROGRESS" => {
                    tracing::debug!(
                        request_id = %request_id,
                        status = %poll_response.status,
                        elapsed_secs = start.elapsed().as_secs(),
                        "polling fal.ai image-to-image job"
                    );
                    tokio::time::sleep(self.poll_interval).await;
                }
                "FAILED" => {
                    return Err(TreatVizError::UnexpectedResponse(
                        "fal.ai generation failed".into(),
                    ));
                }
                other => {
                    return Err(TreatVizError::UnexpectedResponse(format!(
                        "fal.ai returned unexpected status: {other}"
                    )));
                }
            }
        }
    }

    async fn fetch_result(&self, response_url: &str) -> Result<FalResultResponse> {
        let response = self
            .client
            .get(response_url)
            .header("Authorization", self.auth_header())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(self.parse_error(status.as_u16(), &text));
        }

        Ok(response.json().await?)
    }

    /// Fetches output bytes, either inline (`data:` URL) or over HTTP.
    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        if url.starts_with("data:") {
            return decode_data_url(url);
        }

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            if response.status().as_u16() == 403 || response.status().as_u16() == 410 {
                return Err(TreatVizError::UrlExpired);
            }
            return Err(TreatVizError::Api {
                status: response.status().as_u16(),
                message: "Failed to download image".into(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl ImageProvider for FalImageProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        request.validate()?;
        let start = Instant::now();

        let submit = self.submit(request).await?;
        tracing::debug!(
            request_id = %submit.request_id,
            model = %self.model.as_str(),
            "submitted fal.ai image-to-image job"
        );

        self.poll_until_ready(&submit.request_id, &submit.status_url)
            .await?;

        let result = self.fetch_result(&submit.response_url).await?;
        let safety_filtered =
            screen_nsfw_flags(request.enable_safety_checker, &result.has_nsfw_concepts)?;

        let image_info = result.images.into_iter().next().ok_or_else(|| {
            TreatVizError::UnexpectedResponse("fal.ai returned no images".into())
        })?;

        let data = self.download(&image_info.url).await?;
        let duration_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            request_id = %submit.request_id,
            duration_ms,
            bytes = data.len(),
            "fal.ai image-to-image job complete"
        );

        let format = ImageFormat::from_magic_bytes(&data)
            .or_else(|| {
                image_info
                    .content_type
                    .as_deref()
                    .and_then(|ct| ct.strip_prefix("image/"))
                    .and_then(ImageFormat::from_extension)
            })
            .unwrap_or(ImageFormat::Png);

        Ok(GeneratedImage::new(
            data,
            format,
            ImageProviderKind::Fal,
            GenerationMetadata {
                model: Some(self.model.as_str().to_string()),
                seed: result.seed,
                duration_ms: Some(duration_ms),
                safety_filtered,
            },
        ))
    }

    fn kind(&self) -> ImageProviderKind {
        ImageProviderKind::Fal
    }

    fn model(&self) -> &str {
        self.model.as_str()
    }

    async fn health_check(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(TreatVizError::Auth("FAL_KEY is empty".into()));
        }
        if self.request_timeout.is_zero() {
            return Err(TreatVizError::InvalidRequest(
                "request timeout must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Interprets fal.ai's per-image NSFW flags.
///
/// With the safety checker on, a flagged output is refused. With it off the
/// flag is only recorded in the metadata.
fn screen_nsfw_flags(safety_checker: bool, flags: &[bool]) -> Result<bool> {
    let flagged = flags.iter().any(|&flag| flag);
    if flagged && safety_checker {
        tracing::warn!("fal.ai flagged the generated image as NSFW");
        return Err(TreatVizError::ContentBlocked(
            "fal.ai safety checker flagged the output".into(),
        ));
    }
    Ok(flagged)
}

/// Decodes a `data:<mime>;base64,<payload>` URL.
///
/// Tolerates embedded whitespace and missing padding.
fn decode_data_url(url: &str) -> Result<Vec<u8>> {
    use base64::Engine;

    let payload = url
        .find(";base64,")
        .map(|pos| &url[pos + 8..])
        .ok_or_else(|| TreatVizError::Decode("data URL is not base64 encoded".into()))?;
    let cleaned: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    base64::engine::general_purpose::STANDARD
        .decode(&cleaned)
        .or_else(|_| base64::engine::general_purpose::STANDARD_NO_PAD.decode(&cleaned))
        .map_err(|e| TreatVizError::Decode(e.to_string()))
}

// -- Request types --

#[derive(Debug, Serialize)]
struct FalImageToImageRequest {
    prompt: String,
    image_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    strength: Option<f32>,
    num_images: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    enable_safety_checker: bool,
}

impl FalImageToImageRequest {
    fn from_request(req: &GenerationRequest) -> Result<Self> {
        let input = req.input_image.as_ref().ok_or_else(|| {
            TreatVizError::InvalidRequest("image-to-image requires an input image".into())
        })?;
        let format = ImageFormat::from_magic_bytes(input).unwrap_or(ImageFormat::Png);

        Ok(Self {
            prompt: req.prompt.clone(),
            image_url: to_data_url(input, format),
            strength: req.strength,
            num_images: 1,
            seed: req.seed,
            enable_safety_checker: req.enable_safety_checker,
        })
    }
}

// -- Response types --

#[derive(Debug, Deserialize)]
struct FalSubmitResponse {
    request_id: String,
    status_url: String,
    response_url: String,
}

#[derive(Debug, Deserialize)]
struct FalStatusResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
struct FalResultResponse {
    images: Vec<FalImageInfo>,
    #[serde(default)]
    seed: Option<u64>,
    #[serde(default)]
    has_nsfw_concepts: Vec<bool>,
}

#[derive(Debug, Deserialize)]
struct FalImageInfo {
    url: String,
    #[serde(default)]
    content_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FalErrorResponse {
    /// A plain string or a list of validation errors, depending on the failure.
    detail: serde_json::Value,
}
