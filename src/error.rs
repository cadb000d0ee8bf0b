//! Error types for treatment previews.

use std::time::Duration;

/// Longest provider error message kept, in characters.
const MAX_ERROR_MESSAGE_CHARS: usize = 500;

/// Errors that can occur while generating a treatment preview.
#[derive(Debug, thiserror::Error)]
pub enum TreatVizError {
    /// API key missing or invalid.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Sanitized response body.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Delay suggested by the provider, if any.
        retry_after: Option<Duration>,
    },

    /// Provider polling exceeded its deadline.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// Download URL expired before download.
    #[error("download URL expired")]
    UrlExpired,

    /// Content was blocked by the provider's moderation.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// Invalid request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Provider answered with something we could not interpret.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to decode returned data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// Image decoding or encoding failed.
    #[error("image error: {0}")]
    Image(#[from] ::image::ImageError),

    /// I/O error (e.g., saving file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TreatVizError {
    /// Returns true if this error is likely transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Timeout(_) | Self::Network(_)
        )
    }

    /// Returns the suggested retry delay, if available.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            Self::Timeout(_) => Some(Duration::from_secs(1)),
            Self::Network(_) => Some(Duration::from_secs(2)),
            _ => None,
        }
    }
}

/// Normalizes a provider error body for display.
///
/// Collapses whitespace runs to single spaces and truncates long bodies
/// (HTML error pages, stack traces) on a character boundary.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match collapsed.char_indices().nth(MAX_ERROR_MESSAGE_CHARS) {
        Some((cut, _)) => format!("{}...", &collapsed[..cut]),
        None => collapsed,
    }
}

/// Result type alias for treatment preview operations.
pub type Result<T> = std::result::Result<T, TreatVizError>;
