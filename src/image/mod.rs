//! Image-to-image generation module.

mod provider;
pub mod providers;
mod types;

pub use provider::{ImageProvider, ImageProviderExt};
pub(crate) use types::encode_png;
#[cfg(feature = "fal-image")]
pub(crate) use types::to_data_url;
pub use types::{
    DownloadPayload, GeneratedImage, GenerationMetadata, GenerationRequest, ImageFormat,
    ImageProviderKind, DOWNLOAD_FILE_NAME,
};
