//! Image-to-image providers.

#[cfg(feature = "fal-image")]
mod fal;

#[cfg(feature = "fal-image")]
pub use fal::{FalImageModel, FalImageProvider, FalImageProviderBuilder};
