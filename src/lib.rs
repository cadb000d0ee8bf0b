#![warn(missing_docs)]
//! TreatViz - aesthetic treatment previews.
//!
//! Turns a portrait plus a list of cosmetic treatments, each with an
//! intensity from 1 to 10, into a generated "after" image. The treatments are
//! synthesized into one instruction prompt that conditions an image-to-image
//! model.
//!
//! # Quick Start - Prompts
//!
//! ```
//! use treatviz::{synthesize_prompt, Selection};
//!
//! let prompt = synthesize_prompt([("lip_filler", 3), ("nose_filler", 8)]);
//! assert!(prompt.starts_with("Apply a mild enhancement"));
//!
//! let selection = Selection::new().with("cheek_filler", 5);
//! assert!(selection.prompt().contains("cheek filler"));
//! ```
//!
//! # Quick Start - Previews
//!
//! ```no_run
//! use treatviz::{BeforeImage, FalImageProvider, Selection, TreatmentPreview};
//!
//! #[tokio::main]
//! async fn main() -> treatviz::Result<()> {
//!     let provider = FalImageProvider::builder().build()?;
//!     let preview = TreatmentPreview::new(provider);
//!
//!     let before = BeforeImage::open("before.jpg")?;
//!     let selection = Selection::new().with("lip_filler", 4);
//!     let after = preview.render(&before, &selection).await?;
//!     after.download.save_in(".")?;
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `fal-image` (default): fal.ai image-to-image provider
//! - `cli`: the `treatviz` command-line interface

mod error;
pub mod image;
pub mod preview;
pub mod treatment;

// Re-export error types at crate root
pub use error::{Result, TreatVizError};

pub use crate::image::{
    DownloadPayload, GeneratedImage, GenerationMetadata, GenerationRequest, ImageFormat,
    ImageProvider, ImageProviderExt, ImageProviderKind,
};

#[cfg(feature = "fal-image")]
pub use crate::image::providers::{FalImageModel, FalImageProvider, FalImageProviderBuilder};

pub use preview::{AfterImage, BeforeImage, TreatmentPreview, TreatmentPreviewBuilder};

pub use treatment::{
    intensity_description, synthesize_prompt, treatment_fragment, Selection, SelectionEntry,
    Treatment,
};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{Result, TreatVizError};
    pub use crate::image::{GeneratedImage, GenerationRequest, ImageProvider, ImageProviderExt};
    pub use crate::preview::{AfterImage, BeforeImage, TreatmentPreview};
    pub use crate::treatment::{synthesize_prompt, Selection, Treatment};

    #[cfg(feature = "fal-image")]
    pub use crate::image::providers::FalImageProvider;
}
