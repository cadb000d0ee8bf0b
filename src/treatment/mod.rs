//! Treatment catalog and prompt synthesis.

mod catalog;
mod intensity;
mod prompt;

pub use catalog::{Treatment, DEFAULT_TREATMENT, INTENSITY_PLACEHOLDER};
pub use intensity::{
    intensity_description, intensity_tiers, DEFAULT_INTENSITY, DEFAULT_INTENSITY_DESCRIPTION,
    MAX_INTENSITY, MIN_INTENSITY,
};
pub use prompt::{synthesize_prompt, treatment_fragment, Selection, SelectionEntry};
