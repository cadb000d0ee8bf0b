//! Intensity tiers: how strongly a treatment's effect is worded in the prompt.

/// Lowest intensity with a dedicated tier.
pub const MIN_INTENSITY: i64 = 1;

/// Highest intensity with a dedicated tier.
pub const MAX_INTENSITY: i64 = 10;

/// Intensity offered when the caller has no preference.
pub const DEFAULT_INTENSITY: i64 = 5;

/// Phrase used for any intensity outside `MIN_INTENSITY..=MAX_INTENSITY`.
pub const DEFAULT_INTENSITY_DESCRIPTION: &str = "subtle, natural enhancement, soft and understated";

/// Tier phrases, index 0 holds intensity 1.
const INTENSITY_TIERS: [&str; 10] = [
    "barely noticeable, no change to tone, texture, or lighting",
    "subtle, natural, keep tone, texture, and lighting",
    "mild enhancement, preserve tone, texture, and lighting",
    "visible, natural, maintain tone and texture",
    "balanced, noticeable, no change to tone or texture",
    "clear enhancement, defined, keep realism",
    "strong, defined, tone and texture unchanged",
    "bold, transformative, tone and texture consistent",
    "dramatic, noticeable, tone and texture unchanged",
    "intense, pronounced, tone, posture, lighting unchanged",
];

/// Returns the phrase for `intensity`.
///
/// Total: values outside 1..=10 map to [`DEFAULT_INTENSITY_DESCRIPTION`]
/// instead of failing.
pub fn intensity_description(intensity: i64) -> &'static str {
    if !(MIN_INTENSITY..=MAX_INTENSITY).contains(&intensity) {
        return DEFAULT_INTENSITY_DESCRIPTION;
    }
    INTENSITY_TIERS[(intensity - MIN_INTENSITY) as usize]
}

/// Iterates `(intensity, phrase)` over every defined tier, lowest first.
pub fn intensity_tiers() -> impl Iterator<Item = (i64, &'static str)> {
    (MIN_INTENSITY..=MAX_INTENSITY).zip(INTENSITY_TIERS)
}
