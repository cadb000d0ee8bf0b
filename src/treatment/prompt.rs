//! Prompt synthesis: turns an ordered selection into one instruction string.

use crate::treatment::catalog::Treatment;
use serde::{Deserialize, Serialize};

/// Renders the fragment for one selected treatment.
///
/// Returns `None` when `treatment_id` is not in the catalog. Out-of-range
/// intensities fall back to the default phrase.
pub fn treatment_fragment(treatment_id: &str, intensity: i64) -> Option<String> {
    Treatment::from_id(treatment_id).map(|treatment| treatment.fragment(intensity))
}

/// Joins the fragments of every recognized pair with single spaces, keeping
/// input order. Unrecognized identifiers are skipped; an empty selection
/// yields an empty string.
pub fn synthesize_prompt<I, S>(selection: I) -> String
where
    I: IntoIterator<Item = (S, i64)>,
    S: AsRef<str>,
{
    selection
        .into_iter()
        .filter_map(|(id, intensity)| treatment_fragment(id.as_ref(), intensity))
        .collect::<Vec<_>>()
        .join(" ")
}

/// One selected treatment and its intensity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionEntry {
    /// Treatment identifier, not necessarily in the catalog.
    pub treatment: String,
    /// Requested intensity, nominally 1..=10.
    pub intensity: i64,
}

impl SelectionEntry {
    /// Creates an entry.
    pub fn new(treatment: impl Into<String>, intensity: i64) -> Self {
        Self {
            treatment: treatment.into(),
            intensity,
        }
    }

    /// Returns the catalog treatment, if the identifier is known.
    pub fn known_treatment(&self) -> Option<Treatment> {
        Treatment::from_id(&self.treatment)
    }

    /// Renders this entry's fragment, if the identifier is known.
    pub fn fragment(&self) -> Option<String> {
        treatment_fragment(&self.treatment, self.intensity)
    }
}

/// An ordered set of treatment choices for a single generation.
///
/// Duplicates are kept and each entry carries its own intensity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selection {
    entries: Vec<SelectionEntry>,
}

impl Selection {
    /// Creates an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a treatment at the given intensity.
    pub fn with(mut self, treatment: impl Into<String>, intensity: i64) -> Self {
        self.push(treatment, intensity);
        self
    }

    /// Appends a treatment at the given intensity.
    pub fn push(&mut self, treatment: impl Into<String>, intensity: i64) {
        self.entries.push(SelectionEntry::new(treatment, intensity));
    }

    /// Pairs treatments with intensities positionally.
    ///
    /// Pairing stops at the end of the shorter list.
    pub fn from_parallel<I, S, J>(treatments: I, intensities: J) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        J: IntoIterator<Item = i64>,
    {
        treatments
            .into_iter()
            .zip(intensities)
            .map(|(treatment, intensity)| SelectionEntry::new(treatment, intensity))
            .collect()
    }

    /// Returns the entries in selection order.
    pub fn entries(&self) -> &[SelectionEntry] {
        &self.entries
    }

    /// Returns the number of entries, recognized or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing was selected.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the identifiers that are not in the catalog, in order.
    pub fn unknown_treatments(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.known_treatment().is_none())
            .map(|e| e.treatment.as_str())
            .collect()
    }

    /// Synthesizes the combined prompt for this selection.
    pub fn prompt(&self) -> String {
        synthesize_prompt(
            self.entries
                .iter()
                .map(|e| (e.treatment.as_str(), e.intensity)),
        )
    }
}

impl FromIterator<SelectionEntry> for Selection {
    fn from_iter<T: IntoIterator<Item = SelectionEntry>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<(Treatment, i64)>> for Selection {
    fn from(pairs: Vec<(Treatment, i64)>) -> Self {
        pairs
            .into_iter()
            .map(|(treatment, intensity)| SelectionEntry::new(treatment.id(), intensity))
            .collect()
    }
}
