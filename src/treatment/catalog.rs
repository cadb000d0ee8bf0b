//! The treatment catalog: nine fixed treatments and their prompt templates.

use crate::error::{Result, TreatVizError};
use crate::treatment::intensity::intensity_description;
use serde::{Deserialize, Serialize};

/// Token each template carries exactly once, replaced by the intensity phrase.
pub const INTENSITY_PLACEHOLDER: &str = "{intensity_description}";

const FULL_FACE_CONTOURING: &str = "Apply a {intensity_description} full-face contouring, enhancing facial structure. Maintain natural skin tone, texture, and lighting. Intensities 1-3, subtle contour, 4-6, balanced enhancement, 7-10, more improved look. No changes to image color or other facial features.";

const LIP_FILLER: &str = "Apply a {intensity_description} lip filler, enhance volume and shape. Maintain natural lip texture and tone. Intensities 1-3, subtle boost, 4-6, noticeable volume, 7-10, fuller lips. No changes to image color, lighting, or other facial features. Image must be giving clean look, don't blurr the surface";

const FACIAL_BOTOX: &str = "Apply a {intensity_description} facial Botox to smooth wrinkles on the forehead and around the eyes. Maintain natural skin texture, tone, and lighting. Intensities 1-3, light smoothing, 4-6, wrinkle reduction, 7-10, dramatic smoothing. No changes to image color or other facial features.";

const CHEEK_FILLER: &str = "Apply a {intensity_description} cheek filler, lift and define cheekbones. Maintain natural skin tone, texture, and lighting. Intensities 1-3, subtle lift, 4-6, defined cheeks, 7-10, sculpted look. No changes to image color or other facial features. image must look like that there are some changes, and cheeks are filled";

const FILLER_UNDER_EYES: &str = "Apply a {intensity_description} under-eye filler to reduce hollows and dark circles. Maintain natural skin texture and tone. Intensities 1-3, slight refresh, 4-6, noticeable smoothing, 7-10, fully rejuvenated. No changes to image color or other facial features.";

const SMILE_LINE_FILLER: &str = "Apply a {intensity_description} smile line filler to reduce nasolabial folds. Maintain natural skin tone and texture. Intensities 1-3, gentle softening, 4-6, balanced reduction, 7-10, significant smoothing. No changes to image color or other facial features.";

const TEMPLE_FILLER: &str = "Apply a {intensity_description} temple filler, restore volume and smooth hollows. Maintain natural skin tone and lighting. Intensities 1-3, subtle fill, 4-6, noticeable volume, 7-10, dramatic restoration. No changes to image color or other facial features.";

const NOSE_FILLER: &str = "Apply a {intensity_description} nose filler to smooth and refine the nasal bridge. Maintain natural proportions and skin tone. Intensities 1-3, minor smoothing, 4-6, visible refinement, 7-10, significant reshaping. No changes to image color or other facial features.";

const FORHEAD_BOTOX: &str = "Apply a {intensity_description} forhead, remove forhead wrinkles, maintain, (clean), skin, overall. Maintain, natural, skin, texture, tone. Intensities 1-3, light softening, 4-6, noticeable, smoothing, 7-10, fully smooth, forehead area.";

/// A cosmetic treatment the generator can be instructed to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Treatment {
    /// Full-face contouring.
    FullFaceContouring,
    /// Lip filler.
    LipFiller,
    /// Botox around the forehead and eyes.
    FacialBotox,
    /// Cheek filler.
    CheekFiller,
    /// Under-eye filler.
    FillerUnderEyes,
    /// Nasolabial fold filler.
    SmileLineFiller,
    /// Temple filler.
    TempleFiller,
    /// Non-surgical nose filler.
    NoseFiller,
    /// Forehead Botox. The identifier keeps its historical spelling.
    ForheadBotox,
}

/// Treatment preselected when nothing else is chosen.
pub const DEFAULT_TREATMENT: Treatment = Treatment::CheekFiller;

impl Treatment {
    /// Every treatment, in menu order.
    pub const ALL: [Treatment; 9] = [
        Self::FullFaceContouring,
        Self::LipFiller,
        Self::FacialBotox,
        Self::CheekFiller,
        Self::FillerUnderEyes,
        Self::SmileLineFiller,
        Self::TempleFiller,
        Self::NoseFiller,
        Self::ForheadBotox,
    ];

    /// Returns the stable identifier (e.g. `"lip_filler"`).
    pub fn id(&self) -> &'static str {
        match self {
            Self::FullFaceContouring => "full_face_contouring",
            Self::LipFiller => "lip_filler",
            Self::FacialBotox => "facial_botox",
            Self::CheekFiller => "cheek_filler",
            Self::FillerUnderEyes => "filler_under_eyes",
            Self::SmileLineFiller => "smile_line_filler",
            Self::TempleFiller => "temple_filler",
            Self::NoseFiller => "nose_filler",
            Self::ForheadBotox => "forhead_botox",
        }
    }

    /// Looks up a treatment by identifier. Unknown identifiers yield `None`.
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.id() == id)
    }

    /// Returns the prompt template, placeholder included.
    pub fn template(&self) -> &'static str {
        match self {
            Self::FullFaceContouring => FULL_FACE_CONTOURING,
            Self::LipFiller => LIP_FILLER,
            Self::FacialBotox => FACIAL_BOTOX,
            Self::CheekFiller => CHEEK_FILLER,
            Self::FillerUnderEyes => FILLER_UNDER_EYES,
            Self::SmileLineFiller => SMILE_LINE_FILLER,
            Self::TempleFiller => TEMPLE_FILLER,
            Self::NoseFiller => NOSE_FILLER,
            Self::ForheadBotox => FORHEAD_BOTOX,
        }
    }

    /// Human-readable label, e.g. `"Filler Under Eyes"`.
    pub fn label(&self) -> String {
        self.id()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Renders this treatment's fragment at the given intensity.
    pub fn fragment(&self, intensity: i64) -> String {
        self.template()
            .replacen(INTENSITY_PLACEHOLDER, intensity_description(intensity), 1)
    }
}

impl std::fmt::Display for Treatment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl std::str::FromStr for Treatment {
    type Err = TreatVizError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_id(s).ok_or_else(|| {
            TreatVizError::InvalidRequest(format!("unknown treatment: {s}"))
        })
    }
}
