use garde::Validate;
use serde::{Deserialize, Serialize};
use strsim::jaro_winkler;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Minimum similarity before an unknown name gets a "did you mean" hint.
const SUGGESTION_THRESHOLD: f64 = 0.7;

/// Compliance presets understood by the backend.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, EnumIter, Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ComplianceProfile {
    #[default]
    None,
    Gdpr,
    Ccpa,
    HipaaSafeHarbor,
}

/// How detected regions are obscured.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, EnumIter, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum RedactionMode {
    #[default]
    Blur,
    Pixelate,
    BlackBox,
}

/// Per-target overrides. `None` leaves the profile default in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetOverrides {
    pub faces: Option<bool>,
    pub plates: Option<bool>,
    pub logos: Option<bool>,
    pub text: Option<bool>,
}

impl TargetOverrides {
    /// Overrides paired with their form field names, in wire order.
    pub fn fields(&self) -> [(&'static str, Option<bool>); 4] {
        [
            ("target_faces", self.faces),
            ("target_plates", self.plates),
            ("target_logos", self.logos),
            ("target_text", self.text),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.fields().iter().all(|(_, v)| v.is_none())
    }
}

/// Normalized region of interest, all coordinates in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct RegionOfInterest {
    #[garde(range(min = 0.0, max = 1.0))]
    pub x_min: f64,
    #[garde(range(min = 0.0, max = 1.0))]
    pub y_min: f64,
    #[garde(range(min = 0.0, max = 1.0))]
    pub x_max: f64,
    #[garde(range(min = 0.0, max = 1.0))]
    pub y_max: f64,
}

impl RegionOfInterest {
    /// Wire encoding: `x_min,y_min,x_max,y_max`.
    pub fn to_form_value(&self) -> String {
        format!("{},{},{},{}", self.x_min, self.y_min, self.x_max, self.y_max)
    }

    fn check_order(&self) -> Result<(), ModelError> {
        // Range checks compare false against NaN, so they let it through.
        if [self.x_min, self.y_min, self.x_max, self.y_max].iter().any(|v| !v.is_finite()) {
            return Err(ModelError::InvalidRoi(format!(
                "coordinates must be finite, got {}",
                self.to_form_value()
            )));
        }
        if self.x_min >= self.x_max || self.y_min >= self.y_max {
            return Err(ModelError::InvalidRoi(format!(
                "expected x_min < x_max and y_min < y_max, got {}",
                self.to_form_value()
            )));
        }
        Ok(())
    }
}

impl std::str::FromStr for RegionOfInterest {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ModelError::InvalidRoi(format!("{s:?}: {e}")))?;

        let &[x_min, y_min, x_max, y_max] = parts.as_slice() else {
            return Err(ModelError::InvalidRoi(format!(
                "{s:?}: expected four comma-separated values"
            )));
        };

        let roi = Self { x_min, y_min, x_max, y_max };
        roi.validate()
            .map_err(|report| ModelError::InvalidRoi(report.to_string()))?;
        roi.check_order()?;
        Ok(roi)
    }
}

/// Immutable snapshot of everything the operator chose for one submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RedactionRequest {
    #[garde(skip)]
    pub profile: ComplianceProfile,

    #[garde(skip)]
    pub mode: RedactionMode,

    #[garde(skip)]
    pub targets: TargetOverrides,

    #[garde(dive)]
    pub roi: Option<RegionOfInterest>,

    #[garde(skip)]
    pub coordinates_only: bool,

    #[garde(length(min = 1, max = 2048))]
    pub webhook_url: Option<String>,
}

impl RedactionRequest {
    /// Validate the snapshot once, before it is handed to a contract.
    pub fn validated(self) -> Result<Self, ModelError> {
        self.validate()?;
        if let Some(roi) = &self.roi {
            roi.check_order()?;
        }
        Ok(self)
    }
}

/// Case-insensitive profile lookup with a closest-match hint.
pub fn parse_profile(s: &str) -> Result<ComplianceProfile, ModelError> {
    s.trim().parse().map_err(|_| ModelError::UnknownProfile {
        given: s.to_string(),
        suggestion: closest(s, ComplianceProfile::iter().map(|p| p.to_string())),
    })
}

/// Case-insensitive mode lookup with a closest-match hint.
pub fn parse_mode(s: &str) -> Result<RedactionMode, ModelError> {
    s.trim().parse().map_err(|_| ModelError::UnknownMode {
        given: s.to_string(),
        suggestion: closest(s, RedactionMode::iter().map(|m| m.to_string())),
    })
}

fn closest(given: &str, candidates: impl Iterator<Item = String>) -> Option<String> {
    let given = given.trim().to_lowercase();
    candidates
        .map(|c| (jaro_winkler(&given, &c.to_lowercase()), c))
        .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, c)| c)
}

fn hint(suggestion: &Option<String>) -> String {
    suggestion
        .as_ref()
        .map(|s| format!(" (did you mean {s}?)"))
        .unwrap_or_default()
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Unknown compliance profile '{given}'{}", hint(.suggestion))]
    UnknownProfile {
        given: String,
        suggestion: Option<String>,
    },

    #[error("Unknown redaction mode '{given}'{}", hint(.suggestion))]
    UnknownMode {
        given: String,
        suggestion: Option<String>,
    },

    #[error("Invalid region of interest: {0}")]
    InvalidRoi(String),

    #[error("Invalid redaction request: {0}")]
    Invalid(#[from] garde::Report),
}
