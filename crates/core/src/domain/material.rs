use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Material class identifiers that belong to the paint/ink-related group.
pub const PAINT_RELATED_CLASSES: [u32; 3] = [4, 5, 7];

/// Material class identifier of rigid laminates.
pub const RIGID_CLASS: u32 = 1;

/// UL certification tiers that waive the UL test report.
pub const UL_WAIVER_TIERS: [u32; 3] = [1, 2, 3];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialClassId(pub u32);

impl MaterialClassId {
    pub fn group(self) -> MaterialGroup {
        MaterialGroup::of(Some(self))
    }
}

/// Coarse material grouping that drives which document set applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialGroup {
    PaintRelated,
    Rigid,
    Other,
}

impl MaterialGroup {
    pub fn of(class: Option<MaterialClassId>) -> Self {
        match class {
            Some(MaterialClassId(id)) if PAINT_RELATED_CLASSES.contains(&id) => Self::PaintRelated,
            Some(MaterialClassId(RIGID_CLASS)) => Self::Rigid,
            _ => Self::Other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PaintRelated => "paint_related",
            Self::Rigid => "rigid",
            Self::Other => "other",
        }
    }
}

/// Evaluation type requested for a certification.
///
/// The wire representation is the label used by the backend, which is Vietnamese.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriceRequest {
    #[serde(rename = "Gia công")]
    Processing,
    #[serde(rename = "Tin cậy")]
    Reliability,
    #[serde(rename = "Gia công & Tin cậy")]
    ProcessingAndReliability,
}

impl PriceRequest {
    pub const ALL: [PriceRequest; 3] =
        [Self::Processing, Self::Reliability, Self::ProcessingAndReliability];

    pub fn label(self) -> &'static str {
        match self {
            Self::Processing => "Gia công",
            Self::Reliability => "Tin cậy",
            Self::ProcessingAndReliability => "Gia công & Tin cậy",
        }
    }

    pub fn includes_processing(self) -> bool {
        matches!(self, Self::Processing | Self::ProcessingAndReliability)
    }
}

impl fmt::Display for PriceRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PriceRequest {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if let Some(found) = Self::ALL.into_iter().find(|candidate| candidate.label() == trimmed) {
            return Ok(found);
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "processing" => Ok(Self::Processing),
            "reliability" => Ok(Self::Reliability),
            "both" | "processing_and_reliability" => Ok(Self::ProcessingAndReliability),
            other => Err(DomainError::InvalidInput(format!(
                "unsupported price request `{other}` (expected processing|reliability|both)"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UlCertStatus(pub u32);

impl UlCertStatus {
    pub fn is_waiver_tier(self) -> bool {
        UL_WAIVER_TIERS.contains(&self.0)
    }
}
