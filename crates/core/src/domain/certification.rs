use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::domain::material::{MaterialClassId, PriceRequest, UlCertStatus};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CertificationId(pub String);

impl fmt::Display for CertificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Certification record as stored by the backend.
///
/// Only the classification fields and the report date feed requirement
/// evaluation; the descriptive fields are carried through for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificationRecord {
    pub id: CertificationId,
    #[serde(default)]
    pub material_name: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub material_class_id: Option<MaterialClassId>,
    #[serde(default, deserialize_with = "lenient_price_request")]
    pub price_request: Option<PriceRequest>,
    #[serde(default)]
    pub ul_cert_status: Option<UlCertStatus>,
    #[serde(default)]
    pub report_actual_date: Option<NaiveDate>,
}

impl CertificationRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: CertificationId(id.into()),
            material_name: None,
            vendor: None,
            material_class_id: None,
            price_request: None,
            ul_cert_status: None,
            report_actual_date: None,
        }
    }

    pub fn is_report_dated(&self) -> bool {
        self.report_actual_date.is_some()
    }
}

/// Blank or unrecognized labels decode as "not set" so the record still evaluates.
fn lenient_price_request<'de, D>(deserializer: D) -> Result<Option<PriceRequest>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if raw.trim().is_empty() {
        return Ok(None);
    }

    match raw.parse::<PriceRequest>() {
        Ok(price_request) => Ok(Some(price_request)),
        Err(_) => {
            warn!(
                event_name = "domain.certification.unknown_price_request",
                price_request = raw.as_str(),
                "unrecognized price request label treated as unset"
            );
            Ok(None)
        }
    }
}
