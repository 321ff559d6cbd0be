use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Action type tag of a change-history entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum HistoryAction {
    UploadPdf,
    ReuploadPdf,
    SubmitReport,
    ResubmitReport,
    Other(String),
}

impl HistoryAction {
    pub fn as_str(&self) -> &str {
        match self {
            Self::UploadPdf => "UPLOAD_PDF",
            Self::ReuploadPdf => "REUPLOAD_PDF",
            Self::SubmitReport => "SUBMIT_REPORT",
            Self::ResubmitReport => "RESUBMIT_REPORT",
            Self::Other(tag) => tag,
        }
    }

    /// Whether this action shows the record already went through a submission cycle.
    pub fn counts_toward_resubmission(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<String> for HistoryAction {
    fn from(tag: String) -> Self {
        match tag.trim().to_ascii_uppercase().as_str() {
            "UPLOAD_PDF" => Self::UploadPdf,
            "REUPLOAD_PDF" => Self::ReuploadPdf,
            "SUBMIT_REPORT" => Self::SubmitReport,
            "RESUBMIT_REPORT" => Self::ResubmitReport,
            _ => Self::Other(tag),
        }
    }
}

impl From<HistoryAction> for String {
    fn from(action: HistoryAction) -> Self {
        action.as_str().to_string()
    }
}

impl fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for HistoryAction {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for HistoryAction {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub action: HistoryAction,
    #[serde(default)]
    pub actor: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
}

impl HistoryEntry {
    pub fn new(action: HistoryAction) -> Self {
        Self { action, actor: None, detail: None, occurred_at: None }
    }
}

#[cfg(test)]
mod tests {
    use super::{HistoryAction, HistoryEntry};

    #[test]
    fn parses_known_and_unknown_action_tags() {
        let entries: Vec<HistoryEntry> = serde_json::from_str(
            r#"[{"action":"UPLOAD_PDF","actor":"lan"},{"action":"DELETE_PDF"}]"#,
        )
        .expect("history should parse");

        assert_eq!(entries[0].action, HistoryAction::UploadPdf);
        assert_eq!(entries[1].action, HistoryAction::Other("DELETE_PDF".to_string()));
        assert!(entries[0].action.counts_toward_resubmission());
        assert!(!entries[1].action.counts_toward_resubmission());
    }

    #[test]
    fn serializes_back_to_wire_tag() {
        let json = serde_json::to_string(&HistoryAction::ResubmitReport).expect("json");
        assert_eq!(json, "\"RESUBMIT_REPORT\"");
    }
}
