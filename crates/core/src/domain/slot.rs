use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// One of the eight document upload categories attached to a certification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum DocumentSlot {
    ReliabilityReport = 1,
    PlatingReport = 2,
    LaminationReport = 3,
    DrillingReport = 4,
    SolderMaskReport = 5,
    UlTestReport = 6,
    OtherDocuments = 7,
    InkProcessingReport = 8,
}

impl DocumentSlot {
    pub const ALL: [DocumentSlot; 8] = [
        Self::ReliabilityReport,
        Self::PlatingReport,
        Self::LaminationReport,
        Self::DrillingReport,
        Self::SolderMaskReport,
        Self::UlTestReport,
        Self::OtherDocuments,
        Self::InkProcessingReport,
    ];

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn from_number(number: u8) -> Result<Self, DomainError> {
        Self::ALL
            .into_iter()
            .find(|slot| slot.number() == number)
            .ok_or(DomainError::UnknownSlot(number))
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::ReliabilityReport => "Reliability report",
            Self::PlatingReport => "Plating report",
            Self::LaminationReport => "Lamination report",
            Self::DrillingReport => "Drilling report",
            Self::SolderMaskReport => "Solder mask report",
            Self::UlTestReport => "UL test report",
            Self::OtherDocuments => "Other documents",
            Self::InkProcessingReport => "Ink processing report",
        }
    }
}

impl From<DocumentSlot> for u8 {
    fn from(slot: DocumentSlot) -> Self {
        slot.number()
    }
}

impl TryFrom<u8> for DocumentSlot {
    type Error = DomainError;

    fn try_from(number: u8) -> Result<Self, Self::Error> {
        Self::from_number(number)
    }
}

impl fmt::Display for DocumentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.number(), self.title())
    }
}

/// Set of document slots, iterated in ascending slot order.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "Vec<u8>", try_from = "Vec<u8>")]
pub struct SlotSet(u8);

impl SlotSet {
    pub const EMPTY: SlotSet = SlotSet(0);

    pub fn from_slots(slots: &[DocumentSlot]) -> Self {
        slots.iter().copied().collect()
    }

    fn bit(slot: DocumentSlot) -> u8 {
        1 << (slot.number() - 1)
    }

    pub fn insert(&mut self, slot: DocumentSlot) {
        self.0 |= Self::bit(slot);
    }

    pub fn contains(&self, slot: DocumentSlot) -> bool {
        self.0 & Self::bit(slot) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn difference(&self, other: &SlotSet) -> SlotSet {
        SlotSet(self.0 & !other.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = DocumentSlot> + '_ {
        DocumentSlot::ALL.into_iter().filter(move |slot| self.contains(*slot))
    }

    pub fn numbers(&self) -> Vec<u8> {
        self.iter().map(DocumentSlot::number).collect()
    }
}

impl FromIterator<DocumentSlot> for SlotSet {
    fn from_iter<I: IntoIterator<Item = DocumentSlot>>(iter: I) -> Self {
        let mut set = SlotSet::EMPTY;
        for slot in iter {
            set.insert(slot);
        }
        set
    }
}

impl fmt::Debug for SlotSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.numbers()).finish()
    }
}

impl From<SlotSet> for Vec<u8> {
    fn from(set: SlotSet) -> Self {
        set.numbers()
    }
}

impl TryFrom<Vec<u8>> for SlotSet {
    type Error = DomainError;

    fn try_from(numbers: Vec<u8>) -> Result<Self, Self::Error> {
        numbers.into_iter().map(DocumentSlot::from_number).collect()
    }
}

/// Number of uploaded files per slot, as reported by the file listings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotCounts(BTreeMap<DocumentSlot, u32>);

impl SlotCounts {
    pub fn set(&mut self, slot: DocumentSlot, count: u32) {
        if count == 0 {
            self.0.remove(&slot);
        } else {
            self.0.insert(slot, count);
        }
    }

    pub fn with(mut self, slot: DocumentSlot, count: u32) -> Self {
        self.set(slot, count);
        self
    }

    pub fn count(&self, slot: DocumentSlot) -> u32 {
        self.0.get(&slot).copied().unwrap_or(0)
    }

    /// Slots holding at least one file.
    pub fn uploaded(&self) -> SlotSet {
        self.0.iter().filter(|(_, count)| **count > 0).map(|(slot, _)| *slot).collect()
    }

    pub fn from_files(files: &[SlotFile]) -> Self {
        let mut counts = Self::default();
        for file in files {
            let next = counts.count(file.slot) + 1;
            counts.set(file.slot, next);
        }
        counts
    }
}

/// One row of a slot file listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotFile {
    pub id: String,
    pub slot: DocumentSlot,
    pub file_name: String,
    #[serde(default)]
    pub size_bytes: Option<u64>,
    #[serde(default)]
    pub uploaded_by: Option<String>,
    #[serde(default)]
    pub uploaded_at: Option<DateTime<Utc>>,
}
