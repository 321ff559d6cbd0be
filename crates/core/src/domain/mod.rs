pub mod certification;
pub mod history;
pub mod material;
pub mod slot;

pub use certification::{CertificationId, CertificationRecord};
pub use history::{HistoryAction, HistoryEntry};
pub use material::{MaterialClassId, MaterialGroup, PriceRequest, UlCertStatus};
pub use slot::{DocumentSlot, SlotCounts, SlotFile, SlotSet};
