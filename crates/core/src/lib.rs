pub mod config;
pub mod domain;
pub mod errors;
pub mod requirements;
pub mod session;
pub mod workflow;

pub use domain::{
    CertificationId, CertificationRecord, DocumentSlot, HistoryAction, HistoryEntry,
    MaterialClassId, MaterialGroup, PriceRequest, SlotCounts, SlotFile, SlotSet, UlCertStatus,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use requirements::{
    RequiredSlots, RequirementEvaluation, RequirementInput, RequirementResolver,
};
pub use session::{SessionContext, SessionHandle, SessionUser, TokenGrant};
pub use workflow::{WorkflowEvent, WorkflowState};
