use thiserror::Error;

use crate::workflow::WorkflowState;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid workflow transition from {from:?} to {to:?}")]
    InvalidWorkflowTransition { from: WorkflowState, to: WorkflowState },
    #[error("unknown document slot {0} (expected 1..=8)")]
    UnknownSlot(u8),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("backend failure: {0}")]
    Backend(String),
    #[error("session failure: {0}")]
    Session(String),
    #[error("blocked by document requirements: {0}")]
    Blocked(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

/// What a caller outside the core sees: a category, the detail and the request's correlation id.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("invalid request: {detail}")]
    InvalidRequest { detail: String, correlation_id: String },
    #[error("not allowed yet: {detail}")]
    NotAllowed { detail: String, correlation_id: String },
    #[error("signed out: {detail}")]
    SignedOut { detail: String, correlation_id: String },
    #[error("backend unreachable: {detail}")]
    BackendUnreachable { detail: String, correlation_id: String },
    #[error("misconfigured: {detail}")]
    Misconfigured { detail: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => {
                "That certification or document does not exist, or the input is malformed."
            }
            Self::NotAllowed { .. } => {
                "The report cannot be sent yet. Upload the missing documents first."
            }
            Self::SignedOut { .. } => "Your session has ended. Sign in again to continue.",
            Self::BackendUnreachable { .. } => {
                "The certification service is temporarily unavailable. Please retry shortly."
            }
            Self::Misconfigured { .. } => {
                "certtrack is misconfigured. Check the config file and environment."
            }
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::InvalidRequest { correlation_id, .. }
            | Self::NotAllowed { correlation_id, .. }
            | Self::SignedOut { correlation_id, .. }
            | Self::BackendUnreachable { correlation_id, .. }
            | Self::Misconfigured { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    /// Tags the error with the correlation id of the request that produced it.
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        match self {
            Self::Domain(error) => {
                InterfaceError::InvalidRequest { detail: error.to_string(), correlation_id }
            }
            Self::Blocked(detail) => InterfaceError::NotAllowed { detail, correlation_id },
            Self::Session(detail) => InterfaceError::SignedOut { detail, correlation_id },
            Self::Backend(detail) => InterfaceError::BackendUnreachable { detail, correlation_id },
            Self::Configuration(detail) => InterfaceError::Misconfigured { detail, correlation_id },
        }
    }
}
