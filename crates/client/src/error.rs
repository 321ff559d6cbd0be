use certtrack_core::errors::{ApplicationError, DomainError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid backend base url {0}")]
    InvalidBaseUrl(String),
    #[error("cannot reach certification backend at `{url}`: {message}")]
    Connection { url: String, message: String },
    #[error("no active session; log in first")]
    NotAuthenticated,
    #[error("session expired and could not be refreshed")]
    SessionExpired,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("backend error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("could not decode backend response: {0}")]
    Decode(String),
    #[error("blocked by document requirements: {0}")]
    Blocked(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl ClientError {
    /// Errors that say nothing about the data itself, only that it could not be fetched.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Server { .. } | Self::Decode(_))
    }
}

impl From<ClientError> for ApplicationError {
    fn from(value: ClientError) -> Self {
        match value {
            ClientError::Domain(error) => Self::Domain(error),
            ClientError::InvalidBaseUrl(_) => Self::Configuration(value.to_string()),
            ClientError::Blocked(message) => Self::Blocked(message),
            ClientError::NotAuthenticated
            | ClientError::SessionExpired
            | ClientError::InvalidCredentials => Self::Session(value.to_string()),
            ClientError::NotFound(_) | ClientError::Rejected { .. } => {
                Self::Domain(DomainError::InvalidInput(value.to_string()))
            }
            ClientError::Connection { .. }
            | ClientError::Server { .. }
            | ClientError::Decode(_) => Self::Backend(value.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use certtrack_core::errors::ApplicationError;

    use super::ClientError;

    #[test]
    fn session_failures_map_to_session_errors() {
        assert!(matches!(
            ApplicationError::from(ClientError::SessionExpired),
            ApplicationError::Session(_)
        ));
        assert!(matches!(
            ApplicationError::from(ClientError::InvalidCredentials),
            ApplicationError::Session(_)
        ));
    }

    #[test]
    fn bad_base_url_is_a_configuration_error() {
        let error =
            ClientError::InvalidBaseUrl("`not a url`: relative URL without a base".to_string());
        assert!(!error.is_transient());
        assert!(matches!(ApplicationError::from(error), ApplicationError::Configuration(_)));
    }

    #[test]
    fn transport_failures_are_transient_backend_errors() {
        let error = ClientError::Connection {
            url: "http://localhost:1".to_string(),
            message: "connection refused".to_string(),
        };
        assert!(error.is_transient());
        assert!(matches!(ApplicationError::from(error), ApplicationError::Backend(_)));
        assert!(!ClientError::NotFound("certification `X`".to_string()).is_transient());
    }
}
