pub mod backend;
pub mod config;
pub mod files;
pub mod progress;
pub mod report;
pub mod requirements;
pub mod rules;

use certtrack_client::ClientError;
use certtrack_core::config::ConfigError;
use certtrack_core::errors::{ApplicationError, InterfaceError};
use serde::Serialize;
use serde_json::Value;

pub const EXIT_OK: u8 = 0;
pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_INVALID_INPUT: u8 = 3;
pub const EXIT_BACKEND: u8 = 4;
pub const EXIT_BLOCKED: u8 = 5;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with(command, message, Value::Null)
    }

    /// Success payload carrying a structured `data` section.
    pub fn success_with(command: &str, message: impl Into<String>, data: impl Serialize) -> Self {
        let data = match serde_json::to_value(data) {
            Ok(Value::Null) => None,
            Ok(value) => Some(value),
            Err(error) => {
                return Self::failure(command, "serialization", error.to_string(), EXIT_BACKEND)
            }
        };
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            correlation_id: None,
            message: message.into(),
            data,
        };
        Self { exit_code: EXIT_OK, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            correlation_id: None,
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn config_failure(command: &str, error: &ConfigError) -> Self {
        Self::failure(command, "config_validation", error.to_string(), EXIT_CONFIG)
    }

    pub fn invalid_input(command: &str, message: impl Into<String>) -> Self {
        Self::failure(command, "invalid_input", message, EXIT_INVALID_INPUT)
    }

    /// Maps a client failure through the application and interface error layers.
    pub fn client_failure(command: &str, error: ClientError, correlation_id: &str) -> Self {
        let detail = error.to_string();
        let application = ApplicationError::from(error);
        let (error_class, exit_code) = match &application {
            ApplicationError::Blocked(_) => ("blocked", EXIT_BLOCKED),
            ApplicationError::Domain(_) => ("invalid_input", EXIT_INVALID_INPUT),
            ApplicationError::Session(_) => ("session", EXIT_BACKEND),
            ApplicationError::Backend(_) => ("backend_unavailable", EXIT_BACKEND),
            ApplicationError::Configuration(_) => ("config_validation", EXIT_CONFIG),
        };
        let interface: InterfaceError = application.into_interface(correlation_id);

        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            correlation_id: Some(interface.correlation_id().to_string()),
            message: format!("{} ({detail})", interface.user_message()),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
