//! Shared setup for commands that talk to the certification backend.

use std::future::Future;
use std::sync::Arc;

use certtrack_client::{CertificationApi, ClientError, HttpCertificationApi, ProgressService};
use certtrack_core::config::{AppConfig, LoadOptions};
use certtrack_core::session::SessionHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::commands::{CommandResult, EXIT_BACKEND};

/// Loads config, logs in and runs `action` against a fresh progress service.
pub fn run_with_service<F, Fut>(command: &str, options: LoadOptions, action: F) -> CommandResult
where
    F: FnOnce(ProgressService<HttpCertificationApi>, String) -> Fut,
    Fut: Future<Output = CommandResult>,
{
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return CommandResult::config_failure(command, &error),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                command,
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                EXIT_BACKEND,
            )
        }
    };

    let correlation_id = Uuid::new_v4().to_string();
    runtime.block_on(async {
        match connect(&config, &correlation_id).await {
            Ok(service) => {
                let result = action(service.clone(), correlation_id.clone()).await;
                if let Err(error) = service.api().logout().await {
                    warn!(
                        event_name = "cli.session.logout_failed",
                        correlation_id = correlation_id.as_str(),
                        error = %error,
                        "logout after command failed"
                    );
                }
                result
            }
            Err(error) => CommandResult::client_failure(command, error, &correlation_id),
        }
    })
}

/// Builds the HTTP client and establishes a session with the configured credentials.
pub async fn connect(
    config: &AppConfig,
    correlation_id: &str,
) -> Result<ProgressService<HttpCertificationApi>, ClientError> {
    let api = HttpCertificationApi::from_config(&config.api, SessionHandle::new())?;

    let (Some(username), Some(password)) = (&config.auth.username, &config.auth.password) else {
        return Err(ClientError::NotAuthenticated);
    };
    api.login(username, password).await?;

    info!(
        event_name = "cli.session.established",
        correlation_id,
        base_url = config.api.base_url.as_str(),
        "logged in to certification backend"
    );
    Ok(ProgressService::new(Arc::new(api), config.requirements.ul_cert_fallback))
}
