use certtrack_client::{CertificationApi, ProgressService};
use certtrack_core::config::LoadOptions;
use certtrack_core::domain::CertificationId;

use crate::commands::progress::summarize;
use crate::commands::{backend, CommandResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportAction {
    Submit,
    Resubmit,
}

impl ReportAction {
    fn command(self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Resubmit => "resubmit",
        }
    }
}

pub fn run(options: LoadOptions, action: ReportAction, id: &str) -> CommandResult {
    backend::run_with_service(action.command(), options, |service, correlation_id| async move {
        execute(&service, action, id, &correlation_id).await
    })
}

pub async fn execute<A>(
    service: &ProgressService<A>,
    action: ReportAction,
    id: &str,
    correlation_id: &str,
) -> CommandResult
where
    A: CertificationApi + 'static,
{
    let id = CertificationId(id.to_string());
    let outcome = match action {
        ReportAction::Submit => service.submit(&id).await,
        ReportAction::Resubmit => service.resubmit(&id).await,
    };

    match outcome {
        Ok(progress) => {
            CommandResult::success_with(action.command(), summarize(&progress), &progress)
        }
        Err(error) => CommandResult::client_failure(action.command(), error, correlation_id),
    }
}
