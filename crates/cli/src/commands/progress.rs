use certtrack_client::{CertificationApi, CertificationProgress, ProgressService};
use certtrack_core::config::LoadOptions;
use certtrack_core::domain::CertificationId;

use crate::commands::{backend, CommandResult};

const COMMAND: &str = "progress";

pub fn run(options: LoadOptions, id: &str) -> CommandResult {
    backend::run_with_service(COMMAND, options, |service, correlation_id| async move {
        execute(&service, id, &correlation_id).await
    })
}

pub async fn execute<A>(
    service: &ProgressService<A>,
    id: &str,
    correlation_id: &str,
) -> CommandResult
where
    A: CertificationApi + 'static,
{
    let id = CertificationId(id.to_string());
    match service.load(&id).await {
        Ok(progress) => CommandResult::success_with(COMMAND, summarize(&progress), &progress),
        Err(error) => CommandResult::client_failure(COMMAND, error, correlation_id),
    }
}

/// One-line human summary of a progress snapshot.
pub fn summarize(progress: &CertificationProgress) -> String {
    let evaluation = &progress.evaluation;
    let mut summary = format!("{}: {:?}", progress.record.id, evaluation.state);
    if !evaluation.missing.is_empty() {
        summary.push_str(&format!(", missing slots {:?}", evaluation.missing.numbers()));
    }
    if progress.resubmit_allowed() {
        summary.push_str(", resubmission available");
    }
    if progress.is_degraded() {
        summary.push_str(", partial data");
    }
    summary
}
