//! Gathers everything needed to evaluate a certification's document
//! requirements and gates report submission on the result.
//!
//! Listing and history failures are logged and treated as "no data": the slot
//! or history check they would have informed never blocks an action, and the
//! backend decides instead.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{info, warn};
use uuid::Uuid;

use certtrack_core::domain::{
    CertificationId, CertificationRecord, DocumentSlot, HistoryEntry, SlotCounts, SlotFile,
    SlotSet, UlCertStatus,
};
use certtrack_core::requirements::{RequirementEvaluation, RequirementInput, RequirementResolver};

use crate::api::CertificationApi;
use crate::error::ClientError;

/// Requirement evaluation of one record plus the data it was computed from.
#[derive(Clone, Debug, Serialize)]
pub struct CertificationProgress {
    pub record: CertificationRecord,
    pub files: Vec<SlotFile>,
    pub history: Vec<HistoryEntry>,
    pub evaluation: RequirementEvaluation,
    /// Visible slots whose file listing could not be fetched.
    pub unavailable_slots: SlotSet,
    pub history_unavailable: bool,
}

impl CertificationProgress {
    pub fn is_degraded(&self) -> bool {
        !self.unavailable_slots.is_empty() || self.history_unavailable
    }

    /// Missing slots that are known to be empty, as opposed to unknown.
    pub fn blocking_slots(&self) -> SlotSet {
        self.evaluation.missing.difference(&self.unavailable_slots)
    }

    pub fn submit_allowed(&self) -> bool {
        !self.record.is_report_dated() && self.blocking_slots().is_empty()
    }

    pub fn resubmit_allowed(&self) -> bool {
        let prior_cycle = self.history_unavailable
            || self.history.iter().any(|entry| entry.action.counts_toward_resubmission());
        prior_cycle && self.submit_allowed()
    }

    fn blocked_reason(&self) -> String {
        if self.record.is_report_dated() {
            return format!("report for `{}` is already submitted", self.record.id);
        }
        let blocking = self.blocking_slots();
        if !blocking.is_empty() {
            return format!("missing required slots {:?}", blocking.numbers());
        }
        format!("no prior submission recorded for `{}`", self.record.id)
    }
}

pub struct ProgressService<A> {
    api: Arc<A>,
    ul_fallback: Option<UlCertStatus>,
}

impl<A> Clone for ProgressService<A> {
    fn clone(&self) -> Self {
        Self { api: Arc::clone(&self.api), ul_fallback: self.ul_fallback }
    }
}

impl<A> ProgressService<A>
where
    A: CertificationApi + 'static,
{
    pub fn new(api: Arc<A>, ul_fallback: Option<UlCertStatus>) -> Self {
        Self { api, ul_fallback }
    }

    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    pub async fn load(&self, id: &CertificationId) -> Result<CertificationProgress, ClientError> {
        let correlation_id = Uuid::new_v4().to_string();
        let record = self.api.fetch_certification(id).await?;
        let input = RequirementInput::from_record(&record).with_ul_fallback(self.ul_fallback);
        let visible =
            RequirementResolver::new(input.clone(), SlotCounts::default()).visible_slots();

        let (listings, history) = tokio::join!(
            self.fetch_listings(id, visible, &correlation_id),
            self.api.fetch_history(id)
        );
        let (files, unavailable_slots) = listings;

        let (history, history_unavailable) = match history {
            Ok(history) => (history, false),
            Err(error) => {
                warn!(
                    event_name = "progress.history_unavailable",
                    correlation_id = correlation_id.as_str(),
                    certification_id = %id,
                    error = %error,
                    "history feed unavailable; resubmission check deferred to backend"
                );
                (Vec::new(), true)
            }
        };

        let resolver = RequirementResolver::new(input, SlotCounts::from_files(&files));
        let evaluation = resolver.evaluate(&history);
        info!(
            event_name = "progress.loaded",
            correlation_id = correlation_id.as_str(),
            certification_id = %id,
            state = ?evaluation.state,
            missing = ?evaluation.missing,
            degraded = !unavailable_slots.is_empty() || history_unavailable,
            "certification progress loaded"
        );

        Ok(CertificationProgress {
            record,
            files,
            history,
            evaluation,
            unavailable_slots,
            history_unavailable,
        })
    }

    async fn fetch_listings(
        &self,
        id: &CertificationId,
        slots: SlotSet,
        correlation_id: &str,
    ) -> (Vec<SlotFile>, SlotSet) {
        let mut tasks = JoinSet::new();
        let mut task_slots = HashMap::new();
        for slot in slots.iter() {
            let api = Arc::clone(&self.api);
            let id = id.clone();
            let handle = tasks.spawn(async move { api.list_slot_files(&id, slot).await });
            task_slots.insert(handle.id(), slot);
        }

        let mut files = Vec::new();
        let mut unavailable = SlotSet::EMPTY;
        while let Some(joined) = tasks.join_next_with_id().await {
            let (task_id, error) = match joined {
                Ok((_, Ok(listing))) => {
                    files.extend(listing);
                    continue;
                }
                Ok((task_id, Err(error))) => (task_id, error.to_string()),
                Err(error) => (error.id(), format!("listing task failed: {error}")),
            };
            let Some(slot) = task_slots.get(&task_id).copied() else {
                continue;
            };
            warn!(
                event_name = "progress.slot_listing_unavailable",
                correlation_id,
                certification_id = %id,
                slot = slot.number(),
                error = error.as_str(),
                "slot file listing unavailable; treating slot as unknown"
            );
            unavailable.insert(slot);
        }

        files.sort_by(|left, right| {
            left.slot.cmp(&right.slot).then_with(|| left.id.cmp(&right.id))
        });
        (files, unavailable)
    }

    pub async fn submit(&self, id: &CertificationId) -> Result<CertificationProgress, ClientError> {
        let progress = self.load(id).await?;
        if !progress.submit_allowed() {
            return Err(ClientError::Blocked(progress.blocked_reason()));
        }

        self.api.submit_report(id).await?;
        info!(event_name = "progress.report_submitted", certification_id = %id, "report submitted");
        self.load(id).await
    }

    pub async fn resubmit(
        &self,
        id: &CertificationId,
    ) -> Result<CertificationProgress, ClientError> {
        let progress = self.load(id).await?;
        if !progress.resubmit_allowed() {
            return Err(ClientError::Blocked(progress.blocked_reason()));
        }

        self.api.resubmit_report(id).await?;
        info!(
            event_name = "progress.report_resubmitted",
            certification_id = %id,
            "report resubmitted"
        );
        self.load(id).await
    }

    /// Uploads into a slot the record currently displays.
    pub async fn upload(
        &self,
        id: &CertificationId,
        slot: DocumentSlot,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<CertificationProgress, ClientError> {
        let record = self.api.fetch_certification(id).await?;
        let input = RequirementInput::from_record(&record).with_ul_fallback(self.ul_fallback);
        if !RequirementResolver::new(input, SlotCounts::default()).should_show_pdf(slot.number()) {
            return Err(ClientError::Blocked(format!(
                "slot {slot} is not displayed for certification `{id}`"
            )));
        }

        let file = self.api.upload_slot_file(id, slot, file_name, bytes).await?;
        info!(
            event_name = "progress.file_uploaded",
            certification_id = %id,
            slot = slot.number(),
            file_id = file.id.as_str(),
            "slot file uploaded"
        );
        self.load(id).await
    }

    pub async fn delete_file(
        &self,
        id: &CertificationId,
        file_id: &str,
    ) -> Result<CertificationProgress, ClientError> {
        self.api.delete_slot_file(id, file_id).await?;
        info!(
            event_name = "progress.file_deleted",
            certification_id = %id,
            file_id,
            "slot file deleted"
        );
        self.load(id).await
    }
}
