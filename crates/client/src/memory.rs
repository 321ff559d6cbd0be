use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;

use certtrack_core::domain::{
    CertificationId, CertificationRecord, DocumentSlot, HistoryAction, HistoryEntry, SlotCounts,
    SlotFile,
};
use certtrack_core::requirements::{RequirementInput, RequirementResolver};
use certtrack_core::session::{SessionContext, SessionHandle, SessionUser, TokenGrant};

use crate::api::CertificationApi;
use crate::error::ClientError;

#[derive(Default)]
struct MemoryState {
    records: HashMap<CertificationId, CertificationRecord>,
    files: HashMap<CertificationId, Vec<SlotFile>>,
    history: HashMap<CertificationId, Vec<HistoryEntry>>,
    credentials: HashMap<String, String>,
    failing_slots: HashSet<DocumentSlot>,
    history_unavailable: bool,
    issued_tokens: u64,
    next_file_id: u64,
}

/// Backend stand-in that keeps records, files and history in memory.
///
/// It enforces the same document requirements server-side so client-side
/// gating can be exercised against a real authority.
#[derive(Default)]
pub struct InMemoryCertificationApi {
    state: RwLock<MemoryState>,
    session: SessionHandle,
}

impl InMemoryCertificationApi {
    pub fn new(session: SessionHandle) -> Self {
        Self { state: RwLock::default(), session }
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub async fn add_user(&self, username: &str, password: &str) {
        let mut state = self.state.write().await;
        state.credentials.insert(username.to_string(), password.to_string());
    }

    pub async fn insert_record(&self, record: CertificationRecord) {
        let mut state = self.state.write().await;
        state.records.insert(record.id.clone(), record);
    }

    pub async fn record(&self, id: &CertificationId) -> Option<CertificationRecord> {
        self.state.read().await.records.get(id).cloned()
    }

    pub async fn history_for(&self, id: &CertificationId) -> Vec<HistoryEntry> {
        self.state.read().await.history.get(id).cloned().unwrap_or_default()
    }

    pub async fn push_history(&self, id: &CertificationId, entry: HistoryEntry) {
        let mut state = self.state.write().await;
        state.history.entry(id.clone()).or_default().push(entry);
    }

    /// Makes listings for `slot` fail with a server error.
    pub async fn fail_slot_listing(&self, slot: DocumentSlot) {
        self.state.write().await.failing_slots.insert(slot);
    }

    pub async fn fail_history(&self) {
        self.state.write().await.history_unavailable = true;
    }

    /// Clears the report's actual date, as an administrator would server-side.
    pub async fn reopen_report(&self, id: &CertificationId) -> Result<(), ClientError> {
        let mut state = self.state.write().await;
        let record = state.records.get_mut(id).ok_or_else(|| not_found(id))?;
        record.report_actual_date = None;
        Ok(())
    }

    async fn require_session(&self) -> Result<SessionContext, ClientError> {
        self.session.current().await.ok_or(ClientError::NotAuthenticated)
    }

    fn issue_grant(state: &mut MemoryState, username: &str) -> TokenGrant {
        state.issued_tokens += 1;
        TokenGrant {
            access_token: format!("memory-access-{}", state.issued_tokens),
            refresh_token: Some(format!("memory-refresh-{username}")),
            expires_in_secs: Some(3600),
            user: None,
        }
    }
}

fn not_found(id: &CertificationId) -> ClientError {
    ClientError::NotFound(format!("certification `{id}`"))
}

fn rejected(status: u16, message: impl Into<String>) -> ClientError {
    ClientError::Rejected { status, message: message.into() }
}

fn unsatisfied_reason(state: &MemoryState, id: &CertificationId) -> Option<String> {
    let record = state.records.get(id)?;
    let files = state.files.get(id).map(Vec::as_slice).unwrap_or_default();
    let resolver = RequirementResolver::new(
        RequirementInput::from_record(record),
        SlotCounts::from_files(files),
    );
    let missing = resolver.missing_slots();
    (!missing.is_empty()).then(|| format!("missing required slots {:?}", missing.numbers()))
}

#[async_trait]
impl CertificationApi for InMemoryCertificationApi {
    async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<SessionContext, ClientError> {
        let mut state = self.state.write().await;
        let known = state.credentials.get(username).map(String::as_str);
        if known != Some(password.expose_secret()) {
            return Err(ClientError::InvalidCredentials);
        }

        let grant = Self::issue_grant(&mut state, username);
        let user = SessionUser {
            id: username.to_string(),
            username: username.to_string(),
            display_name: None,
            roles: Vec::new(),
        };
        let session = SessionContext::from_grant(grant, user, Utc::now());
        self.session.replace(session.clone()).await;
        Ok(session)
    }

    async fn refresh(&self) -> Result<SessionContext, ClientError> {
        let current = self.require_session().await?;
        if current.refresh_token().is_none() {
            self.session.clear().await;
            return Err(ClientError::SessionExpired);
        }

        let mut state = self.state.write().await;
        let grant = Self::issue_grant(&mut state, &current.user.username);
        let refreshed = current.refreshed(grant, Utc::now());
        self.session.replace(refreshed.clone()).await;
        Ok(refreshed)
    }

    async fn logout(&self) -> Result<(), ClientError> {
        self.session.clear().await;
        Ok(())
    }

    async fn fetch_certification(
        &self,
        id: &CertificationId,
    ) -> Result<CertificationRecord, ClientError> {
        self.require_session().await?;
        self.record(id).await.ok_or_else(|| not_found(id))
    }

    async fn list_slot_files(
        &self,
        id: &CertificationId,
        slot: DocumentSlot,
    ) -> Result<Vec<SlotFile>, ClientError> {
        self.require_session().await?;
        let state = self.state.read().await;
        if state.failing_slots.contains(&slot) {
            return Err(ClientError::Server {
                status: 503,
                message: format!("file listing for slot {} unavailable", slot.number()),
            });
        }
        if !state.records.contains_key(id) {
            return Err(not_found(id));
        }

        let files = state.files.get(id).map(Vec::as_slice).unwrap_or_default();
        Ok(files.iter().filter(|file| file.slot == slot).cloned().collect())
    }

    async fn fetch_history(&self, id: &CertificationId) -> Result<Vec<HistoryEntry>, ClientError> {
        self.require_session().await?;
        let state = self.state.read().await;
        if state.history_unavailable {
            return Err(ClientError::Server {
                status: 503,
                message: "history feed unavailable".to_string(),
            });
        }
        if !state.records.contains_key(id) {
            return Err(not_found(id));
        }
        Ok(state.history.get(id).cloned().unwrap_or_default())
    }

    async fn upload_slot_file(
        &self,
        id: &CertificationId,
        slot: DocumentSlot,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<SlotFile, ClientError> {
        let session = self.require_session().await?;
        let mut state = self.state.write().await;
        if !state.records.contains_key(id) {
            return Err(not_found(id));
        }
        if bytes.is_empty() {
            return Err(rejected(422, "uploaded file is empty"));
        }

        state.next_file_id += 1;
        let file = SlotFile {
            id: format!("file-{}", state.next_file_id),
            slot,
            file_name: file_name.to_string(),
            size_bytes: Some(bytes.len() as u64),
            uploaded_by: Some(session.user.username.clone()),
            uploaded_at: Some(Utc::now()),
        };

        let files = state.files.entry(id.clone()).or_default();
        let action = if files.iter().any(|existing| existing.slot == slot) {
            HistoryAction::ReuploadPdf
        } else {
            HistoryAction::UploadPdf
        };
        files.push(file.clone());

        state.history.entry(id.clone()).or_default().push(HistoryEntry {
            action,
            actor: Some(session.user.username),
            detail: Some(format!("slot {}: {file_name}", slot.number())),
            occurred_at: Some(Utc::now()),
        });
        Ok(file)
    }

    async fn delete_slot_file(
        &self,
        id: &CertificationId,
        file_id: &str,
    ) -> Result<(), ClientError> {
        let session = self.require_session().await?;
        let mut state = self.state.write().await;
        let files = state.files.get_mut(id).ok_or_else(|| not_found(id))?;
        let position = files
            .iter()
            .position(|file| file.id == file_id)
            .ok_or_else(|| ClientError::NotFound(format!("file `{file_id}`")))?;
        let removed = files.remove(position);

        state.history.entry(id.clone()).or_default().push(HistoryEntry {
            action: HistoryAction::Other("DELETE_PDF".to_string()),
            actor: Some(session.user.username),
            detail: Some(format!("slot {}: {}", removed.slot.number(), removed.file_name)),
            occurred_at: Some(Utc::now()),
        });
        Ok(())
    }

    async fn submit_report(&self, id: &CertificationId) -> Result<(), ClientError> {
        let session = self.require_session().await?;
        let mut state = self.state.write().await;
        let dated = state.records.get(id).ok_or_else(|| not_found(id))?.is_report_dated();
        if dated {
            return Err(rejected(409, "report already submitted"));
        }
        if let Some(reason) = unsatisfied_reason(&state, id) {
            return Err(rejected(422, reason));
        }

        if let Some(record) = state.records.get_mut(id) {
            record.report_actual_date = Some(Utc::now().date_naive());
        }
        state.history.entry(id.clone()).or_default().push(HistoryEntry {
            action: HistoryAction::SubmitReport,
            actor: Some(session.user.username),
            detail: None,
            occurred_at: Some(Utc::now()),
        });
        Ok(())
    }

    async fn resubmit_report(&self, id: &CertificationId) -> Result<(), ClientError> {
        let session = self.require_session().await?;
        let mut state = self.state.write().await;
        let dated = state.records.get(id).ok_or_else(|| not_found(id))?.is_report_dated();
        if dated {
            return Err(rejected(409, "report already submitted"));
        }
        let history = state.history.get(id).map(Vec::as_slice).unwrap_or_default();
        if !history.iter().any(|entry| entry.action.counts_toward_resubmission()) {
            return Err(rejected(409, "report was never submitted"));
        }
        if let Some(reason) = unsatisfied_reason(&state, id) {
            return Err(rejected(422, reason));
        }

        if let Some(record) = state.records.get_mut(id) {
            record.report_actual_date = Some(Utc::now().date_naive());
        }
        state.history.entry(id.clone()).or_default().push(HistoryEntry {
            action: HistoryAction::ResubmitReport,
            actor: Some(session.user.username),
            detail: None,
            occurred_at: Some(Utc::now()),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use certtrack_core::domain::{
        CertificationId, CertificationRecord, DocumentSlot, HistoryAction, MaterialClassId,
        PriceRequest,
    };
    use certtrack_core::session::SessionHandle;

    use super::InMemoryCertificationApi;
    use crate::api::CertificationApi;
    use crate::error::ClientError;

    async fn logged_in() -> InMemoryCertificationApi {
        let api = InMemoryCertificationApi::new(SessionHandle::new());
        api.add_user("qa", "pw").await;
        let mut record = CertificationRecord::new("CERT-1");
        record.material_class_id = Some(MaterialClassId(4));
        record.price_request = Some(PriceRequest::Processing);
        api.insert_record(record).await;
        api.login("qa", &SecretString::from("pw".to_string())).await.expect("login");
        api
    }

    #[tokio::test]
    async fn rejects_calls_without_session() {
        let api = InMemoryCertificationApi::new(SessionHandle::new());
        let error = api
            .fetch_certification(&CertificationId("CERT-1".to_string()))
            .await
            .expect_err("no session");
        assert!(matches!(error, ClientError::NotAuthenticated));
    }

    #[tokio::test]
    async fn wrong_password_does_not_create_session() {
        let api = InMemoryCertificationApi::new(SessionHandle::new());
        api.add_user("qa", "pw").await;
        let error =
            api.login("qa", &SecretString::from("nope".to_string())).await.expect_err("bad login");
        assert!(matches!(error, ClientError::InvalidCredentials));
        assert!(!api.session().is_active().await);
    }

    #[tokio::test]
    async fn second_upload_to_slot_is_recorded_as_reupload() {
        let api = logged_in().await;
        let id = CertificationId("CERT-1".to_string());
        let slot = DocumentSlot::InkProcessingReport;

        api.upload_slot_file(&id, slot, "ink-v1.pdf", b"%PDF-1".to_vec()).await.expect("upload");
        api.upload_slot_file(&id, slot, "ink-v2.pdf", b"%PDF-2".to_vec()).await.expect("reupload");

        let actions: Vec<HistoryAction> =
            api.history_for(&id).await.into_iter().map(|entry| entry.action).collect();
        assert_eq!(actions, vec![HistoryAction::UploadPdf, HistoryAction::ReuploadPdf]);
        assert_eq!(api.list_slot_files(&id, slot).await.expect("list").len(), 2);
    }

    #[tokio::test]
    async fn backend_refuses_submission_with_missing_slots() {
        let api = logged_in().await;
        let id = CertificationId("CERT-1".to_string());

        let error = api.submit_report(&id).await.expect_err("slot 8 missing");
        assert!(matches!(error, ClientError::Rejected { status: 422, .. }));

        api.upload_slot_file(&id, DocumentSlot::InkProcessingReport, "ink.pdf", b"%PDF".to_vec())
            .await
            .expect("upload");
        api.submit_report(&id).await.expect("submit");
        assert!(api.record(&id).await.expect("record").is_report_dated());

        let again = api.submit_report(&id).await.expect_err("already dated");
        assert!(matches!(again, ClientError::Rejected { status: 409, .. }));
    }

    #[tokio::test]
    async fn refresh_rotates_access_token() {
        let api = logged_in().await;
        let before = api.session().access_token().await.expect("token");
        api.refresh().await.expect("refresh");
        let after = api.session().access_token().await.expect("token");
        assert_ne!(before, after);

        api.logout().await.expect("logout");
        assert!(!api.session().is_active().await);
    }
}
