use async_trait::async_trait;
use secrecy::SecretString;

use certtrack_core::domain::{
    CertificationId, CertificationRecord, DocumentSlot, HistoryEntry, SlotFile,
};
use certtrack_core::session::SessionContext;

use crate::error::ClientError;

/// Operations the certification backend exposes to this client.
///
/// The backend owns persistence and is the final authority on every business
/// rule; implementations only move data.
#[async_trait]
pub trait CertificationApi: Send + Sync {
    async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<SessionContext, ClientError>;

    async fn refresh(&self) -> Result<SessionContext, ClientError>;

    async fn logout(&self) -> Result<(), ClientError>;

    async fn fetch_certification(
        &self,
        id: &CertificationId,
    ) -> Result<CertificationRecord, ClientError>;

    async fn list_slot_files(
        &self,
        id: &CertificationId,
        slot: DocumentSlot,
    ) -> Result<Vec<SlotFile>, ClientError>;

    async fn fetch_history(&self, id: &CertificationId) -> Result<Vec<HistoryEntry>, ClientError>;

    async fn upload_slot_file(
        &self,
        id: &CertificationId,
        slot: DocumentSlot,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<SlotFile, ClientError>;

    async fn delete_slot_file(&self, id: &CertificationId, file_id: &str)
        -> Result<(), ClientError>;

    async fn submit_report(&self, id: &CertificationId) -> Result<(), ClientError>;

    async fn resubmit_report(&self, id: &CertificationId) -> Result<(), ClientError>;
}
