use std::sync::Arc;

use secrecy::SecretString;

use certtrack_client::{CertificationApi, ClientError, InMemoryCertificationApi, ProgressService};
use certtrack_core::domain::{
    CertificationId, CertificationRecord, DocumentSlot, MaterialClassId, PriceRequest, UlCertStatus,
};
use certtrack_core::session::SessionHandle;
use certtrack_core::workflow::WorkflowState;

fn cert() -> CertificationId {
    CertificationId("CERT-300".to_string())
}

async fn backend(record: CertificationRecord) -> Arc<InMemoryCertificationApi> {
    let api = InMemoryCertificationApi::new(SessionHandle::new());
    api.add_user("lan", "pw").await;
    api.insert_record(record).await;
    api.login("lan", &SecretString::from("pw".to_string())).await.expect("login");
    Arc::new(api)
}

fn rigid_processing(ul: Option<u32>) -> CertificationRecord {
    let mut record = CertificationRecord::new("CERT-300");
    record.material_class_id = Some(MaterialClassId(1));
    record.price_request = Some(PriceRequest::ProcessingAndReliability);
    record.ul_cert_status = ul.map(UlCertStatus);
    record
}

async fn upload_all(api: &InMemoryCertificationApi, slots: &[DocumentSlot]) {
    for slot in slots {
        api.upload_slot_file(&cert(), *slot, "doc.pdf", b"%PDF".to_vec()).await.expect("upload");
    }
}

#[tokio::test]
async fn unavailable_history_defers_resubmission_check_to_backend() {
    let api = backend(rigid_processing(Some(3))).await;
    upload_all(
        &api,
        &[
            DocumentSlot::ReliabilityReport,
            DocumentSlot::PlatingReport,
            DocumentSlot::LaminationReport,
            DocumentSlot::DrillingReport,
            DocumentSlot::SolderMaskReport,
        ],
    )
    .await;
    api.fail_history().await;
    let service = ProgressService::new(Arc::clone(&api), None);

    let progress = service.load(&cert()).await.expect("progress");
    assert!(progress.history_unavailable);
    assert!(progress.history.is_empty());
    assert!(!progress.evaluation.can_resubmit);
    assert!(progress.resubmit_allowed(), "unknown history never blocks");
    assert!(progress.is_degraded());
}

#[tokio::test]
async fn missing_record_is_an_error_not_an_empty_requirement_set() {
    let api = backend(rigid_processing(None)).await;
    let service = ProgressService::new(api, None);

    let error = service
        .load(&CertificationId("CERT-missing".to_string()))
        .await
        .expect_err("unknown record");
    assert!(matches!(error, ClientError::NotFound(_)));
}

#[tokio::test]
async fn removing_a_file_from_a_satisfied_slot_reverts_submittability() {
    let api = backend(rigid_processing(Some(1))).await;
    let required = [
        DocumentSlot::ReliabilityReport,
        DocumentSlot::PlatingReport,
        DocumentSlot::LaminationReport,
        DocumentSlot::DrillingReport,
        DocumentSlot::SolderMaskReport,
    ];
    upload_all(&api, &required).await;
    let service = ProgressService::new(Arc::clone(&api), None);

    let progress = service.load(&cert()).await.expect("progress");
    assert!(progress.evaluation.can_submit);
    assert_eq!(progress.evaluation.state, WorkflowState::Submittable);

    let drilling = progress
        .files
        .iter()
        .find(|file| file.slot == DocumentSlot::DrillingReport)
        .map(|file| file.id.clone())
        .expect("drilling file");
    let progress = service.delete_file(&cert(), &drilling).await.expect("delete");

    assert!(!progress.evaluation.all_satisfied);
    assert!(!progress.evaluation.can_submit);
    assert_eq!(progress.evaluation.missing.numbers(), vec![4]);
    assert_eq!(progress.evaluation.state, WorkflowState::NotSubmitted);
}

#[tokio::test]
async fn session_loss_surfaces_instead_of_failing_open() {
    let api = backend(rigid_processing(None)).await;
    api.logout().await.expect("logout");
    let service = ProgressService::new(api, None);

    let error = service.load(&cert()).await.expect_err("logged out");
    assert!(matches!(error, ClientError::NotAuthenticated));
}

#[tokio::test]
async fn progress_serializes_for_json_output() {
    let api = backend(rigid_processing(Some(9))).await;
    let service = ProgressService::new(api, None);

    let progress = service.load(&cert()).await.expect("progress");
    let value = serde_json::to_value(&progress).expect("json");

    assert_eq!(value["record"]["price_request"], "Gia công & Tin cậy");
    assert_eq!(value["evaluation"]["required"]["status"], "open");
    assert_eq!(
        value["evaluation"]["required"]["slots"],
        serde_json::json!([1, 2, 3, 4, 5, 6])
    );
    assert_eq!(value["evaluation"]["state"], "not_submitted");
}
