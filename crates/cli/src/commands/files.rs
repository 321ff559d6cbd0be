use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use certtrack_client::{CertificationApi, ProgressService};
use certtrack_core::config::LoadOptions;
use certtrack_core::domain::{CertificationId, DocumentSlot};

use crate::commands::progress::summarize;
use crate::commands::{backend, CommandResult};

const UPLOAD: &str = "upload";
const DELETE: &str = "delete-file";

/// A validated upload read from disk.
#[derive(Debug)]
pub struct UploadFile {
    pub slot: DocumentSlot,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

pub fn read_upload(slot: u8, path: &Path) -> anyhow::Result<UploadFile> {
    let slot = DocumentSlot::from_number(slot)?;
    let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
        bail!("`{}` does not name a file", path.display());
    };
    let bytes = fs::read(path).with_context(|| format!("could not read `{}`", path.display()))?;
    if bytes.is_empty() {
        bail!("`{}` is empty", path.display());
    }
    Ok(UploadFile { slot, file_name: file_name.to_string(), bytes })
}

pub fn run_upload(options: LoadOptions, id: &str, slot: u8, path: &Path) -> CommandResult {
    let upload = match read_upload(slot, path) {
        Ok(upload) => upload,
        Err(error) => return CommandResult::invalid_input(UPLOAD, format!("{error:#}")),
    };
    backend::run_with_service(UPLOAD, options, |service, correlation_id| async move {
        execute_upload(&service, id, upload, &correlation_id).await
    })
}

pub async fn execute_upload<A>(
    service: &ProgressService<A>,
    id: &str,
    upload: UploadFile,
    correlation_id: &str,
) -> CommandResult
where
    A: CertificationApi + 'static,
{
    let id = CertificationId(id.to_string());
    match service.upload(&id, upload.slot, &upload.file_name, upload.bytes).await {
        Ok(progress) => CommandResult::success_with(UPLOAD, summarize(&progress), &progress),
        Err(error) => CommandResult::client_failure(UPLOAD, error, correlation_id),
    }
}

pub fn run_delete(options: LoadOptions, id: &str, file_id: &str) -> CommandResult {
    backend::run_with_service(DELETE, options, |service, correlation_id| async move {
        execute_delete(&service, id, file_id, &correlation_id).await
    })
}

pub async fn execute_delete<A>(
    service: &ProgressService<A>,
    id: &str,
    file_id: &str,
    correlation_id: &str,
) -> CommandResult
where
    A: CertificationApi + 'static,
{
    let id = CertificationId(id.to_string());
    match service.delete_file(&id, file_id).await {
        Ok(progress) => CommandResult::success_with(DELETE, summarize(&progress), &progress),
        Err(error) => CommandResult::client_failure(DELETE, error, correlation_id),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::Path;

    use certtrack_core::domain::DocumentSlot;

    use super::read_upload;

    #[test]
    fn reads_upload_and_rejects_bad_slot_or_empty_file() {
        let mut file = tempfile::Builder::new().suffix(".pdf").tempfile().expect("temp file");
        file.write_all(b"%PDF-1.7").expect("write");

        let upload = read_upload(8, file.path()).expect("upload");
        assert_eq!(upload.slot, DocumentSlot::InkProcessingReport);
        assert!(upload.file_name.ends_with(".pdf"));
        assert_eq!(upload.bytes.len(), 8);

        let bad_slot = read_upload(9, file.path()).expect_err("slot 9");
        assert!(bad_slot.to_string().contains("unknown document slot"));

        let empty = tempfile::NamedTempFile::new().expect("temp file");
        assert!(read_upload(1, empty.path()).expect_err("empty").to_string().contains("is empty"));
        assert!(read_upload(1, Path::new("/nonexistent/report.pdf")).is_err());
    }
}
