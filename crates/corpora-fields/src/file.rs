//! File and image fields.
//!
//! The stored value is a path relative to the content record's file store.
//! While editing, a freshly uploaded file is represented by its transfer id
//! until the record is saved and the server moves the upload into place.

use tracing::{debug, info, warn};

use corpora_client::{FileUploader, UploadReceipt};
use corpora_core::{Error, Result};

use crate::field_type::FormValue;

/// Check that `raw` is a relative path that stays inside the file store.
/// Returns the path without a leading `./`.
pub fn validate_relative_path(raw: &str) -> Result<String> {
    let path = raw.trim();
    let path = path.strip_prefix("./").unwrap_or(path);
    if path.is_empty() {
        return Err(Error::Validation("file path is empty".into()));
    }
    if path.starts_with('/') || path.contains('\\') || path.contains("://") {
        return Err(Error::Validation(format!(
            "file path must be relative to the content's files: {}",
            path
        )));
    }
    if path.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
        return Err(Error::Validation(format!("invalid file path: {}", path)));
    }
    Ok(path.to_string())
}

/// Last segment of a path or URL, without query string.
pub fn file_name(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("upload")
}

/// Editor state for one file field.
pub struct FileEditor {
    uploader: FileUploader,
    stored: Option<String>,
    pending: Option<UploadReceipt>,
}

impl FileEditor {
    /// Editor for a field currently holding `stored` (if any).
    pub fn new(uploader: FileUploader, stored: Option<String>) -> Self {
        Self {
            uploader,
            stored: stored.filter(|s| !s.trim().is_empty()),
            pending: None,
        }
    }

    pub fn stored_path(&self) -> Option<&str> {
        self.stored.as_deref()
    }

    pub fn pending(&self) -> Option<&UploadReceipt> {
        self.pending.as_ref()
    }

    /// Name shown next to the control.
    pub fn display_name(&self) -> Option<&str> {
        self.stored.as_deref().map(file_name)
    }

    /// Upload a replacement file. A previous unsaved upload is reverted first.
    pub async fn upload(&mut self, name: &str, data: &[u8]) -> Result<&UploadReceipt> {
        if data.is_empty() {
            return Err(Error::InvalidInput(format!("{} is empty", name)));
        }
        self.discard_pending().await;
        let receipt = self.uploader.upload(name, data).await?;
        info!(transfer_id = %receipt.transfer_id, name, bytes = receipt.bytes_sent, "File staged");
        Ok(self.pending.insert(receipt))
    }

    /// Have the server fetch `url`, then stage it like a local upload.
    pub async fn upload_remote(&mut self, url: &str) -> Result<&UploadReceipt> {
        let data = self.uploader.fetch_remote(url).await?;
        debug!(url, bytes = data.len(), "Fetched remote file");
        let name = file_name(url).to_string();
        self.upload(&name, &data).await
    }

    /// Clear the field, reverting any unsaved upload.
    pub async fn remove(&mut self) -> Result<()> {
        if let Some(receipt) = self.pending.take() {
            self.uploader.revert(&receipt.transfer_id).await?;
        }
        self.stored = None;
        Ok(())
    }

    /// Value submitted with the record: the pending transfer id, else the
    /// stored path.
    pub fn form_value(&self) -> FormValue {
        match (&self.pending, &self.stored) {
            (Some(receipt), _) => FormValue::Text(receipt.transfer_id.clone()),
            (None, Some(path)) => FormValue::Text(path.clone()),
            (None, None) => FormValue::empty(),
        }
    }

    async fn discard_pending(&mut self) {
        if let Some(old) = self.pending.take() {
            if let Err(e) = self.uploader.revert(&old.transfer_id).await {
                warn!(transfer_id = %old.transfer_id, error = %e, "Revert of replaced upload failed");
            }
        }
    }
}
