//! Chunked file upload protocol used by file fields.
//!
//! 1. `POST /fp/process/` with `Upload-Length` announces a transfer and
//!    returns its id as plain text.
//! 2. `PATCH /fp/patch/{id}` sends each chunk with `Upload-Offset`,
//!    `Upload-Length` and `Upload-Name`.
//! 3. `DELETE /fp/revert/` with the id as body cancels a transfer.
//! 4. `GET /fp/fetch/?target={url}` asks the server to pull a remote file.

use tracing::{debug, info, instrument};

use corpora_core::{Error, Result};

use crate::http::{check_response, HttpCorporaApi};

/// Outcome of a completed upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    /// Server transfer id; the file field stores this until the content is saved.
    pub transfer_id: String,
    pub bytes_sent: usize,
    pub chunks: usize,
}

/// Client side of the chunked upload protocol.
pub struct FileUploader {
    api: HttpCorporaApi,
    chunk_size: usize,
}

impl FileUploader {
    /// Create an uploader using the configured chunk size.
    pub fn new(api: HttpCorporaApi) -> Self {
        let chunk_size = api.config().upload_chunk_size;
        Self { api, chunk_size }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Upload `data` as `name`.
    pub async fn upload(&self, name: &str, data: &[u8]) -> Result<UploadReceipt> {
        self.upload_with_progress(name, data, |_, _| {}).await
    }

    /// Upload `data` as `name`, reporting `(bytes_sent, total)` after each chunk.
    #[instrument(skip(self, data, progress), fields(subsystem = "client", op = "upload", size = data.len()))]
    pub async fn upload_with_progress<F>(
        &self,
        name: &str,
        data: &[u8],
        progress: F,
    ) -> Result<UploadReceipt>
    where
        F: Fn(usize, usize) + Send + Sync,
    {
        if name.is_empty() {
            return Err(Error::InvalidInput("upload name cannot be empty".into()));
        }

        let total = data.len();
        let response = self
            .api
            .authorize(
                self.api
                    .http()
                    .post(self.api.url("/fp/process/"))
                    .header("Upload-Length", total.to_string()),
            )
            .send()
            .await?;
        let transfer_id = check_response(response).await?.text().await?.trim().to_string();
        if transfer_id.is_empty() {
            return Err(Error::Validation(
                "server returned an empty transfer id".into(),
            ));
        }
        debug!(%transfer_id, total, "Upload transfer opened");

        let mut offset = 0;
        let mut chunks = 0;
        for chunk in data.chunks(self.chunk_size) {
            let response = self
                .api
                .authorize(
                    self.api
                        .http()
                        .patch(self.api.url(&format!(
                            "/fp/patch/{}",
                            urlencoding::encode(&transfer_id)
                        )))
                        .header("Content-Type", "application/offset+octet-stream")
                        .header("Upload-Offset", offset.to_string())
                        .header("Upload-Length", total.to_string())
                        .header("Upload-Name", name)
                        .body(chunk.to_vec()),
                )
                .send()
                .await?;
            check_response(response).await?;

            offset += chunk.len();
            chunks += 1;
            progress(offset, total);
        }

        info!(%transfer_id, chunks, bytes = offset, "Upload complete");
        Ok(UploadReceipt {
            transfer_id,
            bytes_sent: offset,
            chunks,
        })
    }

    /// Cancel a transfer the user removed before saving.
    pub async fn revert(&self, transfer_id: &str) -> Result<()> {
        let response = self
            .api
            .authorize(
                self.api
                    .http()
                    .delete(self.api.url("/fp/revert/"))
                    .body(transfer_id.to_string()),
            )
            .send()
            .await?;
        check_response(response).await?;
        debug!(transfer_id, "Upload reverted");
        Ok(())
    }

    /// Ask the server to fetch a remote file; returns the fetched bytes.
    pub async fn fetch_remote(&self, target: &str) -> Result<Vec<u8>> {
        let response = self
            .api
            .authorize(
                self.api
                    .http()
                    .get(self.api.url("/fp/fetch/"))
                    .query(&[("target", target)]),
            )
            .send()
            .await?;
        let bytes = check_response(response).await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}
