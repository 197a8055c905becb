//! Trait definitions at the seam between view logic and the REST API.

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, warn};

use crate::defaults;
use crate::models::*;
use crate::{Error, Result};

/// Query parameters rendered as ordered key/value pairs.
pub type QueryPairs = Vec<(String, String)>;

/// Every REST operation the client components need.
///
/// Implemented over HTTP by `corpora-client` and in memory by
/// [`crate::mock::MockCorporaApi`] for tests.
#[async_trait]
pub trait CorporaApi: Send + Sync {
    /// `GET /api/corpus/{id}/{content_type}/` with search/sort/page params.
    async fn list_content(
        &self,
        corpus_id: &str,
        content_type: &str,
        params: &[(String, String)],
    ) -> Result<ListPage<ContentRecord>>;

    /// `GET /api/corpus/{id}/{content_type}/{content_id}/`.
    async fn get_content(&self, uri: &ContentUri) -> Result<ContentRecord>;

    /// `POST /api/corpus/{id}/{content_type}/`.
    async fn create_content(
        &self,
        corpus_id: &str,
        content_type: &str,
        fields: &Map<String, JsonValue>,
    ) -> Result<ContentRecord>;

    /// `GET /api/corpus/{id}/{content_type}/{content_id}/network-json/`.
    async fn network_json(
        &self,
        uri: &ContentUri,
        query: &NetworkQuery,
    ) -> Result<NetworkNeighborhood>;

    /// `POST /api/corpus/{id}/content-view/`. Delete returns `None`.
    async fn content_view(
        &self,
        corpus_id: &str,
        request: &ContentViewRequest,
    ) -> Result<Option<ContentView>>;

    /// `POST /api/corpus/{id}/{content_type}/bulk-action/`.
    async fn bulk_action(
        &self,
        corpus_id: &str,
        content_type: &str,
        request: &BulkActionRequest,
    ) -> Result<()>;

    /// `GET /api/jobsites/`.
    async fn list_jobsites(&self) -> Result<Vec<Jobsite>>;

    /// `GET /api/tasks/`.
    async fn list_tasks(&self) -> Result<Vec<Task>>;

    /// `GET /api/jobs/{job_id}/`.
    async fn get_job(&self, job_id: &str) -> Result<Job>;

    /// `GET /api/jobs/corpus/{id}/{content_type}/{content_id}/`.
    async fn list_content_jobs(&self, uri: &ContentUri) -> Result<Vec<Job>>;

    /// `POST /api/jobs/submit/`.
    async fn submit_job(&self, submission: &JobSubmission) -> Result<Job>;

    /// `POST /api/jobs/{job_id}/retry/`.
    async fn retry_job(&self, job_id: &str) -> Result<Job>;

    /// List every record matching `params`, following `has_next_page`.
    ///
    /// Uses `page-token` when the backend returns one (cursor pagination),
    /// otherwise increments `page`. Fails rather than return a partial
    /// listing when more than [`defaults::SPOOL_MAX_PAGES`] pages remain.
    async fn spool_content(
        &self,
        corpus_id: &str,
        content_type: &str,
        params: &[(String, String)],
    ) -> Result<Vec<ContentRecord>> {
        self.spool_content_pages(corpus_id, content_type, params, defaults::SPOOL_MAX_PAGES)
            .await
    }

    /// [`CorporaApi::spool_content`] with an explicit page cap.
    async fn spool_content_pages(
        &self,
        corpus_id: &str,
        content_type: &str,
        params: &[(String, String)],
        max_pages: usize,
    ) -> Result<Vec<ContentRecord>> {
        let base: QueryPairs = params
            .iter()
            .filter(|(k, _)| k != "page" && k != "page-token")
            .cloned()
            .collect();

        let mut records = Vec::new();
        let mut page: u32 = 1;
        let mut token: Option<String> = None;

        for _ in 0..max_pages {
            let mut pairs = base.clone();
            match &token {
                Some(t) => pairs.push(("page-token".to_string(), t.clone())),
                None => pairs.push(("page".to_string(), page.to_string())),
            }

            let result = self.list_content(corpus_id, content_type, &pairs).await?;
            debug!(
                corpus_id,
                content_type,
                page,
                count = result.records.len(),
                "Spooled page"
            );
            records.extend(result.records);

            if !result.meta.has_next_page {
                return Ok(records);
            }
            token = result.meta.next_page_token;
            page += 1;
        }

        warn!(
            corpus_id,
            content_type,
            max_pages,
            spooled = records.len(),
            "Spool hit page cap"
        );
        Err(Error::InvalidInput(format!(
            "{} listing has more than {} pages; narrow the query",
            content_type, max_pages
        )))
    }
}
