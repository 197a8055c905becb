//! reqwest implementation of [`CorporaApi`].

use std::time::Instant;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, info, instrument, warn};

use corpora_core::{
    BulkActionRequest, ClientConfig, ContentRecord, ContentUri, ContentView, ContentViewAction,
    ContentViewRequest, CorporaApi, Error, Job, JobSubmission, Jobsite, ListPage,
    NetworkNeighborhood, NetworkQuery, Result, Task,
};

/// HTTP client for the Corpora REST API.
#[derive(Clone)]
pub struct HttpCorporaApi {
    client: Client,
    config: ClientConfig,
}

impl HttpCorporaApi {
    /// Create a client from validated configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            base_url = %config.base_url,
            authenticated = config.token.is_some(),
            "Initializing Corpora API client"
        );

        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn http(&self) -> &Client {
        &self.client
    }

    /// Absolute URL for an API path (`path` starts with `/`).
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    pub(crate) fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.config.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<T> {
        let start = Instant::now();
        let response = self
            .authorize(self.client.get(self.url(path)).query(params))
            .send()
            .await?;
        let response = check_response(response).await?;
        let body = response.json().await?;
        debug!(
            path,
            duration_ms = start.elapsed().as_millis() as u64,
            "GET complete"
        );
        Ok(body)
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .authorize(self.client.post(self.url(path)).json(body))
            .send()
            .await?;
        let response = check_response(response).await?;
        Ok(response.json().await?)
    }

    /// GET an absolute URL outside the API (IIIF info documents, link
    /// previews) and decode JSON. No credentials are attached.
    pub async fn fetch_external_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.client.get(url).send().await?;
        let response = check_response(response).await?;
        Ok(response.json().await?)
    }

    /// GET an absolute URL outside the API and return the body text.
    pub async fn fetch_external_text(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let response = check_response(response).await?;
        Ok(response.text().await?)
    }
}

/// Turn non-success statuses into typed errors, keeping the body text as
/// the message so validation details reach the caller.
pub(crate) async fn check_response(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!(status = status.as_u16(), body_len = body.len(), "API request failed");
    Err(Error::from_status(status.as_u16(), body))
}

fn content_path(corpus_id: &str, content_type: &str) -> String {
    format!(
        "/api/corpus/{}/{}/",
        urlencoding::encode(corpus_id),
        urlencoding::encode(content_type)
    )
}

fn record_path(uri: &ContentUri) -> String {
    format!(
        "{}{}/",
        content_path(&uri.corpus_id, &uri.content_type),
        urlencoding::encode(&uri.content_id)
    )
}

#[async_trait]
impl CorporaApi for HttpCorporaApi {
    #[instrument(skip(self, params), fields(subsystem = "client", op = "list_content"))]
    async fn list_content(
        &self,
        corpus_id: &str,
        content_type: &str,
        params: &[(String, String)],
    ) -> Result<ListPage<ContentRecord>> {
        self.get_json(&content_path(corpus_id, content_type), params)
            .await
    }

    #[instrument(skip(self, uri), fields(subsystem = "client", op = "get_content", uri = %uri))]
    async fn get_content(&self, uri: &ContentUri) -> Result<ContentRecord> {
        self.get_json(&record_path(uri), &[]).await
    }

    #[instrument(skip(self, fields), fields(subsystem = "client", op = "create_content"))]
    async fn create_content(
        &self,
        corpus_id: &str,
        content_type: &str,
        fields: &Map<String, JsonValue>,
    ) -> Result<ContentRecord> {
        self.post_json(&content_path(corpus_id, content_type), fields)
            .await
    }

    #[instrument(skip(self, uri, query), fields(subsystem = "client", op = "network_json", uri = %uri))]
    async fn network_json(
        &self,
        uri: &ContentUri,
        query: &NetworkQuery,
    ) -> Result<NetworkNeighborhood> {
        let path = format!("{}network-json/", record_path(uri));
        self.get_json(&path, &query.to_query_pairs()).await
    }

    #[instrument(skip(self, request), fields(subsystem = "client", op = "content_view"))]
    async fn content_view(
        &self,
        corpus_id: &str,
        request: &ContentViewRequest,
    ) -> Result<Option<ContentView>> {
        let path = format!("/api/corpus/{}/content-view/", urlencoding::encode(corpus_id));
        if request.action == ContentViewAction::Delete {
            let response = self
                .authorize(self.client.post(self.url(&path)).json(request))
                .send()
                .await?;
            check_response(response).await?;
            return Ok(None);
        }
        self.post_json(&path, request).await.map(Some)
    }

    #[instrument(skip(self, request), fields(subsystem = "client", op = "bulk_action"))]
    async fn bulk_action(
        &self,
        corpus_id: &str,
        content_type: &str,
        request: &BulkActionRequest,
    ) -> Result<()> {
        let path = format!("{}bulk-action/", content_path(corpus_id, content_type));
        let response = self
            .authorize(self.client.post(self.url(&path)).json(request))
            .send()
            .await?;
        check_response(response).await?;
        Ok(())
    }

    async fn list_jobsites(&self) -> Result<Vec<Jobsite>> {
        self.get_json("/api/jobsites/", &[]).await
    }

    async fn list_tasks(&self) -> Result<Vec<Task>> {
        self.get_json("/api/tasks/", &[]).await
    }

    #[instrument(skip(self), fields(subsystem = "client", op = "get_job"))]
    async fn get_job(&self, job_id: &str) -> Result<Job> {
        self.get_json(&format!("/api/jobs/{}/", urlencoding::encode(job_id)), &[])
            .await
    }

    async fn list_content_jobs(&self, uri: &ContentUri) -> Result<Vec<Job>> {
        let path = format!(
            "/api/jobs/corpus/{}/{}/{}/",
            urlencoding::encode(&uri.corpus_id),
            urlencoding::encode(&uri.content_type),
            urlencoding::encode(&uri.content_id)
        );
        self.get_json(&path, &[]).await
    }

    #[instrument(skip(self, submission), fields(subsystem = "client", op = "submit_job", task_id = %submission.task_id))]
    async fn submit_job(&self, submission: &JobSubmission) -> Result<Job> {
        self.post_json("/api/jobs/submit/", submission).await
    }

    #[instrument(skip(self), fields(subsystem = "client", op = "retry_job"))]
    async fn retry_job(&self, job_id: &str) -> Result<Job> {
        let path = format!("/api/jobs/{}/retry/", urlencoding::encode(job_id));
        self.post_json(&path, &serde_json::json!({})).await
    }
}
