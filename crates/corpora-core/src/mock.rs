//! In-memory [`CorporaApi`] for deterministic testing.
//!
//! Holds a single corpus worth of content records, undirected relationships
//! between them, content views and jobs, and answers every API operation
//! the way the server does: per-type paging of network neighborhoods,
//! hidden types, collapsed relationships, view filters, list search/sort.
//!
//! ```rust
//! use corpora_core::mock::MockCorporaApi;
//!
//! let api = MockCorporaApi::new("42")
//!     .with_record("Book", "7", "Emma")
//!     .with_record("Chapter", "1", "Chapter One")
//!     .with_link("Book", "7", "Chapter", "1", "chapters");
//! assert_eq!(api.record_count("Chapter"), 1);
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};

use crate::models::*;
use crate::traits::CorporaApi;
use crate::{Error, Result};

/// One recorded API call.
#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    pub operation: &'static str,
    pub target: String,
    pub params: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
struct MockLink {
    from: ContentUri,
    to: ContentUri,
    title: String,
}

#[derive(Default)]
struct MockState {
    records: BTreeMap<String, BTreeMap<String, ContentRecord>>,
    links: Vec<MockLink>,
    views: HashMap<String, (String, BTreeSet<String>)>,
    jobs: BTreeMap<String, Job>,
    jobsites: Vec<Jobsite>,
    tasks: Vec<Task>,
    failing_uris: HashSet<String>,
    list_delays: HashMap<u32, Duration>,
    network_delay: Option<Duration>,
    job_delay: Option<Duration>,
    cursor_pagination: bool,
    next_id: u64,
}

/// In-memory fake of the Corpora REST API.
pub struct MockCorporaApi {
    corpus_id: String,
    state: Mutex<MockState>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockCorporaApi {
    pub fn new(corpus_id: impl Into<String>) -> Self {
        Self {
            corpus_id: corpus_id.into(),
            state: Mutex::new(MockState::default()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn corpus_id(&self) -> &str {
        &self.corpus_id
    }

    pub fn uri(&self, content_type: &str, content_id: &str) -> ContentUri {
        ContentUri::new(&self.corpus_id, content_type, content_id)
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn log(&self, operation: &'static str, target: String, params: &[(String, String)]) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(MockCall {
                operation,
                target,
                params: params.to_vec(),
            });
    }

    // ------------------------------------------------------------------
    // Builders
    // ------------------------------------------------------------------

    /// Add a content record.
    pub fn with_record(self, content_type: &str, content_id: &str, label: &str) -> Self {
        self.insert_record(content_type, content_id, label, Map::new());
        self
    }

    /// Add a content record with extra field values.
    pub fn with_record_fields(
        self,
        content_type: &str,
        content_id: &str,
        label: &str,
        fields: Map<String, JsonValue>,
    ) -> Self {
        self.insert_record(content_type, content_id, label, fields);
        self
    }

    /// Add an undirected relationship; `title` names the traversed field.
    pub fn with_link(
        self,
        from_ct: &str,
        from_id: &str,
        to_ct: &str,
        to_id: &str,
        title: &str,
    ) -> Self {
        self.add_link(from_ct, from_id, to_ct, to_id, title);
        self
    }

    /// Add a content view whose members are `ids` of `content_type`.
    pub fn with_view(self, view_id: &str, content_type: &str, ids: &[&str]) -> Self {
        self.state().views.insert(
            view_id.to_string(),
            (
                content_type.to_string(),
                ids.iter().map(|s| s.to_string()).collect(),
            ),
        );
        self
    }

    pub fn with_job(self, job: Job) -> Self {
        self.state().jobs.insert(job.id.clone(), job);
        self
    }

    pub fn with_jobsite(self, jobsite: Jobsite) -> Self {
        self.state().jobsites.push(jobsite);
        self
    }

    pub fn with_task(self, task: Task) -> Self {
        self.state().tasks.push(task);
        self
    }

    /// Return page tokens instead of relying on page numbers.
    pub fn with_cursor_pagination(self) -> Self {
        self.state().cursor_pagination = true;
        self
    }

    /// Delay responses for one list page.
    pub fn with_list_delay(self, page: u32, delay: Duration) -> Self {
        self.state().list_delays.insert(page, delay);
        self
    }

    /// Delay every network-json response.
    pub fn with_network_delay(self, delay: Duration) -> Self {
        self.state().network_delay = Some(delay);
        self
    }

    /// Delay every single-job fetch.
    pub fn with_job_delay(self, delay: Duration) -> Self {
        self.state().job_delay = Some(delay);
        self
    }

    // ------------------------------------------------------------------
    // Mutation after construction
    // ------------------------------------------------------------------

    pub fn insert_record(
        &self,
        content_type: &str,
        content_id: &str,
        label: &str,
        fields: Map<String, JsonValue>,
    ) {
        let uri = self.uri(content_type, content_id);
        let record = ContentRecord {
            id: content_id.to_string(),
            uri: uri.to_string(),
            label: label.to_string(),
            content_type: content_type.to_string(),
            provenance: Vec::new(),
            fields,
        };
        self.state()
            .records
            .entry(content_type.to_string())
            .or_default()
            .insert(content_id.to_string(), record);
    }

    pub fn add_link(&self, from_ct: &str, from_id: &str, to_ct: &str, to_id: &str, title: &str) {
        let link = MockLink {
            from: self.uri(from_ct, from_id),
            to: self.uri(to_ct, to_id),
            title: title.to_string(),
        };
        self.state().links.push(link);
    }

    /// Make network-json requests for `uri` fail with a network error.
    pub fn fail_network_for(&self, uri: &ContentUri) {
        self.state().failing_uris.insert(uri.to_string());
    }

    /// Finish a job server-side: set its status and record provenance on
    /// the parent content.
    pub fn finish_job(&self, job_id: &str, status: JobStatus, report: &str) -> Result<()> {
        let mut state = self.state();
        let job = state
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| Error::NotFound(format!("job {}", job_id)))?;
        job.status = status;
        job.percent_complete = 100;
        job.report = Some(report.to_string());
        let job = job.clone();

        let provenance = JobProvenance {
            job_id: job.id.clone(),
            task_name: job.task_name.clone(),
            jobsite_name: job.jobsite_name.clone(),
            scholar_name: job.scholar_name.clone(),
            status,
            parameters: job.parameters.clone(),
            report: job.report.clone(),
            submitted: job.submitted_time,
            completed: Some(chrono::Utc::now()),
        };
        let record = state
            .records
            .get_mut(&job.content_type)
            .and_then(|r| r.get_mut(&job.content_id))
            .ok_or_else(|| Error::NotFound(job.content_uri().to_string()))?;
        record.provenance.push(provenance);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    pub fn record_count(&self, content_type: &str) -> usize {
        self.state()
            .records
            .get(content_type)
            .map(|r| r.len())
            .unwrap_or(0)
    }

    // ------------------------------------------------------------------
    // Network neighborhood emulation
    // ------------------------------------------------------------------

    fn label_of(state: &MockState, uri: &ContentUri) -> String {
        state
            .records
            .get(&uri.content_type)
            .and_then(|r| r.get(&uri.content_id))
            .map(|r| r.label.clone())
            .unwrap_or_else(|| uri.content_id.clone())
    }

    /// Direct neighbors of `uri` as (neighbor, edge from, edge to, title).
    fn direct_neighbors(state: &MockState, uri: &ContentUri) -> Vec<(ContentUri, NetworkEdge)> {
        state
            .links
            .iter()
            .filter_map(|link| {
                let other = if &link.from == uri {
                    link.to.clone()
                } else if &link.to == uri {
                    link.from.clone()
                } else {
                    return None;
                };
                Some((
                    other,
                    NetworkEdge {
                        from: link.from.to_string(),
                        to: link.to.to_string(),
                        title: link.title.clone(),
                        freq: 1.0,
                    },
                ))
            })
            .collect()
    }

    /// Neighbors after applying collapses, hidden types, view filters and
    /// the target type, grouped by content type and sorted by id.
    fn visible_neighbors(
        state: &MockState,
        uri: &ContentUri,
        query: &NetworkQuery,
    ) -> BTreeMap<String, Vec<(ContentUri, NetworkEdge)>> {
        let mut neighbors = Self::direct_neighbors(state, uri);

        for collapse in &query.collapses {
            let (far_ct, reversed) = if uri.content_type == collapse.from_ct {
                (&collapse.to_ct, false)
            } else if uri.content_type == collapse.to_ct {
                (&collapse.from_ct, true)
            } else {
                continue;
            };

            let proxies: Vec<ContentUri> = neighbors
                .iter()
                .filter(|(n, _)| n.content_type == collapse.proxy_ct)
                .map(|(n, _)| n.clone())
                .collect();
            neighbors.retain(|(n, _)| n.content_type != collapse.proxy_ct);

            let mut weights: BTreeMap<ContentUri, f64> = BTreeMap::new();
            for proxy in &proxies {
                for (far, _) in Self::direct_neighbors(state, proxy) {
                    if &far.content_type == far_ct && &far != uri {
                        *weights.entry(far).or_insert(0.0) += 1.0;
                    }
                }
            }

            for (far, freq) in weights {
                let (title, from, to) = if reversed {
                    (collapse.reverse_wire(), uri.to_string(), far.to_string())
                } else {
                    (collapse.wire(), uri.to_string(), far.to_string())
                };
                neighbors.push((
                    far,
                    NetworkEdge {
                        from,
                        to,
                        title,
                        freq,
                    },
                ));
            }
        }

        let mut grouped: BTreeMap<String, Vec<(ContentUri, NetworkEdge)>> = BTreeMap::new();
        let mut seen: HashSet<ContentUri> = HashSet::new();
        for (neighbor, edge) in neighbors {
            let ct = neighbor.content_type.clone();
            if query.hidden.contains(&ct) {
                continue;
            }
            if let Some(target) = &query.target_ct {
                if &ct != target {
                    continue;
                }
            }
            if let Some(view_id) = query.filters.get(&ct) {
                let allowed = state
                    .views
                    .get(view_id)
                    .map(|(_, ids)| ids.contains(&neighbor.content_id))
                    .unwrap_or(false);
                if !allowed {
                    continue;
                }
            }
            if !seen.insert(neighbor.clone()) {
                continue;
            }
            grouped.entry(ct).or_default().push((neighbor, edge));
        }
        for list in grouped.values_mut() {
            list.sort_by(|a, b| a.0.content_id.cmp(&b.0.content_id));
        }
        grouped
    }

    fn record_matches(record: &ContentRecord, params: &[(String, String)]) -> bool {
        params.iter().all(|(key, value)| {
            if key == "q" {
                return record.label.to_lowercase().contains(&value.to_lowercase());
            }
            if let Some(field) = key.strip_prefix("f_") {
                return match record.fields.get(field) {
                    Some(JsonValue::String(s)) => s == value,
                    Some(other) => other.to_string() == *value,
                    None => false,
                };
            }
            true
        })
    }
}

fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

#[async_trait]
impl CorporaApi for MockCorporaApi {
    async fn list_content(
        &self,
        corpus_id: &str,
        content_type: &str,
        params: &[(String, String)],
    ) -> Result<ListPage<ContentRecord>> {
        self.log("list_content", format!("{}/{}", corpus_id, content_type), params);

        let page: u32 = match (param(params, "page-token"), param(params, "page")) {
            (Some(token), _) => token
                .strip_prefix("tok-")
                .and_then(|n| n.parse().ok())
                .ok_or_else(|| Error::Validation(format!("bad page token {}", token)))?,
            (None, Some(p)) => p
                .parse()
                .map_err(|_| Error::Validation(format!("bad page {}", p)))?,
            (None, None) => 1,
        }
        .max(1);
        let page_size: u32 = param(params, "page-size")
            .and_then(|s| s.parse().ok())
            .unwrap_or(crate::defaults::PAGE_SIZE)
            .max(1);

        let (delay, result) = {
            let state = self.state();
            let view_members = param(params, "content_view")
                .and_then(|v| state.views.get(v))
                .map(|(_, ids)| ids.clone());

            let mut matching: Vec<ContentRecord> = state
                .records
                .get(content_type)
                .map(|r| r.values().cloned().collect())
                .unwrap_or_default();
            matching.retain(|r| Self::record_matches(r, params));
            if let Some(members) = view_members {
                matching.retain(|r| members.contains(&r.id));
            }

            if let Some((key, dir)) = params.iter().find(|(k, _)| k.starts_with("s_")) {
                let field = &key[2..];
                matching.sort_by(|a, b| {
                    let ka = if field == "label" {
                        a.label.clone()
                    } else {
                        a.fields.get(field).map(|v| v.to_string()).unwrap_or_default()
                    };
                    let kb = if field == "label" {
                        b.label.clone()
                    } else {
                        b.fields.get(field).map(|v| v.to_string()).unwrap_or_default()
                    };
                    ka.cmp(&kb)
                });
                if dir == "desc" {
                    matching.reverse();
                }
            }

            let total = matching.len() as u64;
            let num_pages = ((total as f64) / page_size as f64).ceil() as u32;
            let start = ((page - 1) * page_size) as usize;
            let records: Vec<ContentRecord> = matching
                .into_iter()
                .skip(start)
                .take(page_size as usize)
                .collect();
            let has_next_page = page < num_pages;
            let next_page_token = if state.cursor_pagination && has_next_page {
                Some(format!("tok-{}", page + 1))
            } else {
                None
            };

            (
                state.list_delays.get(&page).copied(),
                ListPage {
                    meta: PageMeta {
                        total,
                        page,
                        page_size,
                        num_pages,
                        has_next_page,
                        next_page_token,
                    },
                    records,
                },
            )
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(result)
    }

    async fn get_content(&self, uri: &ContentUri) -> Result<ContentRecord> {
        self.log("get_content", uri.to_string(), &[]);
        self.state()
            .records
            .get(&uri.content_type)
            .and_then(|r| r.get(&uri.content_id))
            .cloned()
            .ok_or_else(|| Error::NotFound(uri.to_string()))
    }

    async fn create_content(
        &self,
        corpus_id: &str,
        content_type: &str,
        fields: &Map<String, JsonValue>,
    ) -> Result<ContentRecord> {
        self.log("create_content", format!("{}/{}", corpus_id, content_type), &[]);
        let id = {
            let mut state = self.state();
            state.next_id += 1;
            format!("new-{}", state.next_id)
        };
        let label = fields
            .get("label")
            .and_then(JsonValue::as_str)
            .unwrap_or(id.as_str())
            .to_string();
        self.insert_record(content_type, &id, &label, fields.clone());
        self.get_content(&self.uri(content_type, &id)).await
    }

    async fn network_json(
        &self,
        uri: &ContentUri,
        query: &NetworkQuery,
    ) -> Result<NetworkNeighborhood> {
        self.log("network_json", uri.to_string(), &query.to_query_pairs());

        let (delay, result) = {
            let state = self.state();
            if state.failing_uris.contains(&uri.to_string()) {
                return Err(Error::Network(format!("connection reset for {}", uri)));
            }

            let grouped = Self::visible_neighbors(&state, uri, query);
            let meta = if query.is_seed || query.meta_only {
                Some(
                    grouped
                        .iter()
                        .map(|(ct, list)| (ct.clone(), list.len() as u64))
                        .collect(),
                )
            } else {
                None
            };

            let mut response = NetworkNeighborhood {
                nodes: Vec::new(),
                edges: Vec::new(),
                meta,
            };

            if !query.meta_only {
                response.nodes.push(NetworkNode {
                    id: uri.to_string(),
                    label: Self::label_of(&state, uri),
                    group: uri.content_type.clone(),
                });
                for list in grouped.values() {
                    for (neighbor, edge) in list
                        .iter()
                        .skip(query.per_type_skip as usize)
                        .take(query.per_type_limit as usize)
                    {
                        response.nodes.push(NetworkNode {
                            id: neighbor.to_string(),
                            label: Self::label_of(&state, neighbor),
                            group: neighbor.content_type.clone(),
                        });
                        response.edges.push(edge.clone());
                    }
                }
            }
            (state.network_delay, response)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(result)
    }

    async fn content_view(
        &self,
        corpus_id: &str,
        request: &ContentViewRequest,
    ) -> Result<Option<ContentView>> {
        self.log("content_view", corpus_id.to_string(), &[]);
        let mut state = self.state();
        match request.action {
            ContentViewAction::Create => {
                let name = request
                    .name
                    .clone()
                    .ok_or_else(|| Error::Validation("view name required".into()))?;
                let content_type = request
                    .content_type
                    .clone()
                    .ok_or_else(|| Error::Validation("content type required".into()))?;
                let search: Vec<(String, String)> = request
                    .search
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                let members: BTreeSet<String> = state
                    .records
                    .get(&content_type)
                    .map(|r| {
                        r.values()
                            .filter(|rec| Self::record_matches(rec, &search))
                            .map(|rec| rec.id.clone())
                            .collect()
                    })
                    .unwrap_or_default();
                state.next_id += 1;
                let id = format!("view-{}", state.next_id);
                state.views.insert(id.clone(), (content_type.clone(), members));
                Ok(Some(ContentView {
                    id,
                    name,
                    content_type,
                    status: Some("populated".into()),
                }))
            }
            ContentViewAction::Refresh => {
                let id = request.view_id.clone().unwrap_or_default();
                let (content_type, _) = state
                    .views
                    .get(&id)
                    .cloned()
                    .ok_or_else(|| Error::NotFound(format!("view {}", id)))?;
                Ok(Some(ContentView {
                    name: id.clone(),
                    id,
                    content_type,
                    status: Some("populated".into()),
                }))
            }
            ContentViewAction::Delete => {
                let id = request.view_id.clone().unwrap_or_default();
                state
                    .views
                    .remove(&id)
                    .ok_or_else(|| Error::NotFound(format!("view {}", id)))?;
                Ok(None)
            }
        }
    }

    async fn bulk_action(
        &self,
        corpus_id: &str,
        content_type: &str,
        request: &BulkActionRequest,
    ) -> Result<()> {
        let selection = serde_json::to_string(&request.selection)?;
        self.log(
            "bulk_action",
            format!("{}/{}", corpus_id, content_type),
            &[("selection".to_string(), selection)],
        );
        if request.action == BulkAction::Delete {
            let mut state = self.state();
            if let Some(records) = state.records.get_mut(content_type) {
                match &request.selection {
                    ContentSelection::All => records.clear(),
                    ContentSelection::Ids(ids) => {
                        for id in ids {
                            records.remove(id);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    async fn list_jobsites(&self) -> Result<Vec<Jobsite>> {
        self.log("list_jobsites", String::new(), &[]);
        Ok(self.state().jobsites.clone())
    }

    async fn list_tasks(&self) -> Result<Vec<Task>> {
        self.log("list_tasks", String::new(), &[]);
        Ok(self.state().tasks.clone())
    }

    async fn get_job(&self, job_id: &str) -> Result<Job> {
        self.log("get_job", job_id.to_string(), &[]);
        let delay = self.state().job_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.state()
            .jobs
            .get(job_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("job {}", job_id)))
    }

    async fn list_content_jobs(&self, uri: &ContentUri) -> Result<Vec<Job>> {
        self.log("list_content_jobs", uri.to_string(), &[]);
        Ok(self
            .state()
            .jobs
            .values()
            .filter(|j| &j.content_uri() == uri)
            .cloned()
            .collect())
    }

    async fn submit_job(&self, submission: &JobSubmission) -> Result<Job> {
        self.log("submit_job", submission.task_id.clone(), &[]);
        let mut state = self.state();
        let task = state
            .tasks
            .iter()
            .find(|t| t.id == submission.task_id)
            .cloned()
            .ok_or_else(|| Error::Validation(format!("unknown task {}", submission.task_id)))?;
        let jobsite_name = state
            .jobsites
            .iter()
            .find(|j| j.id == submission.jobsite_id)
            .map(|j| j.name.clone())
            .unwrap_or_default();
        state.next_id += 1;
        let job = Job {
            id: format!("job-{}", state.next_id),
            corpus_id: submission.corpus_id.clone(),
            content_type: submission.content_type.clone(),
            content_id: submission.content_id.clone(),
            task_id: task.id,
            task_name: task.name,
            jobsite_name,
            scholar_name: String::new(),
            status: JobStatus::Queueing,
            stage: None,
            percent_complete: 0,
            parameters: submission.parameters.clone(),
            report: None,
            submitted_time: Some(chrono::Utc::now()),
        };
        state.jobs.insert(job.id.clone(), job.clone());
        Ok(job)
    }

    async fn retry_job(&self, job_id: &str) -> Result<Job> {
        self.log("retry_job", job_id.to_string(), &[]);
        let mut state = self.state();
        let job = state
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| Error::NotFound(format!("job {}", job_id)))?;
        if job.status != JobStatus::Error {
            return Err(Error::Validation(format!(
                "job {} is {}, only failed jobs can be retried",
                job_id, job.status
            )));
        }
        job.status = JobStatus::Queueing;
        job.percent_complete = 0;
        job.report = None;
        Ok(job.clone())
    }
}
