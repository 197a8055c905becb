//! Wire models shared by the client, graph explorer, content table and job
//! manager.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};

use crate::{Error, Result};

// =============================================================================
// CONTENT URI
// =============================================================================

/// Identity of one piece of content: `/corpus/{corpus_id}/{content_type}/{content_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentUri {
    pub corpus_id: String,
    pub content_type: String,
    pub content_id: String,
}

impl ContentUri {
    pub fn new(
        corpus_id: impl Into<String>,
        content_type: impl Into<String>,
        content_id: impl Into<String>,
    ) -> Self {
        Self {
            corpus_id: corpus_id.into(),
            content_type: content_type.into(),
            content_id: content_id.into(),
        }
    }
}

impl FromStr for ContentUri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim_matches('/').split('/').collect();
        match parts.as_slice() {
            ["corpus", corpus_id, content_type, content_id]
                if !corpus_id.is_empty() && !content_type.is_empty() && !content_id.is_empty() =>
            {
                Ok(Self::new(*corpus_id, *content_type, *content_id))
            }
            _ => Err(Error::InvalidInput(format!("not a content URI: {}", s))),
        }
    }
}

impl fmt::Display for ContentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/corpus/{}/{}/{}",
            self.corpus_id, self.content_type, self.content_id
        )
    }
}

impl Serialize for ContentUri {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ContentUri {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// CONTENT
// =============================================================================

/// One content record as returned by list and detail endpoints.
///
/// Field values beyond the common keys are kept verbatim in `fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provenance: Vec<JobProvenance>,
    #[serde(flatten)]
    pub fields: Map<String, JsonValue>,
}

/// Pagination metadata attached to list responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageMeta {
    #[serde(default)]
    pub total: u64,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub num_pages: u32,
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

fn first_page() -> u32 {
    1
}

/// One page of a list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListPage<T> {
    pub meta: PageMeta,
    pub records: Vec<T>,
}

// =============================================================================
// NETWORK NEIGHBORHOOD
// =============================================================================

/// A node in a network-json response. `id` is the node's content URI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkNode {
    pub id: String,
    #[serde(default)]
    pub label: String,
    pub group: String,
}

/// An edge in a network-json response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkEdge {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub title: String,
    #[serde(default = "unit_freq")]
    pub freq: f64,
}

fn unit_freq() -> f64 {
    1.0
}

/// Response of `GET .../{content_type}/{id}/network-json/`.
///
/// `meta`, when present, maps each relationship path to the total number of
/// related items the server knows about for the requested node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkNeighborhood {
    #[serde(default)]
    pub nodes: Vec<NetworkNode>,
    #[serde(default)]
    pub edges: Vec<NetworkEdge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<BTreeMap<String, u64>>,
}

/// Declared elision of `proxy_ct` nodes between `from_ct` and `to_ct`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CollapsedRelationship {
    pub from_ct: String,
    pub proxy_ct: String,
    pub to_ct: String,
}

impl CollapsedRelationship {
    pub fn new(
        from_ct: impl Into<String>,
        proxy_ct: impl Into<String>,
        to_ct: impl Into<String>,
    ) -> Self {
        Self {
            from_ct: from_ct.into(),
            proxy_ct: proxy_ct.into(),
            to_ct: to_ct.into(),
        }
    }

    /// Wire form: `from.proxy.to`.
    pub fn wire(&self) -> String {
        format!("{}.{}.{}", self.from_ct, self.proxy_ct, self.to_ct)
    }

    /// Title the server gives edges sprawled from the `to_ct` side:
    /// `to.proxy.from`.
    pub fn reverse_wire(&self) -> String {
        format!("{}.{}.{}", self.to_ct, self.proxy_ct, self.from_ct)
    }

    /// Both endpoints are the same content type.
    pub fn is_symmetric(&self) -> bool {
        self.from_ct == self.to_ct
    }

    /// Whether an edge between groups `a` and `b` is this relationship's
    /// direct edge, in either direction.
    pub fn joins(&self, a: &str, b: &str) -> bool {
        (a == self.from_ct && b == self.to_ct) || (a == self.to_ct && b == self.from_ct)
    }
}

impl FromStr for CollapsedRelationship {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('.').collect();
        match parts.as_slice() {
            [from, proxy, to] if !from.is_empty() && !proxy.is_empty() && !to.is_empty() => {
                Ok(Self::new(*from, *proxy, *to))
            }
            _ => Err(Error::InvalidInput(format!(
                "collapse must look like From.Proxy.To, got: {}",
                s
            ))),
        }
    }
}

/// Parameters of a network-neighborhood request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkQuery {
    pub per_type_skip: u32,
    pub per_type_limit: u32,
    pub collapses: Vec<CollapsedRelationship>,
    pub hidden: Vec<String>,
    /// Content type → content view id restricting sprawled nodes of that type.
    pub filters: BTreeMap<String, String>,
    pub is_seed: bool,
    pub meta_only: bool,
    pub target_ct: Option<String>,
}

impl NetworkQuery {
    /// Render the wire query parameters.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("per_type_skip".to_string(), self.per_type_skip.to_string()),
            ("per_type_limit".to_string(), self.per_type_limit.to_string()),
        ];
        if !self.collapses.is_empty() {
            let collapses: Vec<String> = self.collapses.iter().map(|c| c.wire()).collect();
            pairs.push(("collapses".to_string(), collapses.join(",")));
        }
        if !self.hidden.is_empty() {
            pairs.push(("hidden".to_string(), self.hidden.join(",")));
        }
        if !self.filters.is_empty() {
            let filters: Vec<String> = self
                .filters
                .iter()
                .map(|(ct, view)| format!("{}:{}", ct, view))
                .collect();
            pairs.push(("filters".to_string(), filters.join(",")));
        }
        if self.is_seed {
            pairs.push(("is-seed".to_string(), "y".to_string()));
        }
        if self.meta_only {
            pairs.push(("meta-only".to_string(), "y".to_string()));
        }
        if let Some(ct) = &self.target_ct {
            pairs.push(("target-ct".to_string(), ct.clone()));
        }
        pairs
    }
}

// =============================================================================
// CONTENT VIEWS
// =============================================================================

/// A server-defined, named, persisted subset of a content type's records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentView {
    pub id: String,
    pub name: String,
    pub content_type: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentViewAction {
    Create,
    Refresh,
    Delete,
}

/// Body of `POST /api/corpus/{id}/content-view/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentViewRequest {
    pub action: ContentViewAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Search parameters defining the view's membership.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub search: BTreeMap<String, String>,
}

impl ContentViewRequest {
    pub fn create(
        name: impl Into<String>,
        content_type: impl Into<String>,
        search: BTreeMap<String, String>,
    ) -> Self {
        Self {
            action: ContentViewAction::Create,
            view_id: None,
            name: Some(name.into()),
            content_type: Some(content_type.into()),
            search,
        }
    }

    pub fn refresh(view_id: impl Into<String>) -> Self {
        Self {
            action: ContentViewAction::Refresh,
            view_id: Some(view_id.into()),
            name: None,
            content_type: None,
            search: BTreeMap::new(),
        }
    }

    pub fn delete(view_id: impl Into<String>) -> Self {
        Self {
            action: ContentViewAction::Delete,
            ..Self::refresh(view_id)
        }
    }
}

// =============================================================================
// BULK ACTIONS
// =============================================================================

/// Records targeted by a bulk action: every record matching the current
/// search (`"all"` on the wire) or an explicit id list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSelection {
    All,
    Ids(Vec<String>),
}

impl ContentSelection {
    pub fn is_empty(&self) -> bool {
        matches!(self, ContentSelection::Ids(ids) if ids.is_empty())
    }
}

impl Serialize for ContentSelection {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            ContentSelection::All => serializer.serialize_str("all"),
            ContentSelection::Ids(ids) => ids.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for ContentSelection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Sentinel(String),
            Ids(Vec<String>),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Sentinel(s) if s == "all" => Ok(ContentSelection::All),
            Raw::Sentinel(s) => Err(serde::de::Error::custom(format!(
                "unknown selection sentinel: {}",
                s
            ))),
            Raw::Ids(ids) => Ok(ContentSelection::Ids(ids)),
        }
    }
}

/// Bulk operations offered by the content table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BulkAction {
    /// Destructive; requires explicit confirmation before submission.
    Delete,
    /// Save the selection as a named content view.
    CreateView { name: String },
    /// Export the selection in the given format.
    Export { format: String },
}

impl BulkAction {
    pub fn is_destructive(&self) -> bool {
        matches!(self, BulkAction::Delete)
    }
}

/// Body of `POST /api/corpus/{id}/{content_type}/bulk-action/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkActionRequest {
    #[serde(flatten)]
    pub action: BulkAction,
    pub selection: ContentSelection,
    /// Search state in effect, so `"all"` resolves to the same records the
    /// user was looking at.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub search: BTreeMap<String, String>,
}

// =============================================================================
// JOBS
// =============================================================================

/// Lifecycle status of a backend job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queueing,
    Running,
    Complete,
    Error,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Error)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Queueing => "queueing",
            JobStatus::Running => "running",
            JobStatus::Complete => "complete",
            JobStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// A job as reported by the jobs endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub corpus_id: String,
    pub content_type: String,
    pub content_id: String,
    pub task_id: String,
    #[serde(default)]
    pub task_name: String,
    #[serde(default)]
    pub jobsite_name: String,
    #[serde(default)]
    pub scholar_name: String,
    pub status: JobStatus,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub percent_complete: u8,
    #[serde(default)]
    pub parameters: Map<String, JsonValue>,
    #[serde(default)]
    pub report: Option<String>,
    #[serde(default)]
    pub submitted_time: Option<DateTime<Utc>>,
}

impl Job {
    /// URI of the content this job runs against.
    pub fn content_uri(&self) -> ContentUri {
        ContentUri::new(&self.corpus_id, &self.content_type, &self.content_id)
    }
}

/// Completed-job entry recorded on the parent content record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobProvenance {
    pub job_id: String,
    #[serde(default)]
    pub task_name: String,
    #[serde(default)]
    pub jobsite_name: String,
    #[serde(default)]
    pub scholar_name: String,
    pub status: JobStatus,
    #[serde(default)]
    pub parameters: Map<String, JsonValue>,
    #[serde(default)]
    pub report: Option<String>,
    #[serde(default)]
    pub submitted: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: Option<DateTime<Utc>>,
}

/// A place jobs run (local worker pool, HPC cluster).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Jobsite {
    pub id: String,
    pub name: String,
    /// Ids of the tasks this jobsite can run.
    #[serde(default)]
    pub task_ids: Vec<String>,
}

/// A runnable task definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    /// Content type the task runs against.
    pub content_type: String,
    #[serde(default)]
    pub track_provenance: bool,
    #[serde(default)]
    pub parameters: Vec<TaskParameter>,
}

/// Declarative description of one task parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<JsonValue>,
    #[serde(default)]
    pub choices: Vec<String>,
    /// Target content type for cross-reference parameters.
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Body of `POST /api/jobs/submit/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSubmission {
    pub jobsite_id: String,
    pub task_id: String,
    pub corpus_id: String,
    pub content_type: String,
    pub content_id: String,
    pub parameters: Map<String, JsonValue>,
}

/// The current user's role, as far as job permissions are concerned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scholar {
    pub username: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub permitted_task_ids: BTreeSet<String>,
}

impl Scholar {
    pub fn may_run(&self, task_id: &str) -> bool {
        self.is_admin || self.permitted_task_ids.contains(task_id)
    }
}
