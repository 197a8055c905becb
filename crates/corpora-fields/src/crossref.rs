//! Cross-reference fields: a link from one content record to another.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use corpora_core::{ContentRecord, ContentUri, CorporaApi, Error, Result};

/// Stored value of a cross-reference field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossReference {
    pub id: String,
    #[serde(default)]
    pub label: String,
    pub uri: String,
}

impl CrossReference {
    /// Reference to `uri`; the label defaults to the content id until a
    /// picker supplies one.
    pub fn from_uri(uri: &str) -> Result<Self> {
        let parsed: ContentUri = uri.trim().parse()?;
        Ok(Self {
            id: parsed.content_id.clone(),
            label: parsed.content_id.clone(),
            uri: parsed.to_string(),
        })
    }

    pub fn from_record(record: &ContentRecord) -> Self {
        Self {
            id: record.id.clone(),
            label: record.label.clone(),
            uri: record.uri.clone(),
        }
    }

    pub fn content_uri(&self) -> Result<ContentUri> {
        self.uri.parse()
    }
}

/// Search-as-you-type lookup of reference candidates of one content type.
pub struct CrossReferencePicker<A> {
    api: Arc<A>,
    corpus_id: String,
    content_type: String,
    page_size: u32,
}

impl<A: CorporaApi> CrossReferencePicker<A> {
    pub fn new(api: Arc<A>, corpus_id: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            api,
            corpus_id: corpus_id.into(),
            content_type: content_type.into(),
            page_size: 10,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Candidates matching `query`, ordered by label. A blank query lists
    /// the first page.
    #[instrument(skip(self), fields(subsystem = "fields", corpus_id = %self.corpus_id, content_type = %self.content_type))]
    pub async fn search(&self, query: &str) -> Result<Vec<CrossReference>> {
        let mut params = vec![
            ("page-size".to_string(), self.page_size.to_string()),
            ("s_label".to_string(), "asc".to_string()),
        ];
        let query = query.trim();
        if !query.is_empty() {
            params.push(("q".to_string(), query.to_string()));
        }
        let page = self
            .api
            .list_content(&self.corpus_id, &self.content_type, &params)
            .await?;
        debug!(candidates = page.records.len(), "Cross reference search");
        Ok(page.records.iter().map(CrossReference::from_record).collect())
    }

    /// Confirm a chosen candidate still exists and is of the picker's type.
    pub async fn resolve(&self, uri: &str) -> Result<CrossReference> {
        let parsed: ContentUri = uri.trim().parse()?;
        if parsed.content_type != self.content_type {
            return Err(Error::Validation(format!(
                "expected a {} reference, got a {}",
                self.content_type, parsed.content_type
            )));
        }
        let record = self.api.get_content(&parsed).await?;
        Ok(CrossReference::from_record(&record))
    }
}
