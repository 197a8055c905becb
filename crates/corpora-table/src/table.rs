//! Infinite-scroll content table over one content type.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use corpora_core::{
    defaults, BulkAction, BulkActionRequest, ContentRecord, ContentView, ContentViewRequest,
    CorporaApi, Error, ListPage, PageMeta, Result,
};

use crate::search::{SearchState, SortDirection};
use crate::selection::Selection;

/// One entry of the page queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageRequest {
    Number(u32),
    /// Opaque cursor returned by the backend.
    Token(String),
}

impl PageRequest {
    /// Dedup key; page numbers are only comparable at the same page size.
    fn key(&self, page_size: u32) -> String {
        match self {
            PageRequest::Number(n) => format!("{}:{}", page_size, n),
            PageRequest::Token(t) => format!("token:{}", t),
        }
    }
}

/// Paging tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableConfig {
    pub page_size: u32,
    /// Pages loaded before the page size is multiplied.
    pub accelerate_after_pages: usize,
    pub acceleration_factor: u32,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            page_size: defaults::PAGE_SIZE,
            accelerate_after_pages: defaults::ACCELERATE_AFTER_PAGES,
            acceleration_factor: defaults::ACCELERATION_FACTOR,
        }
    }
}

impl TableConfig {
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

/// A destructive bulk action awaiting explicit confirmation.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "a pending confirmation does nothing until confirmed"]
pub struct PendingConfirmation {
    request: BulkActionRequest,
    summary: String,
}

impl PendingConfirmation {
    /// Prompt text, e.g. `Delete 3 Book records?`.
    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn request(&self) -> &BulkActionRequest {
        &self.request
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BulkOutcome {
    Submitted,
    NeedsConfirmation(PendingConfirmation),
}

struct TableState {
    search: SearchState,
    rows: Vec<ContentRecord>,
    row_ids: HashSet<String>,
    /// Keys of pages loaded or queued.
    requested: HashSet<String>,
    pages_to_load: VecDeque<PageRequest>,
    pages_loaded: usize,
    /// Page number of the most recently applied page.
    current_page: u32,
    next: Option<PageRequest>,
    meta: Option<PageMeta>,
    accelerated: bool,
    selection: Selection,
    /// Bumped on reload; responses from an older generation are dropped.
    generation: u64,
}

impl TableState {
    fn enqueue(&mut self, request: PageRequest) -> bool {
        if !self.requested.insert(request.key(self.search.page_size)) {
            return false;
        }
        self.pages_to_load.push_back(request);
        true
    }

    fn apply(&mut self, page: ListPage<ContentRecord>, config: &TableConfig) -> usize {
        let before = self.rows.len();
        for record in page.records {
            let fresh = self.row_ids.insert(record.id.clone());
            if fresh || !self.accelerated {
                self.rows.push(record);
            }
        }
        let added = self.rows.len() - before;

        self.pages_loaded += 1;
        self.current_page = page.meta.page;
        let has_next = page.meta.has_next_page;

        if !self.accelerated && self.pages_loaded >= config.accelerate_after_pages {
            self.accelerated = true;
            self.search.page_size = self.search.page_size.saturating_mul(config.acceleration_factor);
            debug!(
                page_size = self.search.page_size,
                pages_loaded = self.pages_loaded,
                "Accelerating table paging"
            );
            // Page numbers restart at the new size; overlap is deduplicated.
            let rows = u32::try_from(self.rows.len()).unwrap_or(u32::MAX);
            self.next = has_next.then(|| PageRequest::Number(rows / self.search.page_size + 1));
        } else {
            self.next = match (&page.meta.next_page_token, has_next) {
                (_, false) => None,
                (Some(token), true) => Some(PageRequest::Token(token.clone())),
                (None, true) => Some(PageRequest::Number(page.meta.page + 1)),
            };
        }
        self.meta = Some(page.meta);
        added
    }

    fn clear_rows(&mut self, base_page_size: u32) {
        self.rows.clear();
        self.row_ids.clear();
        self.requested.clear();
        self.pages_to_load.clear();
        self.pages_loaded = 0;
        self.current_page = 0;
        self.next = None;
        self.meta = None;
        self.accelerated = false;
        self.search.page_size = base_page_size;
        self.search.reset_page();
        self.generation += 1;
    }
}

/// Paginated browser for one content type.
///
/// Pages load strictly one at a time in queue order, so a later page can
/// never be applied before an earlier one.
pub struct ContentTable<A> {
    api: Arc<A>,
    corpus_id: String,
    content_type: String,
    config: TableConfig,
    state: Mutex<TableState>,
    drain_lock: Mutex<()>,
}

impl<A: CorporaApi> ContentTable<A> {
    pub fn new(
        api: Arc<A>,
        corpus_id: impl Into<String>,
        content_type: impl Into<String>,
        config: TableConfig,
    ) -> Self {
        Self::with_search(api, corpus_id, content_type, config, SearchState::new(config.page_size))
    }

    /// Start from an existing search, e.g. one restored from a URL.
    pub fn with_search(
        api: Arc<A>,
        corpus_id: impl Into<String>,
        content_type: impl Into<String>,
        config: TableConfig,
        mut search: SearchState,
    ) -> Self {
        search.page_size = config.page_size;
        let state = TableState {
            search,
            rows: Vec::new(),
            row_ids: HashSet::new(),
            requested: HashSet::new(),
            pages_to_load: VecDeque::new(),
            pages_loaded: 0,
            current_page: 0,
            next: None,
            meta: None,
            accelerated: false,
            selection: Selection::default(),
            generation: 0,
        };
        Self {
            api,
            corpus_id: corpus_id.into(),
            content_type: content_type.into(),
            config,
            state: Mutex::new(state),
            drain_lock: Mutex::new(()),
        }
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    // ------------------------------------------------------------------
    // Page queue
    // ------------------------------------------------------------------

    /// Queue a page and wait until the queue has drained. Returns false
    /// when the page was already loaded or queued.
    pub async fn enqueue_page(&self, request: PageRequest) -> Result<bool> {
        let queued = self.state.lock().await.enqueue(request);
        if queued {
            self.drain().await?;
        }
        Ok(queued)
    }

    /// Load queued pages until the queue is empty. Only one drain runs at a
    /// time; a caller arriving mid-drain waits for it and then finds the
    /// queue already consumed.
    async fn drain(&self) -> Result<usize> {
        let _drain = self.drain_lock.lock().await;
        let mut applied = 0;
        loop {
            let (request, params, generation) = {
                let mut state = self.state.lock().await;
                let Some(request) = state.pages_to_load.pop_front() else {
                    break;
                };
                match &request {
                    PageRequest::Number(n) => {
                        state.search.page = *n;
                        state.search.page_token = None;
                    }
                    PageRequest::Token(t) => state.search.page_token = Some(t.clone()),
                }
                (request, state.search.to_query_pairs(), state.generation)
            };

            let result = self
                .api
                .list_content(&self.corpus_id, &self.content_type, &params)
                .await;
            let mut state = self.state.lock().await;
            let page = match result {
                Ok(page) => page,
                Err(e) => {
                    warn!(
                        content_type = %self.content_type,
                        ?request,
                        error = %e,
                        "Page load failed"
                    );
                    // Allow the same page to be requested again.
                    let key = request.key(state.search.page_size);
                    state.requested.remove(&key);
                    return Err(e);
                }
            };
            if state.generation != generation {
                debug!(?request, "Dropping page from before reload");
                continue;
            }
            let added = state.apply(page, &self.config);
            applied += 1;
            debug!(
                content_type = %self.content_type,
                page = state.current_page,
                added,
                rows = state.rows.len(),
                "Page applied"
            );
        }
        Ok(applied)
    }

    /// The last row of `page` scrolled into view: queue the next page when
    /// the backend has one. Observers on earlier pages are stale and
    /// ignored.
    pub async fn on_last_row_visible(&self, page: u32) -> Result<bool> {
        let queued = {
            let mut state = self.state.lock().await;
            if state.pages_loaded == 0 || page != state.current_page {
                false
            } else {
                match state.next.clone() {
                    Some(next) => state.enqueue(next),
                    None => false,
                }
            }
        };
        if queued {
            self.drain().await?;
        }
        Ok(queued)
    }

    /// Drop every row and load page 1 of the current search.
    #[instrument(skip(self), fields(subsystem = "table", content_type = %self.content_type))]
    pub async fn reload(&self) -> Result<usize> {
        {
            let mut state = self.state.lock().await;
            state.clear_rows(self.config.page_size);
            state.enqueue(PageRequest::Number(1));
        }
        info!("Reloading table");
        self.drain().await?;
        Ok(self.state.lock().await.rows.len())
    }

    // ------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------

    /// Mutate the search state, then reload from page 1.
    pub async fn update_search<F>(&self, change: F) -> Result<usize>
    where
        F: FnOnce(&mut SearchState),
    {
        change(&mut self.state.lock().await.search);
        self.reload().await
    }

    /// Toggle sorting on `field` and reload.
    pub async fn order_by(&self, field: &str) -> Result<SortDirection> {
        let direction = self.state.lock().await.search.order_by(field);
        self.reload().await?;
        Ok(direction)
    }

    /// Remove a search param and reload.
    pub async fn remove_param(&self, key: &str) -> Result<bool> {
        let removed = self.state.lock().await.search.remove_param(key);
        self.reload().await?;
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Selection and bulk actions
    // ------------------------------------------------------------------

    pub async fn toggle_row(&self, id: &str) -> Option<bool> {
        self.state.lock().await.selection.toggle(id)
    }

    pub async fn select_all(&self) {
        self.state.lock().await.selection.select_all();
    }

    pub async fn clear_selection(&self) {
        self.state.lock().await.selection.clear();
    }

    pub async fn selection(&self) -> Selection {
        self.state.lock().await.selection.clone()
    }

    /// Submit `action` against the selection. Destructive actions come
    /// back as a [`PendingConfirmation`] instead of being sent.
    pub async fn request_bulk_action(&self, action: BulkAction) -> Result<BulkOutcome> {
        let (request, count) = {
            let state = self.state.lock().await;
            if state.selection.is_empty() {
                return Err(Error::InvalidInput("no rows selected".to_string()));
            }
            let count = match &state.selection {
                Selection::All => None,
                Selection::Ids(ids) => Some(ids.len()),
            };
            let request = BulkActionRequest {
                action,
                selection: state.selection.bulk_selection(),
                search: state.search.search_params(),
            };
            (request, count)
        };

        if request.action.is_destructive() {
            let summary = match count {
                Some(n) => format!("Delete {} {} records?", n, self.content_type),
                None => format!("Delete all matching {} records?", self.content_type),
            };
            debug!(%summary, "Bulk action needs confirmation");
            return Ok(BulkOutcome::NeedsConfirmation(PendingConfirmation {
                request,
                summary,
            }));
        }

        self.submit_bulk(&request).await?;
        Ok(BulkOutcome::Submitted)
    }

    /// Send a confirmed destructive action, then clear the selection and
    /// reload.
    pub async fn confirm(&self, pending: PendingConfirmation) -> Result<()> {
        self.submit_bulk(&pending.request).await?;
        self.clear_selection().await;
        self.reload().await?;
        Ok(())
    }

    async fn submit_bulk(&self, request: &BulkActionRequest) -> Result<()> {
        info!(
            corpus_id = %self.corpus_id,
            content_type = %self.content_type,
            action = ?request.action,
            "Submitting bulk action"
        );
        self.api
            .bulk_action(&self.corpus_id, &self.content_type, request)
            .await
    }

    // ------------------------------------------------------------------
    // Content views
    // ------------------------------------------------------------------

    /// Persist the current search as a named content view.
    pub async fn save_view(&self, name: &str) -> Result<ContentView> {
        let search = self.state.lock().await.search.search_params();
        let request = ContentViewRequest::create(name, &self.content_type, search);
        self.api
            .content_view(&self.corpus_id, &request)
            .await?
            .ok_or_else(|| Error::Internal("content view create returned nothing".to_string()))
    }

    pub async fn refresh_view(&self, view_id: &str) -> Result<Option<ContentView>> {
        self.api
            .content_view(&self.corpus_id, &ContentViewRequest::refresh(view_id))
            .await
    }

    /// Delete a content view; if the table is filtered by it, the filter is
    /// dropped and the table reloaded.
    pub async fn delete_view(&self, view_id: &str) -> Result<()> {
        self.api
            .content_view(&self.corpus_id, &ContentViewRequest::delete(view_id))
            .await?;
        let active = self.state.lock().await.search.content_view.as_deref() == Some(view_id);
        if active {
            self.update_search(|s| s.set_content_view(None)).await?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub async fn rows(&self) -> Vec<ContentRecord> {
        self.state.lock().await.rows.clone()
    }

    pub async fn row_count(&self) -> usize {
        self.state.lock().await.rows.len()
    }

    /// Total matching records reported by the last page.
    pub async fn total(&self) -> Option<u64> {
        self.state.lock().await.meta.as_ref().map(|m| m.total)
    }

    pub async fn pages_loaded(&self) -> usize {
        self.state.lock().await.pages_loaded
    }

    pub async fn current_page(&self) -> u32 {
        self.state.lock().await.current_page
    }

    pub async fn page_size(&self) -> u32 {
        self.state.lock().await.search.page_size
    }

    pub async fn is_accelerated(&self) -> bool {
        self.state.lock().await.accelerated
    }

    pub async fn has_next_page(&self) -> bool {
        self.state.lock().await.next.is_some()
    }

    pub async fn search(&self) -> SearchState {
        self.state.lock().await.search.clone()
    }
}
