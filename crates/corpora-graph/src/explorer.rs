//! Graph explorer: incremental sprawl/merge over network neighborhoods.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{join_all, BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn, Instrument};

use corpora_core::{
    decode_entities, defaults, ClientConfig, CollapsedRelationship, ContentUri, CorporaApi,
    Error, NetworkNeighborhood, NetworkQuery, Result,
};

use crate::collapse::{apply_mass, apply_thickness, normalize_directions, LinkScale};
use crate::label::LabelMode;
use crate::legend::Legend;
use crate::model::{Edge, GraphModel, Node};
use crate::panes::{DetailPanes, PaneSummary};
use crate::quiescence::PendingOps;

/// Explorer tuning.
#[derive(Debug, Clone)]
pub struct ExplorerConfig {
    /// Initial per-type page size; one of [`defaults::PER_TYPE_LIMITS`].
    pub per_type_limit: u32,
    /// Deadline for one network-neighborhood request.
    pub sprawl_timeout: Duration,
    /// How many times an empty page may trigger a fetch of the next page
    /// before the sprawl gives up.
    pub max_resprawls: u32,
    /// Thickness bounds and mass cap applied at settle time.
    pub link_scale: LinkScale,
    pub label_mode: LabelMode,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            per_type_limit: defaults::PER_TYPE_LIMIT,
            sprawl_timeout: Duration::from_secs(defaults::SPRAWL_TIMEOUT_SECS),
            max_resprawls: defaults::MAX_RESPRAWLS,
            link_scale: LinkScale::default(),
            label_mode: LabelMode::default(),
        }
    }
}

impl ExplorerConfig {
    /// Take the sprawl deadline from client configuration.
    pub fn from_client(config: &ClientConfig) -> Self {
        Self {
            sprawl_timeout: config.sprawl_timeout(),
            ..Self::default()
        }
    }

    pub fn with_per_type_limit(mut self, limit: u32) -> Result<Self> {
        validate_per_type_limit(limit)?;
        self.per_type_limit = limit;
        Ok(self)
    }

    pub fn with_sprawl_timeout(mut self, timeout: Duration) -> Self {
        self.sprawl_timeout = timeout;
        self
    }

    pub fn with_label_mode(mut self, mode: LabelMode) -> Self {
        self.label_mode = mode;
        self
    }
}

fn validate_per_type_limit(limit: u32) -> Result<()> {
    if defaults::PER_TYPE_LIMITS.contains(&limit) {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "per_type_limit must be one of {:?}, got {}",
            defaults::PER_TYPE_LIMITS,
            limit
        )))
    }
}

/// Options for one sprawl.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SprawlOptions {
    /// Pin the node and request relationship metadata.
    pub is_seed: bool,
    /// Sprawl every newly added node once (not recursively).
    pub sprawl_children: bool,
    /// Restrict expansion to one related content type.
    pub target_content_type: Option<String>,
    /// Override the node's cursor.
    pub skip: Option<u32>,
    /// Retry depth of the resprawl-on-empty heuristic.
    pub resprawl: u32,
    /// Fetch relationship metadata only.
    pub meta_only: bool,
}

impl SprawlOptions {
    pub fn seed() -> Self {
        Self {
            is_seed: true,
            sprawl_children: true,
            ..Self::default()
        }
    }

    pub fn targeted(content_type: impl Into<String>) -> Self {
        Self {
            target_content_type: Some(content_type.into()),
            ..Self::default()
        }
    }

    pub fn meta_only() -> Self {
        Self {
            meta_only: true,
            ..Self::default()
        }
    }

    fn advances_cursor(&self) -> bool {
        !self.meta_only && self.target_content_type.is_none()
    }
}

/// What one sprawl (with its resprawls and children) added.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SprawlOutcome {
    pub nodes_added: usize,
    pub edges_added: usize,
    pub resprawls: u32,
    pub children_failed: usize,
}

impl SprawlOutcome {
    fn absorb(&mut self, other: SprawlOutcome) {
        self.nodes_added += other.nodes_added;
        self.edges_added += other.edges_added;
        self.resprawls += other.resprawls;
        self.children_failed += other.children_failed;
    }
}

/// Result of [`GraphExplorer::expand`]: the sprawl's own outcome, plus the
/// settle pass when this expansion was the last one of its batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Expansion {
    pub outcome: SprawlOutcome,
    pub settled: Option<SettleReport>,
}

/// Result of one settle pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SettleReport {
    pub nodes: usize,
    pub edges: usize,
    /// Collapsed edges rewritten into canonical direction.
    pub normalized_edges: usize,
    /// Whether this pass pinned seeds and requested a view fit.
    pub first_load: bool,
}

/// Serializable view of the whole explorer state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub seeds: Vec<String>,
    pub excluded: Vec<String>,
    pub hidden_types: Vec<String>,
    pub collapses: Vec<String>,
    pub filter_views: BTreeMap<String, String>,
    pub per_type_limit: u32,
    pub label_mode: LabelMode,
    pub legend: Legend,
}

struct Merge {
    nodes_added: usize,
    edges_added: usize,
    new_uris: Vec<String>,
    resprawl: bool,
}

struct ExplorerState {
    model: GraphModel,
    seeds: Vec<String>,
    excluded: BTreeSet<String>,
    hidden_types: BTreeSet<String>,
    collapses: Vec<CollapsedRelationship>,
    filter_views: BTreeMap<String, String>,
    per_type_limit: u32,
    label_mode: LabelMode,
    first_load: bool,
    fit_requested: bool,
    legend: Legend,
    panes: DetailPanes,
    /// Bumped on every reset; responses from an older generation are dropped.
    generation: u64,
}

impl ExplorerState {
    fn query(&self, skip: u32, options: &SprawlOptions) -> NetworkQuery {
        NetworkQuery {
            per_type_skip: skip,
            per_type_limit: self.per_type_limit,
            collapses: self.collapses.clone(),
            hidden: self.hidden_types.iter().cloned().collect(),
            filters: self.filter_views.clone(),
            is_seed: options.is_seed,
            meta_only: options.meta_only,
            target_ct: options.target_content_type.clone(),
        }
    }

    /// Collapse normalization, thickness, mass and legend for the current
    /// model. Returns the number of edges normalized.
    fn relayout(&mut self, scale: &LinkScale) -> usize {
        let normalized = normalize_directions(&mut self.model, &self.collapses);
        apply_thickness(&mut self.model, &self.collapses, scale);
        apply_mass(&mut self.model, &self.collapses, scale);
        self.legend = Legend::build(&self.model);
        normalized
    }

    /// Whether cached meta for `uri` reports neighbors not yet plotted.
    fn has_unplotted(&self, uri: &str) -> bool {
        let Some(meta) = self.model.node(uri).and_then(|n| n.meta.as_ref()) else {
            return false;
        };
        let plotted = self.model.neighbor_counts(uri);
        meta.iter()
            .any(|(path, total)| plotted.get(path).copied().unwrap_or(0) < *total)
    }

    fn merge(
        &mut self,
        uri: &str,
        response: NetworkNeighborhood,
        skip: u32,
        options: &SprawlOptions,
        max_resprawls: u32,
    ) -> Merge {
        let mut nodes_added = 0;
        let mut new_uris = Vec::new();
        for node in response.nodes {
            if self.excluded.contains(&node.id) {
                continue;
            }
            let label = decode_entities(&node.label);
            let added = self
                .model
                .add_node(Node::new(&node.id, label, &node.group, self.label_mode));
            if added {
                nodes_added += 1;
                if node.id != uri {
                    new_uris.push(node.id);
                }
            }
        }

        let mut edges_added = 0;
        for edge in response.edges {
            if self.excluded.contains(&edge.from) || self.excluded.contains(&edge.to) {
                continue;
            }
            if self
                .model
                .add_edge(Edge::new(edge.from, edge.to, edge.title, edge.freq))
            {
                edges_added += 1;
            }
        }

        let per_type_limit = self.per_type_limit;
        let mut meta_refreshed = false;
        if let Some(node) = self.model.node_mut(uri) {
            if options.is_seed {
                node.is_seed = true;
                node.pinned = true;
            }
            if let Some(meta) = response.meta {
                node.meta = Some(meta);
                meta_refreshed = true;
            }
            if options.advances_cursor() {
                node.skip = skip + per_type_limit;
            }
        }
        if meta_refreshed && self.panes.mark_dirty(uri) {
            debug!(uri, "Detail pane metadata refreshed");
        }

        let resprawl = nodes_added == 0
            && !options.meta_only
            && options.target_content_type.is_none()
            && options.resprawl < max_resprawls
            && self.has_unplotted(uri);

        Merge {
            nodes_added,
            edges_added,
            new_uris,
            resprawl,
        }
    }
}

/// Incrementally explores the content graph around a set of seed URIs.
///
/// The node/edge model lives behind one lock that is never held across a
/// network request; responses are merged in whatever order they arrive.
pub struct GraphExplorer<A> {
    api: Arc<A>,
    state: RwLock<ExplorerState>,
    pending: PendingOps,
    config: ExplorerConfig,
}

impl<A: CorporaApi + 'static> GraphExplorer<A> {
    pub fn new(api: Arc<A>, config: ExplorerConfig) -> Self {
        let state = ExplorerState {
            model: GraphModel::new(),
            seeds: Vec::new(),
            excluded: BTreeSet::new(),
            hidden_types: BTreeSet::new(),
            collapses: Vec::new(),
            filter_views: BTreeMap::new(),
            per_type_limit: config.per_type_limit,
            label_mode: config.label_mode,
            first_load: true,
            fit_requested: false,
            legend: Legend::default(),
            panes: DetailPanes::default(),
            generation: 0,
        };
        Self {
            api,
            state: RwLock::new(state),
            pending: PendingOps::new(),
            config,
        }
    }

    // ------------------------------------------------------------------
    // Sprawl
    // ------------------------------------------------------------------

    /// Fetch one page of `uri`'s neighborhood and merge it. Does not settle;
    /// see [`GraphExplorer::expand`].
    pub async fn sprawl(&self, uri: &str, options: SprawlOptions) -> Result<SprawlOutcome> {
        self.sprawl_boxed(uri.to_string(), options).await
    }

    fn sprawl_boxed(
        &self,
        uri: String,
        options: SprawlOptions,
    ) -> BoxFuture<'_, Result<SprawlOutcome>> {
        let span = tracing::debug_span!(
            "sprawl",
            subsystem = "graph",
            uri = %uri,
            resprawl = options.resprawl
        );
        self.sprawl_inner(uri, options).instrument(span).boxed()
    }

    async fn sprawl_inner(&self, uri: String, options: SprawlOptions) -> Result<SprawlOutcome> {
        let target: ContentUri = uri.parse()?;
        let _guard = self.pending.begin();

        let (query, skip, generation) = {
            let state = self.state.read().await;
            if state.excluded.contains(&uri) {
                debug!("Skipping sprawl of excluded node");
                return Ok(SprawlOutcome::default());
            }
            let skip = options
                .skip
                .or_else(|| state.model.node(&uri).map(|n| n.skip))
                .unwrap_or(0);
            (state.query(skip, &options), skip, state.generation)
        };

        let request = self.api.network_json(&target, &query);
        let response = match tokio::time::timeout(self.config.sprawl_timeout, request).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(error = %e, "Sprawl request failed");
                return Err(e);
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.config.sprawl_timeout.as_millis() as u64,
                    "Sprawl request timed out"
                );
                return Err(Error::Timeout(format!(
                    "network neighborhood for {} exceeded {:?}",
                    uri, self.config.sprawl_timeout
                )));
            }
        };

        let merge = {
            let mut state = self.state.write().await;
            if state.generation != generation {
                debug!("Dropping response from before graph reset");
                return Ok(SprawlOutcome::default());
            }
            state.merge(&uri, response, skip, &options, self.config.max_resprawls)
        };
        debug!(
            nodes_added = merge.nodes_added,
            edges_added = merge.edges_added,
            skip,
            "Sprawl merged"
        );

        let mut outcome = SprawlOutcome {
            nodes_added: merge.nodes_added,
            edges_added: merge.edges_added,
            ..SprawlOutcome::default()
        };

        if merge.resprawl {
            debug!(
                attempt = options.resprawl + 1,
                "No new nodes but metadata reports more, resprawling"
            );
            let next = SprawlOptions {
                skip: None,
                resprawl: options.resprawl + 1,
                ..options.clone()
            };
            match self.sprawl_boxed(uri.clone(), next).await {
                Ok(more) => {
                    outcome.absorb(more);
                    outcome.resprawls += 1;
                }
                Err(e) => warn!(error = %e, "Resprawl failed"),
            }
        }

        if options.sprawl_children && !merge.new_uris.is_empty() {
            let children = merge
                .new_uris
                .into_iter()
                .map(|child| self.sprawl_boxed(child, SprawlOptions::default()));
            for result in join_all(children).await {
                match result {
                    Ok(child) => outcome.absorb(child),
                    Err(_) => outcome.children_failed += 1,
                }
            }
        }

        Ok(outcome)
    }

    /// Sprawl `uri` as part of a batch. Expansions running at the same time
    /// share one batch; whichever finishes last runs the single settle pass,
    /// whether its own sprawl succeeded or not.
    pub async fn expand(&self, uri: &str, options: SprawlOptions) -> Result<Expansion> {
        let batch = self.pending.begin();
        let result = self.sprawl_boxed(uri.to_string(), options).await;
        let settled = if batch.release() {
            Some(self.settle().await)
        } else {
            debug!(uri, pending = self.pending.pending(), "Expansion joined running batch");
            None
        };
        result.map(|outcome| Expansion { outcome, settled })
    }

    /// Sprawl seeds in parallel. Fails only when every seed failed.
    async fn sprawl_seeds(&self, seeds: &[String]) -> Result<()> {
        let results = join_all(
            seeds
                .iter()
                .map(|seed| self.sprawl_boxed(seed.clone(), SprawlOptions::seed())),
        )
        .await;

        let mut first_error = None;
        let mut succeeded = 0;
        for (seed, result) in seeds.iter().zip(results) {
            match result {
                Ok(_) => succeeded += 1,
                Err(e) => {
                    warn!(uri = %seed, error = %e, "Seed sprawl failed");
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) if succeeded == 0 => Err(e),
            _ => Ok(()),
        }
    }

    /// Add seeds, sprawl them with their children, wait for every pending
    /// sprawl to finish, then settle.
    pub async fn explore(&self, seeds: &[String]) -> Result<SettleReport> {
        for seed in seeds {
            seed.parse::<ContentUri>()?;
        }
        {
            let mut state = self.state.write().await;
            for seed in seeds {
                if !state.seeds.contains(seed) {
                    state.seeds.push(seed.clone());
                }
            }
        }
        info!(seeds = seeds.len(), "Exploring graph");

        let result = self.sprawl_seeds(seeds).await;
        self.pending.await_quiescence().await;
        let report = self.settle().await;
        result.map(|_| report)
    }

    /// Resolves once no sprawl is in flight.
    pub async fn await_quiescence(&self) {
        self.pending.await_quiescence().await
    }

    pub fn pending(&self) -> usize {
        self.pending.pending()
    }

    /// One batch pass: collapse normalization, thickness and mass, legend,
    /// and on first load pin seeds and request a view fit.
    pub async fn settle(&self) -> SettleReport {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let normalized_edges = state.relayout(&self.config.link_scale);

        let first_load = state.first_load && state.model.node_count() > 0;
        if first_load {
            for seed in &state.seeds {
                if let Some(node) = state.model.node_mut(seed) {
                    node.pinned = true;
                }
            }
            state.fit_requested = true;
            state.first_load = false;
        }

        let report = SettleReport {
            nodes: state.model.node_count(),
            edges: state.model.edge_count(),
            normalized_edges,
            first_load,
        };
        info!(
            nodes = report.nodes,
            edges = report.edges,
            normalized_edges,
            first_load,
            "Graph settled"
        );
        report
    }

    /// Consume a pending view-fit request.
    pub async fn take_fit_request(&self) -> bool {
        std::mem::take(&mut self.state.write().await.fit_requested)
    }

    // ------------------------------------------------------------------
    // Extrude / reset
    // ------------------------------------------------------------------

    /// Remove `uri` and exclude it for the rest of the session. With
    /// `remove_isolated`, nodes left without edges are extruded too, except
    /// seeds. Thickness, mass and legend are recomputed for what remains.
    /// Returns every removed URI.
    pub async fn extrude(&self, uri: &str, remove_isolated: bool) -> Vec<String> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        state.excluded.insert(uri.to_string());
        state.seeds.retain(|s| s != uri);

        let mut removed = Vec::new();
        let mut worklist = vec![uri.to_string()];
        while let Some(current) = worklist.pop() {
            let Some(neighbors) = state.model.remove_node(&current) else {
                continue;
            };
            state.excluded.insert(current.clone());
            state.panes.close(&current);
            if remove_isolated {
                for neighbor in neighbors {
                    if state.model.contains_node(&neighbor)
                        && state.model.degree(&neighbor) == 0
                        && !state.seeds.contains(&neighbor)
                    {
                        worklist.push(neighbor);
                    }
                }
            }
            removed.push(current);
        }
        state.relayout(&self.config.link_scale);

        info!(uri, removed = removed.len(), "Extruded node");
        removed
    }

    /// Clear the plotted graph and re-explore every seed.
    ///
    /// Exclusions, hidden types, collapses and filters are kept.
    pub async fn reset_graph(&self) -> Result<SettleReport> {
        let seeds = {
            let mut state = self.state.write().await;
            state.model.clear();
            state.legend = Legend::default();
            state.generation += 1;
            state.seeds.clone()
        };
        info!(seeds = seeds.len(), "Resetting graph");

        let result = self.sprawl_seeds(&seeds).await;
        self.pending.await_quiescence().await;
        let report = self.settle().await;
        result.map(|_| report)
    }

    async fn change_and_reset<F>(&self, change: F) -> Result<bool>
    where
        F: FnOnce(&mut ExplorerState) -> bool,
    {
        let changed = change(&mut *self.state.write().await);
        if changed {
            self.reset_graph().await?;
        }
        Ok(changed)
    }

    /// Elide `relationship.proxy_ct` between its endpoints. Returns whether
    /// the set of collapses changed.
    pub async fn collapse(&self, relationship: CollapsedRelationship) -> Result<bool> {
        info!(collapse = %relationship.wire(), "Collapsing relationship");
        self.change_and_reset(|state| {
            if state.collapses.contains(&relationship) {
                return false;
            }
            state.collapses.push(relationship);
            true
        })
        .await
    }

    pub async fn uncollapse(&self, relationship: &CollapsedRelationship) -> Result<bool> {
        info!(collapse = %relationship.wire(), "Uncollapsing relationship");
        self.change_and_reset(|state| {
            let before = state.collapses.len();
            state.collapses.retain(|c| c != relationship);
            state.collapses.len() != before
        })
        .await
    }

    pub async fn hide_type(&self, content_type: &str) -> Result<bool> {
        self.change_and_reset(|state| state.hidden_types.insert(content_type.to_string()))
            .await
    }

    pub async fn unhide_type(&self, content_type: &str) -> Result<bool> {
        self.change_and_reset(|state| state.hidden_types.remove(content_type))
            .await
    }

    /// Restrict sprawled nodes of `content_type` to members of a content view.
    pub async fn set_filter_view(&self, content_type: &str, view_id: &str) -> Result<bool> {
        self.change_and_reset(|state| {
            state
                .filter_views
                .insert(content_type.to_string(), view_id.to_string())
                .as_deref()
                != Some(view_id)
        })
        .await
    }

    pub async fn clear_filter_view(&self, content_type: &str) -> Result<bool> {
        self.change_and_reset(|state| state.filter_views.remove(content_type).is_some())
            .await
    }

    // ------------------------------------------------------------------
    // Display state
    // ------------------------------------------------------------------

    /// Change the per-type page size used by later sprawls.
    pub async fn set_per_type_limit(&self, limit: u32) -> Result<()> {
        validate_per_type_limit(limit)?;
        self.state.write().await.per_type_limit = limit;
        Ok(())
    }

    pub async fn per_type_limit(&self) -> u32 {
        self.state.read().await.per_type_limit
    }

    /// Reformat every label under `mode`.
    pub async fn set_label_mode(&self, mode: LabelMode) {
        let mut state = self.state.write().await;
        state.label_mode = mode;
        for node in state.model.nodes_mut() {
            node.label = mode.format(&node.raw_label);
        }
    }

    async fn with_node<F>(&self, uri: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut Node),
    {
        let mut state = self.state.write().await;
        let node = state
            .model
            .node_mut(uri)
            .ok_or_else(|| Error::NotFound(format!("node {}", uri)))?;
        f(node);
        Ok(())
    }

    pub async fn pin(&self, uri: &str) -> Result<()> {
        self.with_node(uri, |node| node.pinned = true).await
    }

    pub async fn unpin(&self, uri: &str) -> Result<()> {
        self.with_node(uri, |node| node.pinned = false).await
    }

    /// Select `uri`, deselecting every other node.
    pub async fn select(&self, uri: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.model.contains_node(uri) {
            return Err(Error::NotFound(format!("node {}", uri)));
        }
        for node in state.model.nodes_mut() {
            node.selected = node.uri == uri;
        }
        Ok(())
    }

    pub async fn clear_selection(&self) {
        let mut state = self.state.write().await;
        for node in state.model.nodes_mut() {
            node.selected = false;
        }
    }

    // ------------------------------------------------------------------
    // Detail panes
    // ------------------------------------------------------------------

    pub async fn open_pane(&self, uri: &str) -> Result<PaneSummary> {
        let mut state = self.state.write().await;
        let summary = PaneSummary::for_node(&state.model, uri)
            .ok_or_else(|| Error::NotFound(format!("node {}", uri)))?;
        state.panes.open(uri);
        Ok(summary)
    }

    pub async fn close_pane(&self, uri: &str) -> bool {
        self.state.write().await.panes.close(uri)
    }

    pub async fn pane_summary(&self, uri: &str) -> Option<PaneSummary> {
        PaneSummary::for_node(&self.state.read().await.model, uri)
    }

    /// Summaries of open panes whose metadata changed since the last call.
    pub async fn take_dirty_panes(&self) -> Vec<PaneSummary> {
        let mut state = self.state.write().await;
        let dirty = state.panes.take_dirty();
        dirty
            .iter()
            .filter_map(|uri| PaneSummary::for_node(&state.model, uri))
            .collect()
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub async fn node(&self, uri: &str) -> Option<Node> {
        self.state.read().await.model.node(uri).cloned()
    }

    pub async fn node_count(&self) -> usize {
        self.state.read().await.model.node_count()
    }

    pub async fn edge_count(&self) -> usize {
        self.state.read().await.model.edge_count()
    }

    pub async fn legend(&self) -> Legend {
        self.state.read().await.legend.clone()
    }

    pub async fn snapshot(&self) -> GraphSnapshot {
        let state = self.state.read().await;
        GraphSnapshot {
            nodes: state.model.nodes().cloned().collect(),
            edges: state.model.edges().cloned().collect(),
            seeds: state.seeds.clone(),
            excluded: state.excluded.iter().cloned().collect(),
            hidden_types: state.hidden_types.iter().cloned().collect(),
            collapses: state.collapses.iter().map(|c| c.wire()).collect(),
            filter_views: state.filter_views.clone(),
            per_type_limit: state.per_type_limit,
            label_mode: state.label_mode,
            legend: state.legend.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_type_limit_validation() {
        assert!(validate_per_type_limit(40).is_ok());
        assert!(matches!(
            validate_per_type_limit(25),
            Err(Error::InvalidInput(_))
        ));
        assert!(ExplorerConfig::default().with_per_type_limit(7).is_err());
    }

    #[test]
    fn test_cursor_advance_rules() {
        assert!(SprawlOptions::seed().advances_cursor());
        assert!(!SprawlOptions::meta_only().advances_cursor());
        assert!(!SprawlOptions::targeted("Chapter").advances_cursor());
    }

    #[test]
    fn test_outcome_absorb() {
        let mut a = SprawlOutcome {
            nodes_added: 2,
            edges_added: 1,
            resprawls: 0,
            children_failed: 0,
        };
        a.absorb(SprawlOutcome {
            nodes_added: 3,
            edges_added: 3,
            resprawls: 1,
            children_failed: 1,
        });
        assert_eq!(a.nodes_added, 5);
        assert_eq!(a.resprawls, 1);
        assert_eq!(a.children_failed, 1);
    }
}
