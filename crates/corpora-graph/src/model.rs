//! Client-local node and edge collections.
//!
//! Nodes are keyed by content URI and edges by `"{from}-{to}"`, so a merge
//! can never introduce a duplicate: inserting an existing key is a no-op.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::label::LabelMode;

/// A plotted piece of content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub uri: String,
    /// Label after entity decoding, before display formatting.
    pub raw_label: String,
    /// Label as displayed under the current [`LabelMode`].
    pub label: String,
    /// Content type name.
    pub group: String,
    /// Per-type pagination cursor for the next sprawl of this node.
    pub skip: u32,
    /// Cached relationship-path totals from the last response that carried them.
    pub meta: Option<BTreeMap<String, u64>>,
    pub pinned: bool,
    pub selected: bool,
    pub is_seed: bool,
    pub mass: f64,
}

impl Node {
    pub fn new(
        uri: impl Into<String>,
        raw_label: impl Into<String>,
        group: impl Into<String>,
        mode: LabelMode,
    ) -> Self {
        let raw_label = raw_label.into();
        Self {
            uri: uri.into(),
            label: mode.format(&raw_label),
            raw_label,
            group: group.into(),
            skip: 0,
            meta: None,
            pinned: false,
            selected: false,
            is_seed: false,
            mass: 1.0,
        }
    }
}

/// A relationship between two plotted nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub from: String,
    pub to: String,
    pub title: String,
    pub freq: f64,
    pub thickness: f64,
}

impl Edge {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        title: impl Into<String>,
        freq: f64,
    ) -> Self {
        let from = from.into();
        let to = to.into();
        Self {
            id: edge_id(&from, &to),
            from,
            to,
            title: title.into(),
            freq,
            thickness: corpora_core::defaults::DEFAULT_LINK_THICKNESS,
        }
    }

    /// The endpoint opposite `uri`, if `uri` is an endpoint.
    pub fn other(&self, uri: &str) -> Option<&str> {
        if self.from == uri {
            Some(&self.to)
        } else if self.to == uri {
            Some(&self.from)
        } else {
            None
        }
    }
}

/// Canonical id of the edge from `from` to `to`.
pub fn edge_id(from: &str, to: &str) -> String {
    format!("{}-{}", from, to)
}

/// The plotted subgraph.
#[derive(Debug, Clone, Default)]
pub struct GraphModel {
    nodes: BTreeMap<String, Node>,
    edges: BTreeMap<String, Edge>,
    /// node uri → ids of incident edges
    incidence: BTreeMap<String, BTreeSet<String>>,
    /// Ids of reverse edges already folded into their canonical direction.
    folded: BTreeSet<String>,
}

impl GraphModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, uri: &str) -> Option<&Node> {
        self.nodes.get(uri)
    }

    pub fn node_mut(&mut self, uri: &str) -> Option<&mut Node> {
        self.nodes.get_mut(uri)
    }

    pub fn contains_node(&self, uri: &str) -> bool {
        self.nodes.contains_key(uri)
    }

    /// Whether `id` is plotted, or was folded into its canonical direction.
    pub fn contains_edge(&self, id: &str) -> bool {
        self.edges.contains_key(id) || self.folded.contains(id)
    }

    /// Whether `id` was folded into its canonical direction.
    pub fn is_folded(&self, id: &str) -> bool {
        self.folded.contains(id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.get(id)
    }

    pub fn edge_mut(&mut self, id: &str) -> Option<&mut Edge> {
        self.edges.get_mut(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.values_mut()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn edges_mut(&mut self) -> impl Iterator<Item = &mut Edge> {
        self.edges.values_mut()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Insert a node unless one with the same URI exists.
    pub fn add_node(&mut self, node: Node) -> bool {
        if self.nodes.contains_key(&node.uri) {
            return false;
        }
        self.incidence.entry(node.uri.clone()).or_default();
        self.nodes.insert(node.uri.clone(), node);
        true
    }

    /// Insert an edge unless its id is known or an endpoint is not plotted.
    pub fn add_edge(&mut self, edge: Edge) -> bool {
        if self.contains_edge(&edge.id)
            || !self.nodes.contains_key(&edge.from)
            || !self.nodes.contains_key(&edge.to)
        {
            return false;
        }
        for endpoint in [&edge.from, &edge.to] {
            self.incidence
                .entry(endpoint.clone())
                .or_default()
                .insert(edge.id.clone());
        }
        self.edges.insert(edge.id.clone(), edge);
        true
    }

    pub fn remove_edge(&mut self, id: &str) -> Option<Edge> {
        let edge = self.edges.remove(id)?;
        for endpoint in [&edge.from, &edge.to] {
            if let Some(ids) = self.incidence.get_mut(endpoint) {
                ids.remove(id);
            }
        }
        Some(edge)
    }

    /// Remove edge `id` and remember it as folded, so later merges that
    /// return it again are ignored.
    pub fn fold_edge(&mut self, id: &str) -> Option<Edge> {
        let edge = self.remove_edge(id)?;
        self.folded.insert(edge.id.clone());
        Some(edge)
    }

    /// Remove a node with its incident edges; returns the former neighbors.
    pub fn remove_node(&mut self, uri: &str) -> Option<Vec<String>> {
        self.nodes.remove(uri)?;
        let edge_ids = self.incidence.remove(uri).unwrap_or_default();
        let mut neighbors = Vec::new();
        for id in edge_ids {
            if let Some(edge) = self.remove_edge(&id) {
                if let Some(other) = edge.other(uri) {
                    if other != uri {
                        neighbors.push(other.to_string());
                    }
                }
            }
        }
        Some(neighbors)
    }

    /// Edges touching `uri`.
    pub fn incident_edges(&self, uri: &str) -> impl Iterator<Item = &Edge> {
        self.incidence
            .get(uri)
            .into_iter()
            .flatten()
            .filter_map(|id| self.edges.get(id))
    }

    pub fn degree(&self, uri: &str) -> usize {
        self.incidence.get(uri).map(BTreeSet::len).unwrap_or(0)
    }

    /// Distinct plotted neighbors of `uri` per group.
    pub fn neighbor_counts(&self, uri: &str) -> BTreeMap<String, u64> {
        let neighbors: BTreeSet<&str> = self
            .incident_edges(uri)
            .filter_map(|edge| edge.other(uri))
            .collect();
        let mut counts = BTreeMap::new();
        for neighbor in neighbors {
            if let Some(node) = self.nodes.get(neighbor) {
                *counts.entry(node.group.clone()).or_insert(0) += 1;
            }
        }
        counts
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.incidence.clear();
        self.folded.clear();
    }
}
