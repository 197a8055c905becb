//! Per-node detail panes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::GraphModel;

/// Plotted vs. known totals for one relationship path of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanePath {
    pub path: String,
    pub plotted: u64,
    pub total: u64,
}

impl PanePath {
    pub fn has_more(&self) -> bool {
        self.plotted < self.total
    }
}

/// What a detail pane shows for one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaneSummary {
    pub uri: String,
    pub label: String,
    pub group: String,
    pub paths: Vec<PanePath>,
}

impl PaneSummary {
    /// Summary for `uri` from its cached meta, or `None` if not plotted.
    pub fn for_node(model: &GraphModel, uri: &str) -> Option<Self> {
        let node = model.node(uri)?;
        let plotted = model.neighbor_counts(uri);
        let paths = node
            .meta
            .iter()
            .flatten()
            .map(|(path, total)| PanePath {
                path: path.clone(),
                plotted: plotted.get(path).copied().unwrap_or(0),
                total: *total,
            })
            .collect();
        Some(Self {
            uri: node.uri.clone(),
            label: node.raw_label.clone(),
            group: node.group.clone(),
            paths,
        })
    }
}

/// Which panes are open and which need re-rendering.
#[derive(Debug, Clone, Default)]
pub struct DetailPanes {
    /// uri → needs re-render
    open: BTreeMap<String, bool>,
}

impl DetailPanes {
    pub fn open(&mut self, uri: &str) {
        self.open.insert(uri.to_string(), false);
    }

    pub fn close(&mut self, uri: &str) -> bool {
        self.open.remove(uri).is_some()
    }

    pub fn is_open(&self, uri: &str) -> bool {
        self.open.contains_key(uri)
    }

    pub fn open_uris(&self) -> impl Iterator<Item = &str> {
        self.open.keys().map(String::as_str)
    }

    /// Flag an open pane for re-render. Closed panes are ignored.
    pub fn mark_dirty(&mut self, uri: &str) -> bool {
        match self.open.get_mut(uri) {
            Some(dirty) => {
                *dirty = true;
                true
            }
            None => false,
        }
    }

    /// Drain the set of panes needing re-render.
    pub fn take_dirty(&mut self) -> Vec<String> {
        self.open
            .iter_mut()
            .filter(|(_, dirty)| **dirty)
            .map(|(uri, dirty)| {
                *dirty = false;
                uri.clone()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::LabelMode;
    use crate::model::{Edge, Node};

    #[test]
    fn test_summary_reports_plotted_and_total() {
        let mut model = GraphModel::new();
        let mut book = Node::new("b", "Emma", "Book", LabelMode::Full);
        book.meta = Some([("Chapter".to_string(), 15), ("Author".to_string(), 1)].into());
        model.add_node(book);
        model.add_node(Node::new("c1", "One", "Chapter", LabelMode::Full));
        model.add_edge(Edge::new("b", "c1", "chapters", 1.0));

        let summary = PaneSummary::for_node(&model, "b").unwrap();
        assert_eq!(summary.paths.len(), 2);
        let chapters = summary.paths.iter().find(|p| p.path == "Chapter").unwrap();
        assert_eq!((chapters.plotted, chapters.total), (1, 15));
        assert!(chapters.has_more());
        assert!(PaneSummary::for_node(&model, "missing").is_none());
    }

    #[test]
    fn test_dirty_tracking_only_for_open_panes() {
        let mut panes = DetailPanes::default();
        panes.open("a");
        assert!(panes.mark_dirty("a"));
        assert!(!panes.mark_dirty("b"));
        assert_eq!(panes.take_dirty(), vec!["a".to_string()]);
        assert!(panes.take_dirty().is_empty());
        assert!(panes.close("a"));
        assert!(!panes.is_open("a"));
    }
}
