//! Settle-time normalization for collapsed relationships: canonical edge
//! direction, thickness scaling and node mass.

use std::collections::{BTreeMap, BTreeSet};

use tracing::trace;

use corpora_core::CollapsedRelationship;

use crate::model::{edge_id, Edge, GraphModel};

/// Thickness bounds and mass cap applied during settle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkScale {
    pub min_thickness: f64,
    pub max_thickness: f64,
    /// Used for edges outside any collapsed relationship, and when every
    /// edge of a relationship has the same frequency.
    pub default_thickness: f64,
    pub max_node_mass: f64,
}

impl Default for LinkScale {
    fn default() -> Self {
        use corpora_core::defaults;
        Self {
            min_thickness: defaults::MIN_LINK_THICKNESS,
            max_thickness: defaults::MAX_LINK_THICKNESS,
            default_thickness: defaults::DEFAULT_LINK_THICKNESS,
            max_node_mass: defaults::MAX_NODE_MASS,
        }
    }
}

fn groups<'a>(model: &'a GraphModel, edge: &Edge) -> Option<(&'a str, &'a str)> {
    let from = model.node(&edge.from)?;
    let to = model.node(&edge.to)?;
    Some((from.group.as_str(), to.group.as_str()))
}

/// Whether `edge` is the reverse-titled twin of a `collapse` edge.
///
/// When both endpoints share a content type the server titles both
/// directions alike, so the edge leaving the greater URI is the reverse.
fn is_reverse(model: &GraphModel, collapse: &CollapsedRelationship, edge: &Edge) -> bool {
    if edge.title != collapse.reverse_wire() {
        return false;
    }
    let Some((from, to)) = groups(model, edge) else {
        return false;
    };
    from == collapse.to_ct
        && to == collapse.from_ct
        && (!collapse.is_symmetric() || edge.from > edge.to)
}

/// Fold every reverse-titled collapsed edge into the canonical
/// `from_ct → to_ct` direction.
///
/// When the forward edge is already plotted the reverse edge's frequency is
/// added to it; otherwise the edge is re-added reversed under the forward
/// title. Canonical edges are never touched, so repeated passes are no-ops.
/// Returns the number of edges rewritten.
pub fn normalize_directions(model: &mut GraphModel, collapses: &[CollapsedRelationship]) -> usize {
    let mut rewritten = 0;

    for collapse in collapses {
        let reversed: Vec<String> = model
            .edges()
            .filter(|edge| is_reverse(model, collapse, edge))
            .filter(|edge| {
                // a folded forward id can never be plotted again
                let forward = edge_id(&edge.to, &edge.from);
                model.edge(&forward).is_some() || !model.is_folded(&forward)
            })
            .map(|edge| edge.id.clone())
            .collect();

        for id in reversed {
            let Some(edge) = model.fold_edge(&id) else {
                continue;
            };
            let forward = edge_id(&edge.to, &edge.from);
            match model.edge_mut(&forward) {
                Some(existing) => {
                    existing.freq += edge.freq;
                    trace!(edge = %forward, freq = existing.freq, "Merged reverse collapsed edge");
                }
                None => {
                    model.add_edge(Edge::new(&edge.to, &edge.from, collapse.wire(), edge.freq));
                    trace!(edge = %forward, "Flipped reverse collapsed edge");
                }
            }
            rewritten += 1;
        }
    }

    rewritten
}

/// Linear min-max scaling of `freq` into `[scale.min, scale.max]`.
///
/// An empty frequency range maps to `scale.default_thickness`.
pub fn scale_thickness(freq: f64, min_freq: f64, max_freq: f64, scale: &LinkScale) -> f64 {
    let range = max_freq - min_freq;
    if !range.is_finite() || range <= f64::EPSILON {
        return scale.default_thickness;
    }
    let t = scale.min_thickness
        + (freq - min_freq) / range * (scale.max_thickness - scale.min_thickness);
    t.clamp(scale.min_thickness, scale.max_thickness)
}

/// Assign edge thickness: edges titled with a collapsed relationship are
/// scaled per relationship, everything else gets the default thickness.
pub fn apply_thickness(
    model: &mut GraphModel,
    collapses: &[CollapsedRelationship],
    scale: &LinkScale,
) {
    let mut members: BTreeMap<String, usize> = BTreeMap::new();
    for edge in model.edges() {
        if let Some((from, to)) = groups(model, edge) {
            let member = |c: &CollapsedRelationship| {
                c.joins(from, to) && (edge.title == c.wire() || edge.title == c.reverse_wire())
            };
            if let Some(index) = collapses.iter().position(member) {
                members.insert(edge.id.clone(), index);
            }
        }
    }

    let mut ranges: BTreeMap<usize, (f64, f64)> = BTreeMap::new();
    for edge in model.edges() {
        if let Some(index) = members.get(&edge.id) {
            let range = ranges.entry(*index).or_insert((edge.freq, edge.freq));
            range.0 = range.0.min(edge.freq);
            range.1 = range.1.max(edge.freq);
        }
    }

    for edge in model.edges_mut() {
        edge.thickness = match members.get(&edge.id).and_then(|i| ranges.get(i)) {
            Some((min, max)) => scale_thickness(edge.freq, *min, *max, scale),
            None => scale.default_thickness,
        };
    }
}

/// Assign node mass: summed incident frequency for groups that are endpoints
/// of a collapsed relationship, incident edge count otherwise, clamped to
/// `[1, scale.max_node_mass]`.
pub fn apply_mass(model: &mut GraphModel, collapses: &[CollapsedRelationship], scale: &LinkScale) {
    let endpoints: BTreeSet<&str> = collapses
        .iter()
        .flat_map(|c| [c.from_ct.as_str(), c.to_ct.as_str()])
        .collect();

    let masses: Vec<(String, f64)> = model
        .nodes()
        .map(|node| {
            let raw = if endpoints.contains(node.group.as_str()) {
                model.incident_edges(&node.uri).map(|e| e.freq).sum::<f64>()
            } else {
                model.degree(&node.uri) as f64
            };
            (node.uri.clone(), raw.clamp(1.0, scale.max_node_mass.max(1.0)))
        })
        .collect();

    for (uri, mass) in masses {
        if let Some(node) = model.node_mut(&uri) {
            node.mass = mass;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::LabelMode;
    use crate::model::Node;

    fn collapse() -> CollapsedRelationship {
        CollapsedRelationship::new("Novel", "Chapter", "Character")
    }

    fn model() -> GraphModel {
        let mut model = GraphModel::new();
        for (uri, group) in [("n1", "Novel"), ("h1", "Character"), ("h2", "Character")] {
            model.add_node(Node::new(uri, uri, group, LabelMode::Full));
        }
        model
    }

    #[test]
    fn test_reverse_edge_merges_into_forward() {
        let mut model = model();
        model.add_edge(Edge::new("n1", "h1", "Novel.Chapter.Character", 2.0));
        model.add_edge(Edge::new("h1", "n1", "Character.Chapter.Novel", 2.0));

        assert_eq!(normalize_directions(&mut model, &[collapse()]), 1);
        assert_eq!(model.edge_count(), 1);
        assert_eq!(model.edge("n1-h1").unwrap().freq, 4.0);
        assert!(!model.add_edge(Edge::new("h1", "n1", "Character.Chapter.Novel", 2.0)));
    }

    #[test]
    fn test_lone_reverse_edge_is_flipped() {
        let mut model = model();
        model.add_edge(Edge::new("h2", "n1", "Character.Chapter.Novel", 3.0));

        normalize_directions(&mut model, &[collapse()]);
        let edge = model.edge("n1-h2").unwrap();
        assert_eq!(edge.freq, 3.0);
        assert_eq!(edge.title, "Novel.Chapter.Character");
        assert!(model.edge("h2-n1").is_none());
    }

    #[test]
    fn test_repeated_passes_leave_canonical_edges() {
        let mut model = model();
        model.add_edge(Edge::new("n1", "h1", "Novel.Chapter.Character", 2.0));
        model.add_edge(Edge::new("h2", "n1", "Character.Chapter.Novel", 3.0));

        assert_eq!(normalize_directions(&mut model, &[collapse()]), 1);
        assert_eq!(normalize_directions(&mut model, &[collapse()]), 0);
        assert_eq!(model.edge_count(), 2);
        assert_eq!(model.edge("n1-h1").unwrap().freq, 2.0);
        assert_eq!(model.edge("n1-h2").unwrap().freq, 3.0);
    }

    #[test]
    fn test_field_edge_between_collapse_endpoints_is_kept() {
        let mut model = model();
        model.add_edge(Edge::new("h1", "n1", "favorite_novel", 1.0));

        assert_eq!(normalize_directions(&mut model, &[collapse()]), 0);
        let edge = model.edge("h1-n1").unwrap();
        assert_eq!(edge.title, "favorite_novel");

        let scale = LinkScale::default();
        model.add_edge(Edge::new("n1", "h2", "Novel.Chapter.Character", 9.0));
        model.add_edge(Edge::new("n1", "h1", "Novel.Chapter.Character", 1.0));
        apply_thickness(&mut model, &[collapse()], &scale);
        assert_eq!(model.edge("h1-n1").unwrap().thickness, scale.default_thickness);
        assert_eq!(model.edge("n1-h2").unwrap().thickness, scale.max_thickness);
    }

    #[test]
    fn test_symmetric_collapse_keeps_one_edge_per_pair() {
        let person = CollapsedRelationship::new("Person", "Document", "Person");
        let mut model = GraphModel::new();
        for uri in ["a", "b", "c"] {
            model.add_node(Node::new(uri, uri, "Person", LabelMode::Full));
        }
        model.add_edge(Edge::new("a", "b", person.wire(), 2.0));
        model.add_edge(Edge::new("b", "a", person.wire(), 2.0));
        model.add_edge(Edge::new("c", "a", person.wire(), 1.0));

        assert_eq!(normalize_directions(&mut model, &[person.clone()]), 2);
        assert_eq!(model.edge_count(), 2);
        assert_eq!(model.edge("a-b").unwrap().freq, 4.0);
        assert_eq!(model.edge("a-c").unwrap().freq, 1.0);

        assert_eq!(normalize_directions(&mut model, &[person]), 0);
        assert_eq!(model.edge_count(), 2);
    }

    #[test]
    fn test_thickness_min_max() {
        let scale = LinkScale::default();
        assert_eq!(scale_thickness(1.0, 1.0, 5.0, &scale), scale.min_thickness);
        assert_eq!(scale_thickness(5.0, 1.0, 5.0, &scale), scale.max_thickness);
        let mid = scale_thickness(3.0, 1.0, 5.0, &scale);
        assert!((mid - (scale.min_thickness + scale.max_thickness) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_thickness_degenerate_range_is_finite() {
        let scale = LinkScale::default();
        let t = scale_thickness(4.0, 4.0, 4.0, &scale);
        assert!(t.is_finite());
        assert_eq!(t, scale.default_thickness);

        let mut model = model();
        model.add_edge(Edge::new("n1", "h1", "Novel.Chapter.Character", 2.0));
        model.add_edge(Edge::new("n1", "h2", "Novel.Chapter.Character", 2.0));
        apply_thickness(&mut model, &[collapse()], &scale);
        assert!(model.edges().all(|e| e.thickness == scale.default_thickness));
    }

    #[test]
    fn test_mass_uses_weight_for_collapse_endpoints() {
        let scale = LinkScale::default();
        let mut model = model();
        model.add_node(Node::new("p1", "p1", "Place", LabelMode::Full));
        model.add_edge(Edge::new("n1", "h1", "Novel.Chapter.Character", 4.0));
        model.add_edge(Edge::new("n1", "h2", "Novel.Chapter.Character", 30.0));
        model.add_edge(Edge::new("h1", "p1", "places", 1.0));
        model.add_edge(Edge::new("h2", "p1", "places", 1.0));

        apply_mass(&mut model, &[collapse()], &scale);
        assert_eq!(model.node("h1").unwrap().mass, 5.0);
        assert_eq!(model.node("n1").unwrap().mass, scale.max_node_mass);
        assert_eq!(model.node("p1").unwrap().mass, 2.0);

        apply_mass(&mut model, &[], &scale);
        assert_eq!(model.node("n1").unwrap().mass, 2.0);
    }
}
