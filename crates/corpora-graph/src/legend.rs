//! Group legend with stable per-group colours.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::GraphModel;

/// Colour used for seed nodes regardless of their group.
pub const SEED_COLOR: &str = "#f5c518";

/// Fixed palette groups are hashed into.
pub const PALETTE: [&str; 12] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf", "#393b79", "#637939",
];

/// Colour for a group; the same name always maps to the same colour.
pub fn group_color(group: &str) -> &'static str {
    // FNV-1a
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in group.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    PALETTE[(hash % PALETTE.len() as u64) as usize]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegendEntry {
    pub group: String,
    pub color: String,
    /// Plotted nodes of this group.
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Legend {
    pub entries: Vec<LegendEntry>,
    pub seed_color: String,
}

impl Legend {
    /// One entry per group currently plotted, ordered by group name.
    pub fn build(model: &GraphModel) -> Self {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for node in model.nodes() {
            *counts.entry(node.group.as_str()).or_insert(0) += 1;
        }
        let entries = counts
            .into_iter()
            .map(|(group, count)| LegendEntry {
                group: group.to_string(),
                color: group_color(group).to_string(),
                count,
            })
            .collect();
        Self {
            entries,
            seed_color: SEED_COLOR.to_string(),
        }
    }

    /// Colour a node is drawn with.
    pub fn color_for(&self, group: &str, is_seed: bool) -> &str {
        if is_seed {
            return &self.seed_color;
        }
        self.entries
            .iter()
            .find(|e| e.group == group)
            .map(|e| e.color.as_str())
            .unwrap_or_else(|| group_color(group))
    }
}
