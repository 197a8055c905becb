//! Row selection for bulk actions.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use corpora_core::ContentSelection;

/// Either every record matching the search, or an explicit id set.
///
/// The two are exclusive: while `All` is active individual rows are implied
/// and cannot be toggled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    All,
    Ids(BTreeSet<String>),
}

impl Default for Selection {
    fn default() -> Self {
        Selection::Ids(BTreeSet::new())
    }
}

impl Selection {
    pub fn select_all(&mut self) {
        *self = Selection::All;
    }

    pub fn clear(&mut self) {
        *self = Selection::default();
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Selection::All)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Selection::Ids(ids) if ids.is_empty())
    }

    pub fn is_selected(&self, id: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::Ids(ids) => ids.contains(id),
        }
    }

    /// Toggle one row. Returns the row's new state, or `None` while `All`
    /// is active.
    pub fn toggle(&mut self, id: &str) -> Option<bool> {
        match self {
            Selection::All => None,
            Selection::Ids(ids) => {
                if ids.remove(id) {
                    Some(false)
                } else {
                    ids.insert(id.to_string());
                    Some(true)
                }
            }
        }
    }

    /// Wire form for bulk-action submission.
    pub fn bulk_selection(&self) -> ContentSelection {
        match self {
            Selection::All => ContentSelection::All,
            Selection::Ids(ids) => ContentSelection::Ids(ids.iter().cloned().collect()),
        }
    }
}
