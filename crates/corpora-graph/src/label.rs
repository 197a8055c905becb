//! Node label display formatting.

use serde::{Deserialize, Serialize};

use corpora_core::defaults;

/// How node labels are displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "chars")]
pub enum LabelMode {
    Full,
    /// Keep at most this many characters, then append an ellipsis.
    Truncated(usize),
    Hidden,
}

impl Default for LabelMode {
    fn default() -> Self {
        LabelMode::Truncated(defaults::LABEL_TRUNCATE_CHARS)
    }
}

impl LabelMode {
    /// Format a decoded label for display.
    pub fn format(&self, label: &str) -> String {
        match self {
            LabelMode::Full => label.to_string(),
            LabelMode::Hidden => String::new(),
            LabelMode::Truncated(max) => {
                if label.chars().count() <= *max {
                    label.to_string()
                } else {
                    let mut out: String = label.chars().take(*max).collect();
                    out.push('…');
                    out
                }
            }
        }
    }
}
