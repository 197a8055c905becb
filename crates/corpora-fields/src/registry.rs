//! Registry of mounted field widgets, keyed by the element id they render
//! into. Widgets that coordinate (a map beside its coordinate input, a
//! viewer beside its base URL) find each other through it.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use corpora_core::{Error, Result};

#[derive(Debug)]
pub struct WidgetRegistry<W> {
    widgets: BTreeMap<String, W>,
}

impl<W> Default for WidgetRegistry<W> {
    fn default() -> Self {
        Self {
            widgets: BTreeMap::new(),
        }
    }
}

impl<W> WidgetRegistry<W> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount a widget. Fails if `element_id` already holds one; unmount it
    /// first.
    pub fn mount(&mut self, element_id: impl Into<String>, widget: W) -> Result<&mut W> {
        let element_id = element_id.into();
        if element_id.trim().is_empty() {
            return Err(Error::InvalidInput("widget element id is empty".into()));
        }
        if self.widgets.contains_key(&element_id) {
            warn!(element_id = %element_id, "Widget already mounted");
            return Err(Error::InvalidInput(format!(
                "a widget is already mounted on {}",
                element_id
            )));
        }
        debug!(element_id = %element_id, "Widget mounted");
        Ok(self.widgets.entry(element_id).or_insert(widget))
    }

    pub fn get(&self, element_id: &str) -> Option<&W> {
        self.widgets.get(element_id)
    }

    pub fn get_mut(&mut self, element_id: &str) -> Option<&mut W> {
        self.widgets.get_mut(element_id)
    }

    /// Remove and return a widget.
    pub fn unmount(&mut self, element_id: &str) -> Option<W> {
        let widget = self.widgets.remove(element_id);
        if widget.is_some() {
            debug!(element_id, "Widget unmounted");
        }
        widget
    }

    /// Unmount everything, e.g. when the form is torn down.
    pub fn clear(&mut self) -> Vec<(String, W)> {
        let drained: Vec<(String, W)> = std::mem::take(&mut self.widgets).into_iter().collect();
        debug!(count = drained.len(), "Widgets cleared");
        drained
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    pub fn element_ids(&self) -> impl Iterator<Item = &str> {
        self.widgets.keys().map(String::as_str)
    }
}
