//! Search, sort and pagination state for one content table.
//!
//! The state is mutated in place by table actions and rendered in full on
//! every list request; nothing is diffed or sent incrementally.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use corpora_core::{defaults, Error, Result};

/// Search semantics selected by a field parameter's key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    /// `f_`: exact match.
    Filter,
    /// `t_`: term match.
    Term,
    /// `p_`: phrase match.
    Phrase,
    /// `w_`: wildcard match.
    Wildcard,
    /// `r_`: range, `from to`.
    Range,
}

impl SearchType {
    pub const ALL: [SearchType; 5] = [
        SearchType::Filter,
        SearchType::Term,
        SearchType::Phrase,
        SearchType::Wildcard,
        SearchType::Range,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            SearchType::Filter => "f_",
            SearchType::Term => "t_",
            SearchType::Phrase => "p_",
            SearchType::Wildcard => "w_",
            SearchType::Range => "r_",
        }
    }

    /// Split a wire key like `f_author` into its type and field.
    pub fn split_key(key: &str) -> Option<(SearchType, &str)> {
        Self::ALL.iter().find_map(|t| {
            key.strip_prefix(t.prefix())
                .filter(|field| !field.is_empty())
                .map(|field| (*t, field))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        })
    }
}

impl FromStr for SortDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(Error::InvalidInput(format!(
                "sort direction must be asc or desc, got: {}",
                other
            ))),
        }
    }
}

/// The single source of truth for a table's list requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchState {
    /// Free-text query.
    pub q: Option<String>,
    /// Typed field params keyed by full wire key (`f_author`, `r_year`).
    pub params: BTreeMap<String, String>,
    /// Active sort, `(field, direction)`.
    pub sort: Option<(String, SortDirection)>,
    pub page: u32,
    pub page_size: u32,
    pub page_token: Option<String>,
    pub content_view: Option<String>,
}

impl Default for SearchState {
    fn default() -> Self {
        Self::new(defaults::PAGE_SIZE)
    }
}

impl SearchState {
    pub fn new(page_size: u32) -> Self {
        Self {
            q: None,
            params: BTreeMap::new(),
            sort: None,
            page: 1,
            page_size: page_size.max(1),
            page_token: None,
            content_view: None,
        }
    }

    /// Back to the first page; any cursor is dropped.
    pub fn reset_page(&mut self) {
        self.page = 1;
        self.page_token = None;
    }

    /// Set the free-text query; blank clears it.
    pub fn set_query(&mut self, q: &str) {
        let q = q.trim();
        self.q = (!q.is_empty()).then(|| q.to_string());
        self.reset_page();
    }

    /// Set a typed field param. An empty value removes it.
    pub fn set_param(&mut self, search_type: SearchType, field: &str, value: &str) {
        let key = format!("{}{}", search_type.prefix(), field);
        if value.is_empty() {
            self.params.remove(&key);
        } else {
            self.params.insert(key, value.to_string());
        }
        self.reset_page();
    }

    /// Remove a param by wire key (`q`, `content_view`, `s_*` or a typed
    /// field key) and go back to page 1. Returns whether anything changed.
    pub fn remove_param(&mut self, key: &str) -> bool {
        let removed = match key {
            "q" => self.q.take().is_some(),
            "content_view" => self.content_view.take().is_some(),
            _ => match key.strip_prefix("s_") {
                Some(field) if self.sort.as_ref().is_some_and(|(f, _)| f == field) => {
                    self.sort = None;
                    true
                }
                Some(_) => false,
                None => self.params.remove(key).is_some(),
            },
        };
        self.reset_page();
        removed
    }

    /// Sort by `field`: ascending when newly chosen, toggled when already
    /// active. Resets to page 1.
    pub fn order_by(&mut self, field: &str) -> SortDirection {
        let direction = match &self.sort {
            Some((current, dir)) if current == field => dir.toggled(),
            _ => SortDirection::Asc,
        };
        self.sort = Some((field.to_string(), direction));
        self.reset_page();
        direction
    }

    pub fn set_content_view(&mut self, view_id: Option<&str>) {
        self.content_view = view_id.map(str::to_string);
        self.reset_page();
    }

    /// Search-defining params: everything except pagination.
    pub fn search_params(&self) -> BTreeMap<String, String> {
        let mut out = self.params.clone();
        if let Some(q) = &self.q {
            out.insert("q".to_string(), q.clone());
        }
        if let Some((field, dir)) = &self.sort {
            out.insert(format!("s_{}", field), dir.to_string());
        }
        if let Some(view) = &self.content_view {
            out.insert("content_view".to_string(), view.clone());
        }
        out
    }

    /// Render the full state as list query params.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self.search_params().into_iter().collect();
        match &self.page_token {
            Some(token) => pairs.push(("page-token".to_string(), token.clone())),
            None => pairs.push(("page".to_string(), self.page.to_string())),
        }
        pairs.push(("page-size".to_string(), self.page_size.to_string()));
        pairs
    }

    /// Rebuild state from query params, e.g. a bookmarked table URL.
    /// Unknown keys are ignored.
    pub fn from_query_pairs(pairs: &[(String, String)]) -> Result<Self> {
        let mut state = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "q" => state.q = Some(value.clone()),
                "page" => {
                    state.page = value
                        .parse::<u32>()
                        .map_err(|_| Error::InvalidInput(format!("bad page: {}", value)))?
                        .max(1)
                }
                "page-size" => {
                    state.page_size = value
                        .parse::<u32>()
                        .map_err(|_| Error::InvalidInput(format!("bad page-size: {}", value)))?
                        .max(1)
                }
                "page-token" => state.page_token = Some(value.clone()),
                "content_view" => state.content_view = Some(value.clone()),
                _ => {
                    if let Some(field) = key.strip_prefix("s_") {
                        state.sort = Some((field.to_string(), value.parse()?));
                    } else if SearchType::split_key(key).is_some() {
                        state.params.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        Ok(state)
    }
}
