//! # corpora-table
//!
//! Headless engine behind the Corpora content table: one content type's
//! records, loaded page by page as the user scrolls, bound to a mutable
//! search/sort/filter state, with multi-select bulk actions.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use corpora_table::{ContentTable, TableConfig};
//!
//! let table = ContentTable::new(Arc::new(api), "42", "Book", TableConfig::default());
//! table.reload().await?;
//! table.on_last_row_visible(1).await?;
//! table.order_by("title").await?;
//! ```

pub mod search;
pub mod selection;
pub mod table;

pub use search::{SearchState, SearchType, SortDirection};
pub use selection::Selection;
pub use table::{BulkOutcome, ContentTable, PageRequest, PendingConfirmation, TableConfig};
