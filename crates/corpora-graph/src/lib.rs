//! # corpora-graph
//!
//! Incremental content-relationship graph explorer.
//!
//! The explorer keeps a client-local subgraph of the corpus and grows it on
//! demand: each [`GraphExplorer::sprawl`] fetches one page of a node's
//! network neighborhood per related type and merges it without ever
//! duplicating a node or edge. Collapsed relationships, hidden types and
//! content-view filters shape what the server returns; changing any of them
//! resets the graph and re-explores from the seeds.
//!
//! Expensive global passes (collapse normalization, edge thickness, node
//! mass, legend) run once per batch in [`GraphExplorer::settle`], after
//! [`GraphExplorer::await_quiescence`] reports that no sprawl is in flight.
//! [`GraphExplorer::expand`] runs that pass itself when it ends a batch.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use corpora_client::HttpCorporaApi;
//! use corpora_graph::{ExplorerConfig, GraphExplorer};
//!
//! # async fn run() -> corpora_core::Result<()> {
//! let api = Arc::new(HttpCorporaApi::from_env()?);
//! let explorer = GraphExplorer::new(api, ExplorerConfig::default());
//! explorer.explore(&["/corpus/42/Book/7".to_string()]).await?;
//! let snapshot = explorer.snapshot().await;
//! println!("{} nodes", snapshot.nodes.len());
//! # Ok(())
//! # }
//! ```

pub mod collapse;
pub mod explorer;
pub mod label;
pub mod legend;
pub mod model;
pub mod panes;
pub mod quiescence;

pub use collapse::LinkScale;
pub use explorer::{
    Expansion, ExplorerConfig, GraphExplorer, GraphSnapshot, SettleReport, SprawlOptions,
    SprawlOutcome,
};
pub use label::LabelMode;
pub use legend::{Legend, LegendEntry};
pub use model::{Edge, GraphModel, Node};
pub use panes::{PanePath, PaneSummary};
pub use quiescence::{PendingGuard, PendingOps};
