//! # corpora-core
//!
//! Core types, traits, and abstractions for the Corpora client.
//!
//! This crate provides the wire models, error taxonomy, configuration,
//! push-event relay and the [`CorporaApi`] trait that the client, graph
//! explorer, content table and job manager crates build on.

pub mod config;
pub mod defaults;
pub mod error;
pub mod events;
pub mod models;
pub mod text;
pub mod traits;

// In-memory API fake for tests
#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export commonly used types at crate root
pub use config::{ClientConfig, ConfigError};
pub use error::{Error, Result};
pub use events::{AlertEvent, EventKind, EventRelay, JobEvent, PushEvent, RelayRegistry};
pub use models::*;
pub use text::decode_entities;
pub use traits::*;
