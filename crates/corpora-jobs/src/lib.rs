//! # corpora-jobs
//!
//! Job submission and monitoring for content records: which tasks the
//! scholar may run, a parameter form driven by each task's declarative
//! schema, and a manager that keeps live progress in step with push events.

pub mod form;
pub mod manager;
pub mod params;
pub mod permissions;

pub use form::{FormField, JobForm};
pub use manager::{EventOutcome, JobManager};
pub use params::ParameterType;
pub use permissions::{permitted_tasks, PermittedTask};
