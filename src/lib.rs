//! Submission core
//!
//! Ingests hierarchical submission packages (a dataset and its nested sample
//! sites, observations, artifacts), validates each feature against its type's
//! schema, and tracks rule-based security over every node:
//!
//! - [`schema_cache`] and [`validation`]: schema lookups and property checks
//! - [`feature_tree`]: nested payload to parent-linked rows
//! - [`security`]: rule assignment, status classification, review rollups,
//!   per-user persecution/harm exceptions
//! - [`intake`]: validate then insert, with a reindex signal afterwards
//!
//! Storage is reached through the traits in [`ports`]; [`memory::MemoryStore`]
//! implements them in-process and the `database` feature adds Postgres
//! adapters.

pub mod catalog;
pub mod config;
pub mod error;
pub mod feature_tree;
pub mod intake;
pub mod memory;
pub mod models;
pub mod ports;
pub mod schema_cache;
pub mod security;
pub mod service;
pub mod telemetry;
pub mod validation;

#[cfg(feature = "database")]
pub mod database;

pub use config::{CoreConfig, DatabaseConfig};
pub use error::{IntegrityViolation, Result, SubmissionError, ValidationError};
pub use intake::{IngestReport, SubmissionIntakeService};
pub use models::{FeatureNodeInput, SecurityStatus, SecurityTarget};
pub use service::{Stores, SubmissionCore};
