//! plantrack-core library.
//!
//! Resolves loosely-shaped infrastructure project records into a uniform
//! [`model::Project`], tracks projects per user, keeps per-project notes and
//! aggregates dashboard summaries over a [`store::DocumentStore`].

pub mod config;
pub mod dashboard;
pub mod error;
pub mod format;
pub mod model;
pub mod notes;
pub mod profile;
pub mod session;
pub mod store;
pub mod tracking;

// Conventions:
// - Errors: typed `thiserror` enums at service boundaries, `anyhow::Result` for plumbing.
// - Logging: `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub use error::{CoreError, ErrorCode, ValidationError};
pub use session::{Session, UserId};
