//! Promtail sidecar management for the `loki_push_api` relation.
//!
//! A workload unit that wants its logs shipped to Loki runs promtail in a
//! sidecar container. This crate drives that sidecar from relation events:
//!
//! - [`provision`] fetches, verifies and installs the promtail binary
//! - [`promtail`] builds and mutates promtail's YAML config
//! - [`membership`] tracks which remote units are active push targets
//! - [`consumer`] sequences the above per relation event
//! - [`provider`] publishes a push API endpoint to consumers
//!
//! The host orchestrator owns event dispatch, relation storage and the
//! sidecar's process supervisor. They are reached through the
//! [`sidecar::Container`], [`relation::RelationData`] and
//! [`membership::StateStore`] traits.

pub mod cli;
pub mod config;
pub mod consumer;
pub mod error;
pub mod membership;
pub mod promtail;
pub mod provider;
pub mod provision;
pub mod relation;
pub mod sidecar;
pub mod testing;
pub mod topology;

pub use config::ProxySettings;
pub use consumer::LogProxyConsumer;
pub use error::{Error, Result};
pub use provider::{LogProxyProvider, PublishOutcome};
pub use relation::RelationEvent;
pub use topology::Topology;

/// Major API version of the relation library.
pub const LIBAPI: u32 = 0;
/// Patch version of the relation library.
pub const LIBPATCH: u32 = 1;
