//! Promtail sidecar management.
//!
//! The sidecar is a container co-located with the workload. It is reached
//! through the host's supervision API, modelled by the [`Container`] trait:
//! files are pushed and pulled, service layers are merged into the plan, and
//! services are restarted or stopped by name.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       SidecarManager                         │
//! │                                                              │
//! │   load_config() ──▶ mutate ──▶ store_config()                │
//! │                                     │                        │
//! │                                     ▼                        │
//! │                              declare_layer()                 │
//! │                                     │                        │
//! │                     ┌───────────────┴──────────────┐         │
//! │                     ▼                              ▼         │
//! │              restart_all()                      stop()       │
//! │          (workload, then promtail)         (no clients left) │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod container;
pub mod error;
pub mod local;
pub mod manager;

pub use config::{Layer, Override, ServiceSpec, Startup};
pub use container::{Container, resolve_container_name, select_container};
pub use error::{ContainerError, Result};
pub use local::LocalContainer;
pub use manager::{SidecarManager, SidecarState};
