//! The sidecar container as seen through the host's supervision API.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::sidecar::config::Layer;
use crate::sidecar::error::{ContainerError, Result};

/// File access and process supervision inside one sidecar container.
///
/// Implemented by the host integration; the controller only ever holds one
/// instance per unit.
#[async_trait]
pub trait Container: Send + Sync {
    /// Container name, also used as the layer label.
    fn name(&self) -> &str;

    /// List files in `dir` whose file name equals `pattern`.
    async fn list_files(&self, dir: &Path, pattern: &str) -> Result<Vec<PathBuf>>;

    /// Write `contents` to `path`, replacing any existing file.
    async fn push(&self, path: &Path, contents: &[u8], permissions: Option<u32>) -> Result<()>;

    /// Read the full contents of `path`.
    async fn pull(&self, path: &Path) -> Result<Vec<u8>>;

    /// Add a service layer. With `combine`, services of the same name are
    /// merged into the existing plan instead of rejected.
    async fn add_layer(&self, label: &str, layer: &Layer, combine: bool) -> Result<()>;

    /// Restart (or start) the named services.
    async fn restart(&self, services: &[&str]) -> Result<()>;

    /// Stop the named services.
    async fn stop(&self, services: &[&str]) -> Result<()>;
}

/// Pick the sidecar container name.
///
/// An explicit name always wins. Otherwise the unit must have exactly one
/// container.
pub fn resolve_container_name(explicit: Option<&str>, available: &[String]) -> Result<String> {
    if let Some(name) = explicit {
        return Ok(name.to_string());
    }

    match available {
        [only] => Ok(only.clone()),
        [] => Err(ContainerError::Resolution {
            reason: "unit has no containers".to_string(),
        }),
        many => Err(ContainerError::Resolution {
            reason: format!(
                "{} containers available ({}), set one explicitly",
                many.len(),
                many.join(", ")
            ),
        }),
    }
}

/// Pick the sidecar container among the unit's `containers`.
///
/// Resolves the name with [`resolve_container_name`]; an explicit name that
/// matches none of the containers is a resolution error too.
pub fn select_container(
    explicit: Option<&str>,
    containers: &[Arc<dyn Container>],
) -> Result<Arc<dyn Container>> {
    let available: Vec<String> = containers.iter().map(|c| c.name().to_string()).collect();
    let name = resolve_container_name(explicit, &available)?;

    containers
        .iter()
        .find(|c| c.name() == name)
        .cloned()
        .ok_or_else(|| ContainerError::Resolution {
            reason: format!(
                "no container named '{}' (available: {})",
                name,
                available.join(", ")
            ),
        })
}
