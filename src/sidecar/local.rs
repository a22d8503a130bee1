//! A container backed by a directory on the local filesystem.
//!
//! Used by the CLI to install promtail outside of a managed sidecar. Paths
//! inside the "container" are re-rooted under the directory. There is no
//! process supervisor, so layer and service operations are unsupported.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::sidecar::config::Layer;
use crate::sidecar::container::Container;
use crate::sidecar::error::{ContainerError, Result};

pub struct LocalContainer {
    name: String,
    root: PathBuf,
}

impl LocalContainer {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }

    /// Map a container path onto the host directory.
    pub fn host_path(&self, path: &Path) -> PathBuf {
        let relative: PathBuf = path
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .collect();
        self.root.join(relative)
    }
}

#[async_trait]
impl Container for LocalContainer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_files(&self, dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
        let host_dir = self.host_path(dir);
        let mut entries = match fs::read_dir(&host_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut found = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_name().to_str() == Some(pattern) {
                found.push(dir.join(pattern));
            }
        }
        Ok(found)
    }

    async fn push(&self, path: &Path, contents: &[u8], permissions: Option<u32>) -> Result<()> {
        let target = self.host_path(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&target, contents).await?;
        if let Some(mode) = permissions {
            set_mode(&target, mode).await?;
        }

        tracing::debug!("Pushed {} bytes to {}", contents.len(), target.display());
        Ok(())
    }

    async fn pull(&self, path: &Path) -> Result<Vec<u8>> {
        match fs::read(self.host_path(path)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ContainerError::NotFound {
                path: path.to_path_buf(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn add_layer(&self, _label: &str, _layer: &Layer, _combine: bool) -> Result<()> {
        Err(ContainerError::Unsupported {
            operation: "add_layer",
        })
    }

    async fn restart(&self, _services: &[&str]) -> Result<()> {
        Err(ContainerError::Unsupported {
            operation: "restart",
        })
    }

    async fn stop(&self, _services: &[&str]) -> Result<()> {
        Err(ContainerError::Unsupported { operation: "stop" })
    }
}

#[cfg(unix)]
async fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await
}

#[cfg(not(unix))]
async fn set_mode(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_path_is_rerooted() {
        let container = LocalContainer::new("local", "/srv/proxy");
        assert_eq!(
            container.host_path(Path::new("/tmp/promtail-linux-amd64")),
            PathBuf::from("/srv/proxy/tmp/promtail-linux-amd64")
        );
        assert_eq!(
            container.host_path(Path::new("/tmp/../etc/passwd")),
            PathBuf::from("/srv/proxy/tmp/etc/passwd")
        );
    }

    #[tokio::test]
    async fn test_push_pull_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let container = LocalContainer::new("local", dir.path());

        container
            .push(Path::new("/tmp/promtail"), b"#!/bin/sh\n", Some(0o755))
            .await
            .unwrap();

        let listed = container
            .list_files(Path::new("/tmp"), "promtail")
            .await
            .unwrap();
        assert_eq!(listed, vec![PathBuf::from("/tmp/promtail")]);

        let contents = container.pull(Path::new("/tmp/promtail")).await.unwrap();
        assert_eq!(contents, b"#!/bin/sh\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_push_sets_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let container = LocalContainer::new("local", dir.path());
        container
            .push(Path::new("/tmp/promtail"), b"bin", Some(0o755))
            .await
            .unwrap();

        let meta = std::fs::metadata(dir.path().join("tmp/promtail")).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o755);
    }

    #[tokio::test]
    async fn test_list_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let container = LocalContainer::new("local", dir.path());
        let listed = container
            .list_files(Path::new("/nowhere"), "promtail")
            .await
            .unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn test_pull_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let container = LocalContainer::new("local", dir.path());
        let err = container.pull(Path::new("/tmp/none")).await.unwrap_err();
        assert!(matches!(err, ContainerError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_supervision_is_unsupported() {
        let container = LocalContainer::new("local", "/srv/proxy");
        let err = container.restart(&["promtail"]).await.unwrap_err();
        assert!(matches!(err, ContainerError::Unsupported { operation: "restart" }));
    }
}
