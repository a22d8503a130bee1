//! In-memory stand-ins for the host collaborators.
//!
//! Provides:
//! - [`StubContainer`]: a sidecar container with an in-memory filesystem that
//!   records every supervision call
//! - [`MemoryStateStore`]: unit-scoped stored state
//! - [`MemoryRelation`]: this unit's relation data bag plus bind address
//! - [`promtail_zip`] / [`sha256_hex`]: archive fixtures
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use log_proxy::testing::StubContainer;
//!
//! let container = Arc::new(StubContainer::new("workload"));
//! container.put_file("/tmp/promtail-linux-amd64", b"promtail".to_vec());
//! ```

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::RelationError;
use crate::membership::StateStore;
use crate::relation::RelationData;
use crate::sidecar::{Container, ContainerError, Layer};

/// A call made against a [`StubContainer`]. Reads are not recorded.
#[derive(Debug, Clone, PartialEq)]
pub enum ContainerCall {
    Push {
        path: PathBuf,
        permissions: Option<u32>,
    },
    AddLayer {
        label: String,
        layer: Layer,
        combine: bool,
    },
    Restart(Vec<String>),
    Stop(Vec<String>),
}

#[derive(Debug, Clone)]
struct StoredFile {
    contents: Vec<u8>,
    permissions: Option<u32>,
}

/// A sidecar container backed by a map of files.
pub struct StubContainer {
    name: String,
    files: Mutex<HashMap<PathBuf, StoredFile>>,
    calls: Mutex<Vec<ContainerCall>>,
    fail_restart: Mutex<bool>,
}

impl StubContainer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            files: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            fail_restart: Mutex::new(false),
        }
    }

    /// Seed a file without recording a call.
    pub fn put_file(&self, path: impl Into<PathBuf>, contents: Vec<u8>) {
        self.files.lock().expect("files lock").insert(
            path.into(),
            StoredFile {
                contents,
                permissions: None,
            },
        );
    }

    pub fn file(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.files
            .lock()
            .expect("files lock")
            .get(path.as_ref())
            .map(|f| f.contents.clone())
    }

    pub fn mode(&self, path: impl AsRef<Path>) -> Option<u32> {
        self.files
            .lock()
            .expect("files lock")
            .get(path.as_ref())
            .and_then(|f| f.permissions)
    }

    pub fn calls(&self) -> Vec<ContainerCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    /// Make subsequent restarts fail with an API error.
    pub fn set_fail_restart(&self, fail: bool) {
        *self.fail_restart.lock().expect("fail lock") = fail;
    }

    fn record(&self, call: ContainerCall) {
        self.calls.lock().expect("calls lock").push(call);
    }
}

fn owned(services: &[&str]) -> Vec<String> {
    services.iter().map(|s| s.to_string()).collect()
}

#[async_trait]
impl Container for StubContainer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_files(&self, dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, ContainerError> {
        let files = self.files.lock().expect("files lock");
        Ok(files
            .keys()
            .filter(|path| {
                path.parent() == Some(dir)
                    && path.file_name().and_then(|n| n.to_str()) == Some(pattern)
            })
            .cloned()
            .collect())
    }

    async fn push(
        &self,
        path: &Path,
        contents: &[u8],
        permissions: Option<u32>,
    ) -> Result<(), ContainerError> {
        self.files.lock().expect("files lock").insert(
            path.to_path_buf(),
            StoredFile {
                contents: contents.to_vec(),
                permissions,
            },
        );
        self.record(ContainerCall::Push {
            path: path.to_path_buf(),
            permissions,
        });
        Ok(())
    }

    async fn pull(&self, path: &Path) -> Result<Vec<u8>, ContainerError> {
        self.file(path).ok_or_else(|| ContainerError::NotFound {
            path: path.to_path_buf(),
        })
    }

    async fn add_layer(
        &self,
        label: &str,
        layer: &Layer,
        combine: bool,
    ) -> Result<(), ContainerError> {
        self.record(ContainerCall::AddLayer {
            label: label.to_string(),
            layer: layer.clone(),
            combine,
        });
        Ok(())
    }

    async fn restart(&self, services: &[&str]) -> Result<(), ContainerError> {
        if *self.fail_restart.lock().expect("fail lock") {
            return Err(ContainerError::Api {
                operation: "restart",
                reason: "service failed to start".to_string(),
            });
        }
        self.record(ContainerCall::Restart(owned(services)));
        Ok(())
    }

    async fn stop(&self, services: &[&str]) -> Result<(), ContainerError> {
        self.record(ContainerCall::Stop(owned(services)));
        Ok(())
    }
}

/// Stored state held in memory.
#[derive(Default)]
pub struct MemoryStateStore {
    values: Mutex<HashMap<String, String>>,
}

impl StateStore for MemoryStateStore {
    fn load(&self, key: &str) -> Option<String> {
        self.values.lock().expect("state lock").get(key).cloned()
    }

    fn save(&self, key: &str, value: String) {
        self.values
            .lock()
            .expect("state lock")
            .insert(key.to_string(), value);
    }
}

/// This unit's relation data bag held in memory.
#[derive(Default)]
pub struct MemoryRelation {
    local: Mutex<HashMap<String, String>>,
    bind_address: Option<IpAddr>,
    writes: AtomicU32,
}

impl MemoryRelation {
    pub fn bound(addr: IpAddr) -> Self {
        Self {
            bind_address: Some(addr),
            ..Default::default()
        }
    }

    pub fn local(&self, key: &str) -> Option<String> {
        self.local.lock().expect("relation lock").get(key).cloned()
    }

    /// Number of writes made to the data bag.
    pub fn writes(&self) -> u32 {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RelationData for MemoryRelation {
    async fn get(&self, key: &str) -> Option<String> {
        self.local(key)
    }

    async fn set(&self, key: &str, value: String) -> Result<(), RelationError> {
        self.local
            .lock()
            .expect("relation lock")
            .insert(key.to_string(), value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn bind_address(&self) -> Option<IpAddr> {
        self.bind_address
    }
}

/// A zip archive holding one file `name` with `contents`.
pub fn promtail_zip(name: &str, contents: &[u8]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored)
        .unix_permissions(0o755);
    writer.start_file(name, options).expect("start zip entry");
    writer.write_all(contents).expect("write zip entry");
    writer.finish().expect("finish zip").into_inner()
}

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
