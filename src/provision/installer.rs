//! Fetch, verify and install the promtail binary into the sidecar.

use std::path::PathBuf;

use futures::StreamExt;
use tokio::fs;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::config::ProxySettings;
use crate::error::ProvisionError;
use crate::provision::artifact::{DOWNLOAD_CHUNK_SIZE, ProxyBinary, extract_zip, verify_sha256};
use crate::sidecar::Container;

/// Permissions of the installed executable.
const EXECUTABLE_MODE: u32 = 0o755;

fn download_failure_reason(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "request timed out".to_string()
    } else if error.is_connect() {
        "connection failed".to_string()
    } else if error.is_request() {
        "request failed".to_string()
    } else {
        "network error".to_string()
    }
}

/// Run filesystem-heavy work (hashing, unpacking) off the async workers.
async fn run_blocking<T, F>(task: F) -> Result<T, ProvisionError>
where
    F: FnOnce() -> Result<T, ProvisionError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| ProvisionError::Io(std::io::Error::other(e)))?
}

/// What [`BinaryProvisioner::ensure_installed`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// The executable was already present; nothing was fetched.
    AlreadyInstalled { path: PathBuf },
    /// The archive was downloaded, verified and the executable pushed.
    Installed { path: PathBuf, sha256: String },
}

/// Installs promtail into a sidecar container.
///
/// Downloads are staged on the local filesystem: the archive is streamed
/// into a temporary file inside the staging directory, moved to
/// `archive_path` once complete, verified, then unpacked next to it.
/// Staged files are not cleaned up on failure.
pub struct BinaryProvisioner {
    http: reqwest::Client,
    staging_dir: PathBuf,
    archive_path: PathBuf,
}

impl BinaryProvisioner {
    pub fn new(staging_dir: PathBuf, archive_path: PathBuf) -> Self {
        Self {
            http: reqwest::Client::new(),
            staging_dir,
            archive_path,
        }
    }

    pub fn from_settings(settings: &ProxySettings) -> Self {
        Self::new(settings.staging_dir.clone(), settings.archive_path.clone())
    }

    /// Make sure `binary` is present in `container`.
    ///
    /// An existing file with the executable's name is trusted as is and no
    /// network access happens. Otherwise the archive is fetched and must
    /// hash to `binary.sha256` before anything is pushed into the container.
    pub async fn ensure_installed(
        &self,
        binary: &ProxyBinary,
        container: &dyn Container,
    ) -> Result<ProvisionOutcome, ProvisionError> {
        if self.is_installed(binary, container).await? {
            tracing::debug!(
                "Promtail already present at {}",
                binary.install_path.display()
            );
            return Ok(ProvisionOutcome::AlreadyInstalled {
                path: binary.install_path.clone(),
            });
        }

        tracing::info!("Downloading promtail from {}", binary.url);
        self.download(&binary.url).await?;

        let (archive, expected, url) = (
            self.archive_path.clone(),
            binary.sha256.clone(),
            binary.url.clone(),
        );
        if let Err(e) = run_blocking(move || verify_sha256(&archive, &expected, &url)).await {
            tracing::error!("Promtail binary sha256sum mismatch: {}", e);
            return Err(e);
        }

        let (archive, staging_dir) = (self.archive_path.clone(), self.staging_dir.clone());
        run_blocking(move || extract_zip(&archive, &staging_dir)).await?;
        self.upload(binary, container).await?;

        tracing::info!("Installed promtail to {}", binary.install_path.display());
        Ok(ProvisionOutcome::Installed {
            path: binary.install_path.clone(),
            sha256: binary.sha256.clone(),
        })
    }

    async fn is_installed(
        &self,
        binary: &ProxyBinary,
        container: &dyn Container,
    ) -> Result<bool, ProvisionError> {
        let name = binary.file_name()?;
        let found = container.list_files(binary.install_dir(), name).await?;
        Ok(found.len() == 1)
    }

    /// Stream the archive at `url` to `archive_path`.
    async fn download(&self, url: &str) -> Result<(), ProvisionError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ProvisionError::DownloadFailed {
                url: url.to_string(),
                reason: download_failure_reason(&e),
            })?
            .error_for_status()
            .map_err(|e| ProvisionError::DownloadFailed {
                url: url.to_string(),
                reason: format!(
                    "http status {}",
                    e.status()
                        .map_or("unknown".to_string(), |status| status.as_u16().to_string())
                ),
            })?;

        fs::create_dir_all(&self.staging_dir).await?;
        let staged = tempfile::NamedTempFile::new_in(&self.staging_dir)?;
        let file = fs::File::from_std(staged.as_file().try_clone()?);

        let mut written = 0usize;
        let mut writer = BufWriter::with_capacity(DOWNLOAD_CHUNK_SIZE, file);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ProvisionError::DownloadFailed {
                url: url.to_string(),
                reason: format!("failed to read response body: {}", e),
            })?;
            writer.write_all(&chunk).await?;
            written += chunk.len();
        }
        writer.flush().await?;
        drop(writer);

        let archive_path = self.archive_path.clone();
        run_blocking(move || {
            staged
                .persist(&archive_path)
                .map(drop)
                .map_err(|e| ProvisionError::Io(e.error))
        })
        .await?;

        tracing::debug!(
            "Downloaded {} bytes to {}",
            written,
            self.archive_path.display()
        );
        Ok(())
    }

    /// Push the unpacked executable into the container.
    async fn upload(
        &self,
        binary: &ProxyBinary,
        container: &dyn Container,
    ) -> Result<(), ProvisionError> {
        let name = binary.file_name()?;
        let extracted = self.staging_dir.join(name);
        let bytes = match fs::read(&extracted).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ProvisionError::MissingExecutable {
                    archive: self.archive_path.clone(),
                    name: name.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        container
            .push(&binary.install_path, &bytes, Some(EXECUTABLE_MODE))
            .await?;
        Ok(())
    }
}
