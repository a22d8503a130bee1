//! The promtail artifact: what to fetch, how to verify and unpack it.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::ProvisionError;

/// Read and write granularity for the archive.
pub const DOWNLOAD_CHUNK_SIZE: usize = 8192;

/// A versioned promtail executable distributed as a zip archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyBinary {
    /// Archive download URL.
    pub url: String,
    /// Expected lowercase hex SHA-256 of the archive.
    pub sha256: String,
    /// Executable path inside the sidecar.
    pub install_path: PathBuf,
}

impl ProxyBinary {
    /// File name of the executable, which is also its name inside the archive.
    pub fn file_name(&self) -> Result<&str, ProvisionError> {
        self.install_path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| ProvisionError::InvalidInstallPath {
                path: self.install_path.clone(),
            })
    }

    /// Directory the executable is installed in.
    pub fn install_dir(&self) -> &Path {
        self.install_path.parent().unwrap_or(Path::new("/"))
    }
}

/// SHA-256 of a file, as lowercase hex.
pub fn file_sha256(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; DOWNLOAD_CHUNK_SIZE];
    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Check a staged archive against the expected digest.
pub fn verify_sha256(path: &Path, expected: &str, url: &str) -> Result<(), ProvisionError> {
    let actual = file_sha256(path)?;
    if !actual.eq_ignore_ascii_case(expected) {
        return Err(ProvisionError::DigestMismatch {
            url: url.to_string(),
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}

/// Unpack a zip archive into `dest`.
pub fn extract_zip(archive: &Path, dest: &Path) -> Result<(), ProvisionError> {
    let to_error = |e: zip::result::ZipError| ProvisionError::Extract {
        archive: archive.to_path_buf(),
        reason: e.to_string(),
    };

    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file).map_err(to_error)?;
    zip.extract(dest).map_err(to_error)?;
    Ok(())
}
