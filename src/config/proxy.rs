use std::path::PathBuf;

use crate::config::helpers::{optional_env, parse_or};
use crate::error::ConfigError;
use crate::provision::ProxyBinary;

/// Pinned upstream promtail release.
pub const PROMTAIL_BINARY_ZIP_URL: &str =
    "https://github.com/grafana/loki/releases/download/v2.4.1/promtail-linux-amd64.zip";
/// SHA-256 of [`PROMTAIL_BINARY_ZIP_URL`].
pub const PROMTAIL_BINARY_SHA256: &str =
    "978391a174e71cfef444ab9dc012f95d5d7eae0d682eaf1da2ea18f793452031";
pub const BINARY_ZIP_PATH: &str = "/tmp/promtail-linux-amd64.zip";
pub const BINARY_DIR: &str = "/tmp";
pub const WORKLOAD_BINARY_PATH: &str = "/tmp/promtail-linux-amd64";
pub const CONFIG_PATH: &str = "/tmp/promtail_config.yml";
pub const POSITIONS_FILENAME: &str = "/tmp/positions.yaml";
pub const SERVICE_NAME: &str = "promtail";
pub const DEFAULT_RELATION_NAME: &str = "log_proxy";
pub const HTTP_LISTEN_PORT: u16 = 9080;
pub const GRPC_LISTEN_PORT: u16 = 0;
/// Loki's default push API port, advertised by the provider side.
pub const PUSH_API_PORT: u16 = 3100;

/// Settings for the promtail sidecar and the `loki_push_api` relation.
///
/// Every field defaults to the pinned constants above; environment
/// variables override them for local testing and alternative releases.
#[derive(Debug, Clone)]
pub struct ProxySettings {
    /// Relation endpoint name (`log_proxy`).
    pub relation_name: String,
    /// Explicit sidecar container name. `None` means "the only container".
    pub container_name: Option<String>,
    /// Workload service restarted alongside promtail. Defaults to the
    /// resolved container name.
    pub workload_service: Option<String>,
    /// Download URL advertised by the provider side.
    pub binary_zip_url: String,
    /// Expected lowercase hex SHA-256 of the archive.
    pub binary_sha256: String,
    /// Local directory the archive is staged and unpacked in.
    pub staging_dir: PathBuf,
    /// Local path the downloaded archive is kept at.
    pub archive_path: PathBuf,
    /// Path of the executable inside the sidecar.
    pub install_path: PathBuf,
    /// Path of the promtail config inside the sidecar.
    pub config_path: PathBuf,
    /// Positions (checkpoint) file used by promtail.
    pub positions_path: PathBuf,
    pub http_listen_port: u16,
    pub grpc_listen_port: u16,
    /// Port of the push API this unit exposes when acting as provider.
    pub push_api_port: u16,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            relation_name: DEFAULT_RELATION_NAME.to_string(),
            container_name: None,
            workload_service: None,
            binary_zip_url: PROMTAIL_BINARY_ZIP_URL.to_string(),
            binary_sha256: PROMTAIL_BINARY_SHA256.to_string(),
            staging_dir: PathBuf::from(BINARY_DIR),
            archive_path: PathBuf::from(BINARY_ZIP_PATH),
            install_path: PathBuf::from(WORKLOAD_BINARY_PATH),
            config_path: PathBuf::from(CONFIG_PATH),
            positions_path: PathBuf::from(POSITIONS_FILENAME),
            http_listen_port: HTTP_LISTEN_PORT,
            grpc_listen_port: GRPC_LISTEN_PORT,
            push_api_port: PUSH_API_PORT,
        }
    }
}

impl ProxySettings {
    /// Resolve settings from the process environment.
    pub fn resolve() -> Result<Self, ConfigError> {
        Self::resolve_with(optional_env)
    }

    /// Resolve settings through an arbitrary key lookup.
    pub fn resolve_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<Option<String>, ConfigError>,
    {
        let defaults = Self::default();

        let binary_zip_url =
            lookup("PROMTAIL_BINARY_ZIP_URL")?.unwrap_or(defaults.binary_zip_url);
        validate_url("PROMTAIL_BINARY_ZIP_URL", &binary_zip_url)?;

        let binary_sha256 = match lookup("PROMTAIL_BINARY_SHA256")? {
            Some(raw) => normalize_sha256("PROMTAIL_BINARY_SHA256", &raw)?,
            None => defaults.binary_sha256,
        };

        let staging_dir = lookup("PROMTAIL_STAGING_DIR")?
            .map(PathBuf::from)
            .unwrap_or(defaults.staging_dir);
        // The archive follows the staging dir unless pinned explicitly.
        let archive_path = match lookup("PROMTAIL_ARCHIVE_PATH")? {
            Some(path) => PathBuf::from(path),
            None => staging_dir.join(archive_file_name(&binary_zip_url)),
        };

        Ok(Self {
            relation_name: lookup("LOG_PROXY_RELATION_NAME")?.unwrap_or(defaults.relation_name),
            container_name: lookup("LOG_PROXY_CONTAINER")?,
            workload_service: lookup("LOG_PROXY_WORKLOAD_SERVICE")?,
            binary_zip_url,
            binary_sha256,
            staging_dir,
            archive_path,
            install_path: lookup("PROMTAIL_INSTALL_PATH")?
                .map(PathBuf::from)
                .unwrap_or(defaults.install_path),
            config_path: lookup("PROMTAIL_CONFIG_PATH")?
                .map(PathBuf::from)
                .unwrap_or(defaults.config_path),
            positions_path: lookup("PROMTAIL_POSITIONS_PATH")?
                .map(PathBuf::from)
                .unwrap_or(defaults.positions_path),
            http_listen_port: parse_or(
                "PROMTAIL_HTTP_LISTEN_PORT",
                lookup("PROMTAIL_HTTP_LISTEN_PORT")?,
                defaults.http_listen_port,
            )?,
            grpc_listen_port: parse_or(
                "PROMTAIL_GRPC_LISTEN_PORT",
                lookup("PROMTAIL_GRPC_LISTEN_PORT")?,
                defaults.grpc_listen_port,
            )?,
            push_api_port: parse_or(
                "LOKI_PUSH_API_PORT",
                lookup("LOKI_PUSH_API_PORT")?,
                defaults.push_api_port,
            )?,
        })
    }

    /// Command-line arguments passed to promtail.
    pub fn cli_args(&self) -> String {
        format!("-config.file={}", self.config_path.display())
    }

    /// Full service command for the process layer.
    pub fn command(&self) -> String {
        format!("{} {}", self.install_path.display(), self.cli_args())
    }

    /// The binary to provision when a peer advertises `url`.
    pub fn binary(&self, url: &str) -> ProxyBinary {
        ProxyBinary {
            url: url.to_string(),
            sha256: self.binary_sha256.clone(),
            install_path: self.install_path.clone(),
        }
    }
}

fn validate_url(key: &str, raw: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(raw).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("invalid URL: {e}"),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }
    Ok(())
}

fn normalize_sha256(key: &str, raw: &str) -> Result<String, ConfigError> {
    let digest = raw.trim().to_ascii_lowercase();
    if digest.len() != 64 || hex::decode(&digest).is_err() {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "must be 64 hex characters".to_string(),
        });
    }
    Ok(digest)
}

fn archive_file_name(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "promtail.zip".to_string())
}
