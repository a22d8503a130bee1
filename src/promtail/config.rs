//! The promtail configuration document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ProxySettings;
use crate::topology::Topology;

/// Log file scraped by the static `system` job.
const SYSTEM_LOG_PATH: &str = "/var/log/dmesg";

/// Promtail's YAML config.
///
/// The `server`, `positions` and `scrape_configs` sections are fixed at
/// creation. `clients` grows and shrinks with relation membership and is
/// absent until the first client is added. Keys this type does not know
/// about are carried through a read-modify-write cycle untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromtailConfig {
    pub server: ServerConfig,
    pub positions: PositionsConfig,
    pub scrape_configs: Vec<ScrapeConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clients: Option<Vec<ClientConfig>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yml::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub http_listen_port: u16,
    /// 0 disables the gRPC listener.
    pub grpc_listen_port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionsConfig {
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeConfig {
    pub job_name: String,
    pub static_configs: Vec<StaticConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticConfig {
    pub targets: Vec<String>,
    pub labels: BTreeMap<String, String>,
}

/// A push API endpoint promtail ships to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub url: String,
}

impl PromtailConfig {
    /// The config written when the relation is created, before any client
    /// has announced itself.
    pub fn initial(topology: &Topology, settings: &ProxySettings) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert("job".to_string(), topology.job_label());
        labels.insert("__path__".to_string(), SYSTEM_LOG_PATH.to_string());

        Self {
            server: ServerConfig {
                http_listen_port: settings.http_listen_port,
                grpc_listen_port: settings.grpc_listen_port,
            },
            positions: PositionsConfig {
                filename: settings.positions_path.display().to_string(),
            },
            scrape_configs: vec![ScrapeConfig {
                job_name: "system".to_string(),
                static_configs: vec![StaticConfig {
                    targets: vec!["localhost".to_string()],
                    labels,
                }],
            }],
            clients: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yml::Error> {
        serde_yml::from_str(raw)
    }

    pub fn to_yaml(&self) -> Result<String, serde_yml::Error> {
        serde_yml::to_string(self)
    }

    /// Append a client, creating the list if needed.
    ///
    /// Does not deduplicate: adding the same URL twice yields two entries.
    pub fn add_client(&mut self, url: &str) {
        self.clients.get_or_insert_with(Vec::new).push(ClientConfig {
            url: url.to_string(),
        });
    }

    /// Remove every client whose URL equals `url`.
    ///
    /// A document without a `clients` key is left as is.
    pub fn remove_client(&mut self, url: &str) {
        if let Some(clients) = self.clients.as_mut() {
            clients.retain(|client| client.url != url);
        }
    }

    /// URLs of the configured clients, in insertion order.
    pub fn client_urls(&self) -> Vec<&str> {
        self.clients
            .iter()
            .flatten()
            .map(|client| client.url.as_str())
            .collect()
    }

    pub fn client_count(&self) -> usize {
        self.clients.as_ref().map_or(0, Vec::len)
    }
}
