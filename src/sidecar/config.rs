//! Process layer declarations for the sidecar.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::{ProxySettings, SERVICE_NAME};

/// A layer of service definitions merged into the sidecar's process plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    pub summary: String,
    pub description: String,
    pub services: BTreeMap<String, ServiceSpec>,
}

/// A single supervised service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// How this definition combines with an existing one of the same name.
    #[serde(rename = "override")]
    pub override_mode: Override,
    pub summary: String,
    /// Command line, executable first.
    pub command: String,
    pub startup: Startup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Override {
    Merge,
    Replace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Startup {
    Enabled,
    Disabled,
}

impl Layer {
    /// The layer that runs promtail against the configured config file.
    pub fn promtail(settings: &ProxySettings) -> Self {
        let mut services = BTreeMap::new();
        services.insert(
            SERVICE_NAME.to_string(),
            ServiceSpec {
                override_mode: Override::Replace,
                summary: SERVICE_NAME.to_string(),
                command: settings.command(),
                startup: Startup::Enabled,
            },
        );

        Self {
            summary: "promtail layer".to_string(),
            description: "pebble config layer for promtail".to_string(),
            services,
        }
    }

    /// Serialize the layer as YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yml::Error> {
        serde_yml::to_string(self)
    }
}
