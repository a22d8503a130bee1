//! Promtail sidecar lifecycle on top of a [`Container`].

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{ProxySettings, SERVICE_NAME};
use crate::error::{Error, Result};
use crate::promtail::PromtailConfig;
use crate::sidecar::config::Layer;
use crate::sidecar::container::Container;

/// State of the promtail service inside the sidecar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidecarState {
    /// No config has been written yet.
    NotConfigured,
    /// Config written, service not started.
    Configured,
    /// Service (re)started with this many clients configured.
    Running { clients: usize },
    /// Service stopped because no clients remain.
    Stopped,
}

/// Manages the promtail service inside one sidecar container.
///
/// Owns the authoritative copy of the config file path and the explicit
/// service state. Every config change goes through a full pull, mutate and
/// push cycle; there is no caching of the document between events.
pub struct SidecarManager {
    container: Arc<dyn Container>,
    config_path: PathBuf,
    workload_service: String,
    layer: Layer,
    state: SidecarState,
}

impl SidecarManager {
    /// Create a manager for `container`.
    pub fn new(container: Arc<dyn Container>, settings: &ProxySettings) -> Self {
        let workload_service = settings
            .workload_service
            .clone()
            .unwrap_or_else(|| container.name().to_string());
        Self {
            container,
            config_path: settings.config_path.clone(),
            workload_service,
            layer: Layer::promtail(settings),
            state: SidecarState::NotConfigured,
        }
    }

    /// Seed the state, e.g. when the controller is rebuilt for a new event.
    pub fn with_state(mut self, state: SidecarState) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> SidecarState {
        self.state
    }

    pub fn container(&self) -> &dyn Container {
        self.container.as_ref()
    }

    /// Push a fresh config document. The service is not started.
    pub async fn write_initial(&mut self, config: &PromtailConfig) -> Result<()> {
        self.store_config(config).await?;
        if self.state == SidecarState::NotConfigured {
            self.state = SidecarState::Configured;
        }
        tracing::info!(
            "Wrote initial promtail config to {}",
            self.config_path.display()
        );
        Ok(())
    }

    /// Pull and parse the current config document from the sidecar.
    pub async fn load_config(&self) -> Result<PromtailConfig> {
        let raw = self.container.pull(&self.config_path).await?;
        let text = String::from_utf8(raw).map_err(|_| Error::NotUtf8 {
            path: self.config_path.clone(),
        })?;
        Ok(PromtailConfig::from_yaml(&text)?)
    }

    /// Serialize and push the whole config document.
    pub async fn store_config(&self, config: &PromtailConfig) -> Result<()> {
        let yaml = config.to_yaml()?;
        self.container
            .push(&self.config_path, yaml.as_bytes(), None)
            .await?;
        Ok(())
    }

    /// Merge the promtail service layer into the sidecar plan.
    pub async fn declare_layer(&self) -> Result<()> {
        self.container
            .add_layer(self.container.name(), &self.layer, true)
            .await?;
        tracing::debug!("Declared promtail layer on '{}'", self.container.name());
        Ok(())
    }

    /// Restart the workload service, then promtail.
    pub async fn restart_all(&mut self, clients: usize) -> Result<()> {
        self.container
            .restart(&[self.workload_service.as_str()])
            .await?;
        self.restart_proxy(clients).await
    }

    /// Restart promtail only.
    pub async fn restart_proxy(&mut self, clients: usize) -> Result<()> {
        self.container.restart(&[SERVICE_NAME]).await?;
        self.state = SidecarState::Running { clients };
        tracing::info!("Restarted {} with {} client(s)", SERVICE_NAME, clients);
        Ok(())
    }

    /// Stop promtail.
    pub async fn stop(&mut self) -> Result<()> {
        self.container.stop(&[SERVICE_NAME]).await?;
        self.state = SidecarState::Stopped;
        tracing::info!("Stopped {}: no clients remain", SERVICE_NAME);
        Ok(())
    }
}
