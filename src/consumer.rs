//! Consumer side of the `loki_push_api` relation.
//!
//! A workload that wants its logs shipped runs promtail in a sidecar. Each
//! remote unit that publishes a push API endpoint becomes one promtail
//! client; when it departs the client is removed again and promtail is
//! stopped once none remain.

use std::sync::Arc;

use crate::config::ProxySettings;
use crate::error::Result;
use crate::membership::{ConsumerRegistry, StateStore};
use crate::promtail::{LogFileSet, PromtailConfig};
use crate::provision::{BinaryProvisioner, ProvisionOutcome};
use crate::relation::{ProxyPayload, RelationEvent};
use crate::sidecar::{Container, SidecarManager, SidecarState, select_container};
use crate::topology::Topology;

/// Event-driven controller for the promtail sidecar.
///
/// The host delivers one [`RelationEvent`] at a time and waits for
/// [`handle`](Self::handle) to finish before the next. Any error aborts the
/// event and is returned to the host unretried.
pub struct LogProxyConsumer {
    settings: ProxySettings,
    topology: Topology,
    log_files: LogFileSet,
    sidecar: SidecarManager,
    provisioner: BinaryProvisioner,
    registry: ConsumerRegistry,
    store: Arc<dyn StateStore>,
}

impl LogProxyConsumer {
    /// Build the controller, restoring the consumer registry from `store`.
    ///
    /// The sidecar is picked among the unit's `containers`: the configured
    /// container name if set, otherwise the only container. Its name is
    /// also the workload service restarted before promtail unless a
    /// workload service is configured.
    pub fn new(
        settings: ProxySettings,
        topology: Topology,
        log_files: LogFileSet,
        containers: &[Arc<dyn Container>],
        store: Arc<dyn StateStore>,
    ) -> Result<Self> {
        let container = select_container(settings.container_name.as_deref(), containers)?;
        let registry = ConsumerRegistry::restore(store.as_ref())?;
        // Without a supervisor query, a non-empty registry is the best
        // evidence that promtail was left running.
        let state = if registry.is_empty() {
            SidecarState::NotConfigured
        } else {
            SidecarState::Running {
                clients: registry.len(),
            }
        };

        Ok(Self {
            sidecar: SidecarManager::new(container, &settings).with_state(state),
            provisioner: BinaryProvisioner::from_settings(&settings),
            settings,
            topology,
            log_files,
            registry,
            store,
        })
    }

    pub fn state(&self) -> SidecarState {
        self.sidecar.state()
    }

    pub fn registry(&self) -> &ConsumerRegistry {
        &self.registry
    }

    pub fn log_files(&self) -> &LogFileSet {
        &self.log_files
    }

    /// Handle one relation event to completion.
    pub async fn handle(&mut self, event: RelationEvent) -> Result<SidecarState> {
        tracing::debug!("Handling {} on '{}'", event.kind(), self.settings.relation_name);

        match event {
            RelationEvent::Created => self.on_relation_created().await?,
            RelationEvent::Changed {
                unit,
                payload: Some(payload),
            } => self.on_relation_changed(&unit, &payload).await?,
            RelationEvent::Changed {
                unit,
                payload: None,
            } => {
                tracing::debug!("No data published by {} yet, nothing to do", unit);
            }
            RelationEvent::Departed { unit } => self.on_relation_departed(&unit).await?,
            RelationEvent::Upgrade => self.on_upgrade(),
        }

        Ok(self.sidecar.state())
    }

    async fn on_relation_created(&mut self) -> Result<()> {
        let config = PromtailConfig::initial(&self.topology, &self.settings);
        self.sidecar.write_initial(&config).await
    }

    async fn on_relation_changed(&mut self, unit: &str, payload: &ProxyPayload) -> Result<()> {
        let binary = self.settings.binary(&payload.promtail_binary_zip_url);
        let outcome = self
            .provisioner
            .ensure_installed(&binary, self.sidecar.container())
            .await?;
        if let ProvisionOutcome::Installed { path, .. } = &outcome {
            tracing::info!("Promtail installed at {} for {}", path.display(), unit);
        }

        let mut config = self.sidecar.load_config().await?;
        config.add_client(&payload.loki_push_api);
        self.sidecar.store_config(&config).await?;

        self.registry.record(unit, &payload.loki_push_api);
        self.registry.persist(self.store.as_ref())?;

        self.sidecar.declare_layer().await?;
        self.sidecar.restart_all(config.client_count()).await
    }

    async fn on_relation_departed(&mut self, unit: &str) -> Result<()> {
        let url = self.registry.lookup(unit)?.to_string();

        let mut config = self.sidecar.load_config().await?;
        config.remove_client(&url);
        self.sidecar.store_config(&config).await?;

        self.registry.forget(unit)?;
        self.registry.persist(self.store.as_ref())?;

        let clients = config.client_count();
        if clients == 0 {
            self.sidecar.stop().await
        } else {
            self.sidecar.restart_proxy(clients).await
        }
    }

    fn on_upgrade(&self) {
        // No migration exists between promtail releases yet; the pinned
        // binary is only replaced when the sidecar is recreated.
        tracing::debug!("Upgrade requires no sidecar changes");
    }
}
