//! Provider side of the `loki_push_api` relation.

use crate::config::ProxySettings;
use crate::error::Result;
use crate::relation::{DATA_KEY, ProxyPayload, RelationData};

/// Result of a provider relation-changed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Published(ProxyPayload),
    /// This unit had already published its data.
    AlreadyPublished,
}

/// Publishes this unit's push API endpoint and the promtail download URL.
pub struct LogProxyProvider {
    settings: ProxySettings,
}

impl LogProxyProvider {
    pub fn new(settings: ProxySettings) -> Self {
        Self { settings }
    }

    /// Publish once; later events leave the existing data alone.
    pub async fn on_relation_changed(
        &self,
        relation: &dyn RelationData,
    ) -> Result<PublishOutcome> {
        let existing = relation.get(DATA_KEY).await;
        if existing.is_some_and(|data| !data.is_empty()) {
            tracing::debug!("Push API already published on '{}'", self.settings.relation_name);
            return Ok(PublishOutcome::AlreadyPublished);
        }

        let payload = ProxyPayload {
            loki_push_api: self.push_api_url(relation).await,
            promtail_binary_zip_url: self.settings.binary_zip_url.clone(),
        };
        relation.set(DATA_KEY, payload.to_json()?).await?;

        tracing::info!("Published push API {}", payload.loki_push_api);
        Ok(PublishOutcome::Published(payload))
    }

    pub fn on_upgrade(&self) {
        tracing::debug!("Upgrade requires no relation changes");
    }

    async fn push_api_url(&self, relation: &dyn RelationData) -> String {
        let host = match relation.bind_address().await {
            Some(addr) if addr.is_ipv6() => format!("[{}]", addr),
            Some(addr) => addr.to_string(),
            None => {
                tracing::warn!(
                    "No bind address for '{}', publishing an empty host",
                    self.settings.relation_name
                );
                String::new()
            }
        };
        format!(
            "http://{}:{}/loki/api/v1/push",
            host, self.settings.push_api_port
        )
    }
}
