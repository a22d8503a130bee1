//! Active downstream consumers of the push API relation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::MembershipError;

/// Key the registry snapshot is stored under.
pub const REGISTRY_STATE_KEY: &str = "grafana_agents";

/// Persistent key/value state owned by the controlling unit.
///
/// Survives between events; reset only when the unit is redeployed.
pub trait StateStore: Send + Sync {
    fn load(&self, key: &str) -> Option<String>;
    fn save(&self, key: &str, value: String);
}

/// Consumer unit name mapped to the push API URL it announced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConsumerRegistry {
    consumers: BTreeMap<String, String>,
}

impl ConsumerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `url` for `consumer`, replacing any previous entry.
    pub fn record(&mut self, consumer: &str, url: &str) -> Option<String> {
        self.consumers.insert(consumer.to_string(), url.to_string())
    }

    /// Remove `consumer` and return the URL it had announced.
    pub fn forget(&mut self, consumer: &str) -> Result<String, MembershipError> {
        self.consumers
            .remove(consumer)
            .ok_or_else(|| MembershipError::UnknownConsumer(consumer.to_string()))
    }

    /// URL announced by `consumer`.
    pub fn lookup(&self, consumer: &str) -> Result<&str, MembershipError> {
        self.consumers
            .get(consumer)
            .map(String::as_str)
            .ok_or_else(|| MembershipError::UnknownConsumer(consumer.to_string()))
    }

    pub fn len(&self) -> usize {
        self.consumers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumers.is_empty()
    }

    /// Load the registry from `store`, empty when nothing was saved yet.
    pub fn restore(store: &dyn StateStore) -> Result<Self, serde_json::Error> {
        match store.load(REGISTRY_STATE_KEY) {
            Some(raw) => serde_json::from_str(&raw),
            None => Ok(Self::default()),
        }
    }

    /// Write the registry to `store` as a JSON object.
    pub fn persist(&self, store: &dyn StateStore) -> Result<(), serde_json::Error> {
        store.save(REGISTRY_STATE_KEY, serde_json::to_string(self)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStateStore;

    #[test]
    fn test_record_overwrites() {
        let mut registry = ConsumerRegistry::new();
        assert_eq!(registry.record("agent/0", "http://a/push"), None);
        assert_eq!(
            registry.record("agent/0", "http://b/push"),
            Some("http://a/push".to_string())
        );
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup("agent/0").unwrap(), "http://b/push");
    }

    #[test]
    fn test_forget_returns_url() {
        let mut registry = ConsumerRegistry::new();
        registry.record("agent/0", "http://a/push");
        assert_eq!(registry.forget("agent/0").unwrap(), "http://a/push");
        assert!(registry.is_empty());
    }

    #[test]
    fn test_forget_unknown_consumer_fails() {
        let mut registry = ConsumerRegistry::new();
        let err = registry.forget("agent/7").unwrap_err();
        assert!(matches!(err, MembershipError::UnknownConsumer(ref unit) if unit == "agent/7"));
    }

    #[test]
    fn test_persist_and_restore() {
        let store = MemoryStateStore::default();
        let mut registry = ConsumerRegistry::new();
        registry.record("agent/0", "http://a/push");
        registry.record("agent/1", "http://b/push");

        registry.persist(&store).unwrap();

        assert_eq!(
            store.load(REGISTRY_STATE_KEY).unwrap(),
            r#"{"agent/0":"http://a/push","agent/1":"http://b/push"}"#
        );
        assert_eq!(ConsumerRegistry::restore(&store).unwrap(), registry);
    }

    #[test]
    fn test_restore_empty_store() {
        let store = MemoryStateStore::default();
        assert!(ConsumerRegistry::restore(&store).unwrap().is_empty());
    }

    #[test]
    fn test_restore_corrupt_snapshot_fails() {
        let store = MemoryStateStore::default();
        store.save(REGISTRY_STATE_KEY, "not json".to_string());
        assert!(ConsumerRegistry::restore(&store).is_err());
    }
}
