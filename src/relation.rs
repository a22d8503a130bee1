//! Relation events and payloads for the `loki_push_api` interface.

use std::net::IpAddr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RelationError;

/// Relation data key both sides publish their JSON document under.
pub const DATA_KEY: &str = "data";

/// Document a provider publishes and a consumer reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyPayload {
    /// Where the consumer should push logs to.
    pub loki_push_api: String,
    /// Where the consumer can download the promtail archive from.
    pub promtail_binary_zip_url: String,
}

impl ProxyPayload {
    /// Parse the `data` value published by `unit`.
    pub fn parse(unit: &str, raw: &str) -> Result<Self, RelationError> {
        serde_json::from_str(raw).map_err(|e| RelationError::InvalidPayload {
            unit: unit.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn to_json(&self) -> Result<String, RelationError> {
        serde_json::to_string(self).map_err(RelationError::Encode)
    }
}

/// A relation lifecycle event, validated at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationEvent {
    Created,
    /// `payload` is `None` while the remote unit has not published `data`.
    Changed {
        unit: String,
        payload: Option<ProxyPayload>,
    },
    Departed {
        unit: String,
    },
    Upgrade,
}

impl RelationEvent {
    /// Build a changed event from the remote unit's raw `data` value.
    ///
    /// Missing and empty values both mean "not published yet".
    pub fn changed(unit: impl Into<String>, data: Option<&str>) -> Result<Self, RelationError> {
        let unit = unit.into();
        let payload = match data {
            Some(raw) if !raw.trim().is_empty() => Some(ProxyPayload::parse(&unit, raw)?),
            _ => None,
        };
        Ok(RelationEvent::Changed { unit, payload })
    }

    pub fn departed(unit: impl Into<String>) -> Self {
        RelationEvent::Departed { unit: unit.into() }
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            RelationEvent::Created => "relation-created",
            RelationEvent::Changed { .. } => "relation-changed",
            RelationEvent::Departed { .. } => "relation-departed",
            RelationEvent::Upgrade => "upgrade",
        }
    }
}

/// This unit's side of a relation, as exposed by the host.
#[async_trait]
pub trait RelationData: Send + Sync {
    /// Read a key from this unit's relation data bag.
    async fn get(&self, key: &str) -> Option<String>;

    /// Write a key into this unit's relation data bag.
    async fn set(&self, key: &str, value: String) -> Result<(), RelationError>;

    /// Address this unit is reachable on for the relation, if bound.
    async fn bind_address(&self) -> Option<IpAddr>;
}
