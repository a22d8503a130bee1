//! Deployment topology attached to forwarded logs.

use std::fmt;

/// Identifies the model and application a unit's logs come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    pub model: String,
    pub model_uuid: String,
    pub application: String,
}

impl Topology {
    pub fn new(
        model: impl Into<String>,
        model_uuid: impl Into<String>,
        application: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            model_uuid: model_uuid.into(),
            application: application.into(),
        }
    }

    /// Value of the `job` label on scraped streams.
    pub fn job_label(&self) -> String {
        format!("juju_{}", self)
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.model, self.model_uuid, self.application)
    }
}
