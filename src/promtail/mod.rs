//! Promtail configuration synthesis.

pub mod config;

use std::path::{Path, PathBuf};

pub use config::{
    ClientConfig, PositionsConfig, PromtailConfig, ScrapeConfig, ServerConfig, StaticConfig,
};

/// Log files the workload wants shipped.
///
/// Fixed at construction. Not yet referenced by `scrape_configs`; the
/// static `system` job is the only scrape target for now.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFileSet(Vec<PathBuf>);

impl LogFileSet {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self(paths.into_iter().map(Into::into).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.0.iter().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
