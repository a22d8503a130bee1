//! CLI command handling.
//!
//! Operator tooling around the promtail sidecar:
//! - Rendering the config a consumer would push (`render-config`)
//! - Printing the service layer (`layer`)
//! - Checking a local archive against the pinned digest (`verify`)
//! - Installing promtail into a local directory (`fetch`)

mod commands;

pub use commands::run_command;

use std::path::PathBuf;

use clap::{ColorChoice, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "log-proxy")]
#[command(about = "Manage the promtail log forwarding sidecar")]
#[command(
    long_about = "Inspect and provision the promtail sidecar used by the loki_push_api relation.\nExamples:\n  log-proxy render-config --model lma --model-uuid 1234 --application mysql\n  log-proxy verify /tmp/promtail-linux-amd64.zip"
)]
#[command(version)]
#[command(color = ColorChoice::Auto)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the promtail config for a topology
    RenderConfig {
        /// Model name
        #[arg(long)]
        model: String,

        /// Model UUID
        #[arg(long)]
        model_uuid: String,

        /// Application name
        #[arg(long)]
        application: String,

        /// Push API URL to add as a client (repeatable)
        #[arg(long = "client")]
        clients: Vec<String>,
    },

    /// Print the promtail service layer
    Layer,

    /// Check an archive against the pinned SHA-256
    Verify {
        /// Path to the downloaded archive
        archive: PathBuf,
    },

    /// Download, verify and install promtail under a local directory
    Fetch {
        /// Directory standing in for the sidecar filesystem
        #[arg(long)]
        dest: PathBuf,

        /// Archive URL (defaults to the pinned release)
        #[arg(long)]
        url: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_render_config_collects_clients() {
        let cli = Cli::try_parse_from([
            "log-proxy",
            "render-config",
            "--model",
            "lma",
            "--model-uuid",
            "1234",
            "--application",
            "mysql",
            "--client",
            "http://a/push",
            "--client",
            "http://b/push",
        ])
        .unwrap();

        match cli.command {
            Command::RenderConfig { clients, .. } => {
                assert_eq!(clients, vec!["http://a/push", "http://b/push"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_verify_requires_archive() {
        assert!(Cli::try_parse_from(["log-proxy", "verify"]).is_err());
    }
}
