use crate::cli::Command;
use crate::config::ProxySettings;
use crate::promtail::PromtailConfig;
use crate::provision::{BinaryProvisioner, ProvisionOutcome, verify_sha256};
use crate::sidecar::{Layer, LocalContainer};
use crate::topology::Topology;

/// Run a CLI command against resolved settings.
pub async fn run_command(command: Command, settings: &ProxySettings) -> anyhow::Result<()> {
    match command {
        Command::RenderConfig {
            model,
            model_uuid,
            application,
            clients,
        } => {
            let topology = Topology::new(model, model_uuid, application);
            print!("{}", render_config(&topology, &clients, settings)?);
        }
        Command::Layer => {
            print!("{}", Layer::promtail(settings).to_yaml()?);
        }
        Command::Verify { archive } => {
            verify_sha256(&archive, &settings.binary_sha256, &archive.display().to_string())?;
            println!("{}: OK ({})", archive.display(), settings.binary_sha256);
        }
        Command::Fetch { dest, url } => {
            let url = url.unwrap_or_else(|| settings.binary_zip_url.clone());
            let binary = settings.binary(&url);
            let container = LocalContainer::new("local", &dest);
            let staging = tempfile::tempdir()?;
            let provisioner = BinaryProvisioner::new(
                staging.path().to_path_buf(),
                staging.path().join("promtail.zip"),
            );

            match provisioner.ensure_installed(&binary, &container).await? {
                ProvisionOutcome::AlreadyInstalled { path } => {
                    println!(
                        "Already installed: {}",
                        container.host_path(&path).display()
                    );
                }
                ProvisionOutcome::Installed { path, .. } => {
                    println!("Installed: {}", container.host_path(&path).display());
                }
            }
        }
    }
    Ok(())
}

fn render_config(
    topology: &Topology,
    clients: &[String],
    settings: &ProxySettings,
) -> anyhow::Result<String> {
    let mut config = PromtailConfig::initial(topology, settings);
    for url in clients {
        config.add_client(url);
    }
    Ok(config.to_yaml()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_config_with_clients() {
        let topology = Topology::new("lma", "1234", "mysql");
        let yaml = render_config(
            &topology,
            &["http://a/push".to_string()],
            &ProxySettings::default(),
        )
        .unwrap();

        let parsed = PromtailConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.client_urls(), vec!["http://a/push"]);
        assert!(yaml.contains("juju_lma_1234_mysql"));
    }

    #[test]
    fn test_render_config_without_clients() {
        let topology = Topology::new("lma", "1234", "mysql");
        let yaml = render_config(&topology, &[], &ProxySettings::default()).unwrap();
        assert!(!yaml.contains("clients"));
    }

    #[tokio::test]
    async fn test_verify_rejects_wrong_archive() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("promtail.zip");
        std::fs::write(&archive, b"not the release").unwrap();

        let err = run_command(Command::Verify { archive }, &ProxySettings::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("sha256sum mismatch"));
    }
}
