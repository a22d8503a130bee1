//! End-to-end consumer scenarios: relation events in, sidecar calls out.
//!
//! The promtail archive is served by a local mockito server and the sidecar
//! is a `StubContainer`, so every test runs offline.

use std::sync::Arc;

use log_proxy::config::ProxySettings;
use log_proxy::error::{Error, ProvisionError};
use log_proxy::membership::ConsumerRegistry;
use log_proxy::promtail::{LogFileSet, PromtailConfig};
use log_proxy::relation::RelationEvent;
use log_proxy::sidecar::{Container, SidecarState};
use log_proxy::testing::{
    ContainerCall, MemoryStateStore, StubContainer, promtail_zip, sha256_hex,
};
use log_proxy::{LogProxyConsumer, Topology};

const PUSH_API: &str = "http://10.0.0.5:3100/loki/api/v1/push";
const BINARY: &[u8] = b"\x7fELF promtail v2.4.1";

struct Fixture {
    consumer: LogProxyConsumer,
    container: Arc<StubContainer>,
    store: Arc<MemoryStateStore>,
    _staging: tempfile::TempDir,
}

fn fixture(expected_sha256: String) -> Fixture {
    let staging = tempfile::tempdir().expect("tempdir");
    let settings = ProxySettings {
        binary_sha256: expected_sha256,
        staging_dir: staging.path().to_path_buf(),
        archive_path: staging.path().join("promtail-linux-amd64.zip"),
        ..Default::default()
    };
    let container = Arc::new(StubContainer::new("workload"));
    let store = Arc::new(MemoryStateStore::default());

    let consumer = LogProxyConsumer::new(
        settings,
        Topology::new("lma", "2b3f1c9e-0000-4000-8000-000000000000", "mysql"),
        LogFileSet::new(["/var/log/mysql/error.log"]),
        &[container.clone() as Arc<dyn Container>],
        store.clone(),
    )
    .expect("consumer");

    Fixture {
        consumer,
        container,
        store,
        _staging: staging,
    }
}

fn changed_data(binary_url: &str) -> String {
    format!(r#"{{"promtail_binary_zip_url": "{binary_url}", "loki_push_api": "{PUSH_API}"}}"#)
}

fn pushed_config(container: &StubContainer) -> PromtailConfig {
    let raw = container
        .file("/tmp/promtail_config.yml")
        .expect("config pushed");
    PromtailConfig::from_yaml(&String::from_utf8(raw).expect("utf8")).expect("valid yaml")
}

#[tokio::test]
async fn relation_changed_provisions_configures_and_restarts() {
    let archive = promtail_zip("promtail-linux-amd64", BINARY);
    let mut server = mockito::Server::new_async().await;
    let download = server
        .mock("GET", "/promtail-linux-amd64.zip")
        .with_status(200)
        .with_body(&archive)
        .expect(1)
        .create_async()
        .await;

    let mut fx = fixture(sha256_hex(&archive));
    fx.consumer
        .handle(RelationEvent::Created)
        .await
        .expect("created");

    let url = format!("{}/promtail-linux-amd64.zip", server.url());
    let event = RelationEvent::changed("grafana-agent/0", Some(&changed_data(&url))).unwrap();
    let state = fx.consumer.handle(event).await.expect("changed");

    download.assert_async().await;
    assert_eq!(state, SidecarState::Running { clients: 1 });

    // Binary installed executable.
    assert_eq!(
        fx.container.file("/tmp/promtail-linux-amd64"),
        Some(BINARY.to_vec())
    );
    assert_eq!(fx.container.mode("/tmp/promtail-linux-amd64"), Some(0o755));

    // Exactly one client.
    assert_eq!(pushed_config(&fx.container).client_urls(), vec![PUSH_API]);

    // Membership recorded and persisted.
    assert_eq!(
        fx.consumer.registry().lookup("grafana-agent/0").unwrap(),
        PUSH_API
    );
    let restored = ConsumerRegistry::restore(fx.store.as_ref()).unwrap();
    assert_eq!(restored.len(), 1);

    // Layer declared, then workload and promtail restarted.
    let calls = fx.container.calls();
    let restarts: Vec<&ContainerCall> = calls
        .iter()
        .filter(|call| matches!(call, ContainerCall::Restart(_)))
        .collect();
    assert_eq!(
        restarts,
        vec![
            &ContainerCall::Restart(vec!["workload".to_string()]),
            &ContainerCall::Restart(vec!["promtail".to_string()]),
        ]
    );
    assert!(
        calls
            .iter()
            .any(|call| matches!(call, ContainerCall::AddLayer { combine: true, .. }))
    );
}

#[tokio::test]
async fn digest_mismatch_aborts_before_config_and_restart() {
    let archive = promtail_zip("promtail-linux-amd64", b"tampered");
    let mut server = mockito::Server::new_async().await;
    let _download = server
        .mock("GET", "/promtail-linux-amd64.zip")
        .with_status(200)
        .with_body(&archive)
        .create_async()
        .await;

    let mut fx = fixture(sha256_hex(BINARY));
    fx.consumer
        .handle(RelationEvent::Created)
        .await
        .expect("created");
    let calls_before = fx.container.calls();

    let url = format!("{}/promtail-linux-amd64.zip", server.url());
    let event = RelationEvent::changed("grafana-agent/0", Some(&changed_data(&url))).unwrap();
    let err = fx.consumer.handle(event).await.unwrap_err();

    assert!(matches!(
        err,
        Error::Provision(ProvisionError::DigestMismatch { .. })
    ));
    assert_eq!(fx.container.calls(), calls_before);
    assert!(fx.container.file("/tmp/promtail-linux-amd64").is_none());
    assert!(pushed_config(&fx.container).clients.is_none());
    assert!(fx.consumer.registry().is_empty());
    assert_eq!(fx.consumer.state(), SidecarState::Configured);
}

#[tokio::test]
async fn redelivered_event_reuses_installed_binary() {
    let archive = promtail_zip("promtail-linux-amd64", BINARY);
    let mut server = mockito::Server::new_async().await;
    let download = server
        .mock("GET", "/promtail-linux-amd64.zip")
        .with_status(200)
        .with_body(&archive)
        .expect(1)
        .create_async()
        .await;

    let mut fx = fixture(sha256_hex(&archive));
    fx.consumer
        .handle(RelationEvent::Created)
        .await
        .expect("created");

    let url = format!("{}/promtail-linux-amd64.zip", server.url());
    for _ in 0..2 {
        let event = RelationEvent::changed("grafana-agent/0", Some(&changed_data(&url))).unwrap();
        fx.consumer.handle(event).await.expect("changed");
    }

    // Downloaded once; the second event hit the fast path.
    download.assert_async().await;
    // The client list does not deduplicate, the registry does.
    assert_eq!(
        pushed_config(&fx.container).client_urls(),
        vec![PUSH_API, PUSH_API]
    );
    assert_eq!(fx.consumer.registry().len(), 1);
}

#[tokio::test]
async fn sole_consumer_departure_stops_promtail() {
    let mut fx = fixture(sha256_hex(BINARY));
    fx.container.put_file("/tmp/promtail-linux-amd64", BINARY.to_vec());
    fx.consumer
        .handle(RelationEvent::Created)
        .await
        .expect("created");
    let event =
        RelationEvent::changed("grafana-agent/0", Some(&changed_data("http://unused/p.zip")))
            .unwrap();
    fx.consumer.handle(event).await.expect("changed");

    let state = fx
        .consumer
        .handle(RelationEvent::departed("grafana-agent/0"))
        .await
        .expect("departed");

    assert_eq!(state, SidecarState::Stopped);
    assert!(pushed_config(&fx.container).client_urls().is_empty());
    assert!(fx.consumer.registry().is_empty());

    let calls = fx.container.calls();
    assert_eq!(
        calls.last(),
        Some(&ContainerCall::Stop(vec!["promtail".to_string()]))
    );
    // No restart after the departure.
    let departure_calls = &calls[calls
        .iter()
        .rposition(|call| matches!(call, ContainerCall::Push { .. }))
        .unwrap()..];
    assert!(
        !departure_calls
            .iter()
            .any(|call| matches!(call, ContainerCall::Restart(_)))
    );
}

#[tokio::test]
async fn restart_failure_propagates_after_config_write() {
    let mut fx = fixture(sha256_hex(BINARY));
    fx.container.put_file("/tmp/promtail-linux-amd64", BINARY.to_vec());
    fx.consumer
        .handle(RelationEvent::Created)
        .await
        .expect("created");
    fx.container.set_fail_restart(true);

    let event =
        RelationEvent::changed("grafana-agent/0", Some(&changed_data("http://unused/p.zip")))
            .unwrap();
    let err = fx.consumer.handle(event).await.unwrap_err();

    assert!(matches!(err, Error::Container(_)));
    assert_eq!(pushed_config(&fx.container).client_urls(), vec![PUSH_API]);
    assert_eq!(fx.consumer.state(), SidecarState::Configured);
}
