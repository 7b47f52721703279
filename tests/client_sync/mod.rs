//! Full client against the fake config service over HTTP
use std::time::Duration;

use apollo_mirror::ChangeType;
use apollo_mirror::Client;
use apollo_mirror::Error;
use apollo_mirror::Snapshot;
use apollo_mirror::SyncError;
use tempfile::tempdir;

use crate::common::backup_path;
use crate::common::map;
use crate::common::mirror_config;
use crate::common::FakeConfigServer;
use crate::enable_logger;

const WAIT: Duration = Duration::from_secs(10);

#[tokio::test]
async fn test_release_flows_from_server_to_subscriber() {
    enable_logger();
    let server = FakeConfigServer::start().await;
    server.seed("application", &[("timeout", "30"), ("host", "db")], "r1");
    server.seed("redis.json", &[("content", "{\"port\":6379}")], "r1");
    let dir = tempdir().unwrap();

    let client = Client::builder(mirror_config(&server.address(), dir.path(), &["application", "redis.json"]))
        .build()
        .await
        .unwrap();
    assert_eq!(client.get("timeout").as_deref(), Some("30"));
    assert_eq!(client.get_content("redis.json").as_deref(), Some("{\"port\":6379}"));
    assert_eq!(client.release_key("application"), "r1");

    let events = client.subscribe();
    client.start().unwrap();

    server.publish("application", &[("timeout", "60"), ("retries", "3")], "r2");
    let event = tokio::time::timeout(WAIT, events.recv()).await.unwrap().unwrap();

    assert_eq!(event.namespace, "application");
    assert_eq!(event.len(), 3);
    assert_eq!(event.get("timeout").unwrap().change_type, ChangeType::Modify);
    assert_eq!(event.get("timeout").unwrap().old_value, "30");
    assert_eq!(event.get("retries").unwrap().change_type, ChangeType::Add);
    assert_eq!(event.get("host").unwrap().change_type, ChangeType::Delete);
    assert_eq!(client.get("timeout").as_deref(), Some("60"));
    assert!(server.configfiles_hits() >= 1);

    server.publish("redis.json", &[("content", "{\"port\":6380}")], "r2");
    let event = tokio::time::timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert_eq!(event.namespace, "redis.json");
    assert_eq!(event.get("content").unwrap().new_value, "{\"port\":6380}");

    client.close().await.unwrap();
    let persisted: Snapshot =
        serde_json::from_slice(&std::fs::read(backup_path(dir.path(), "application")).unwrap()).unwrap();
    assert_eq!(persisted.configurations, map(&[("timeout", "60"), ("retries", "3")]));
    server.stop().await;
}

// Stale backup and an unavailable server at startup: the namespace serves
// the backup, then the first successful refresh replaces it in one event.
#[tokio::test]
async fn test_stale_backup_then_server_recovers() {
    enable_logger();
    let server = FakeConfigServer::start().await;
    server.seed("application", &[("a", "new"), ("b", "2")], "r2");
    server.set_down(true);

    let dir = tempdir().unwrap();
    let stale = Snapshot::new("application", map(&[("a", "old"), ("z", "gone")])).with_release_key("r1");
    std::fs::create_dir_all(backup_path(dir.path(), "application").parent().unwrap()).unwrap();
    std::fs::write(backup_path(dir.path(), "application"), serde_json::to_vec(&stale).unwrap()).unwrap();

    let mut config = mirror_config(&server.address(), dir.path(), &["application"]);
    config.retry.refresh_interval_in_secs = 1;
    let client = Client::builder(config).build().await.unwrap();
    assert_eq!(client.get("a").as_deref(), Some("old"));
    assert_eq!(client.release_key("application"), "r1");

    let events = client.subscribe();
    client.start().unwrap();
    server.set_down(false);

    let event = tokio::time::timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert_eq!(event.len(), 3);
    assert_eq!(event.get("a").unwrap().change_type, ChangeType::Modify);
    assert_eq!(event.get("b").unwrap().change_type, ChangeType::Add);
    assert_eq!(event.get("z").unwrap().change_type, ChangeType::Delete);
    assert_eq!(client.release_key("application"), "r2");

    client.close().await.unwrap();
    server.stop().await;
}

#[tokio::test]
async fn test_unchanged_release_is_not_refetched() {
    let server = FakeConfigServer::start().await;
    server.seed("application", &[("a", "1")], "r1");
    let dir = tempdir().unwrap();

    let mut config = mirror_config(&server.address(), dir.path(), &["application"]);
    config.retry.refresh_interval_in_secs = 1;
    let client = Client::builder(config).build().await.unwrap();
    let events = client.subscribe();
    client.start().unwrap();

    tokio::time::sleep(Duration::from_millis(2_500)).await;

    // seed + at least one keyed refresh answered with 304
    assert!(server.configs_hits() >= 2);
    assert!(events.try_recv().is_none());
    assert_eq!(client.release_key("application"), "r1");
    assert_eq!(client.get("a").as_deref(), Some("1"));

    client.close().await.unwrap();
    server.stop().await;
}

#[tokio::test]
async fn test_build_fails_only_when_every_namespace_is_unseedable() {
    let server = FakeConfigServer::start().await;
    server.seed("application", &[("a", "1")], "r1");
    let dir = tempdir().unwrap();

    let err = Client::builder(mirror_config(&server.address(), dir.path(), &["missing"]))
        .build()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Sync(SyncError::Initialization { .. })));

    let (client, failures) = Client::builder(mirror_config(&server.address(), dir.path(), &["application", "missing"]))
        .build_reporting()
        .await
        .unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "missing");
    assert_eq!(client.namespaces(), vec!["application".to_string()]);
    assert_eq!(client.get("a").as_deref(), Some("1"));

    client.close().await.unwrap();
    server.stop().await;
}

#[tokio::test]
async fn test_unreachable_server_with_backup_still_serves() {
    let server = FakeConfigServer::start().await;
    server.seed("application", &[("a", "1")], "r1");
    let dir = tempdir().unwrap();
    let address = server.address();

    let client = Client::builder(mirror_config(&address, dir.path(), &["application"]))
        .build()
        .await
        .unwrap();
    client.close().await.unwrap();
    server.stop().await;

    // nothing listens any more
    let client = Client::builder(mirror_config(&address, dir.path(), &["application"]))
        .build()
        .await
        .unwrap();
    client.start().unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(client.get("a").as_deref(), Some("1"));
    tokio::time::timeout(WAIT, client.close()).await.unwrap().unwrap();
}
