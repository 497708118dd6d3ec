//! SOS feed integration tests: nearby polling drives the badge from the
//! fresh list, and responding removes the request locally.

mod common;

use std::time::Duration;

use anyhow::Result;
use serde_json::json;
use tempfile::tempdir;

use pharmalink::config::Config;
use pharmalink::identity::ClientCore;
use pharmalink::sos::SosFeed;

fn config_for(base: &str, dir: &std::path::Path) -> Config {
    Config {
        api_base: reqwest::Url::parse(base).unwrap(),
        credentials_path: dir.join("creds.json"),
        sos_interval: Duration::from_millis(20),
        notify_interval: Duration::from_millis(20),
        sos_radius_km: 10,
    }
}

fn seed_sos(state: &common::TestState) {
    *state.sos_requests.write() = vec![
        json!({ "id": "s-far", "patientName": "A", "distance": 7.5, "status": "PENDING", "createdAt": "2026-08-02T08:00:00Z" }),
        json!({ "id": "s-near", "patientName": "B", "note": "urgent insulin", "distance": 0.8, "status": "PENDING", "createdAt": "2026-08-02T08:05:00Z" }),
    ];
}

#[tokio::test]
async fn polling_fills_badge_and_sorts_nearest_first() -> Result<()> {
    let backend = common::spawn_backend().await;
    let tmp = tempdir()?;
    let core = ClientCore::new(&config_for(&backend.base, tmp.path()));
    core.manager.login("ph@x.com", "pw").await?;
    seed_sos(&backend.state);

    let feed = SosFeed::new();
    let handle = feed.start_polling(&core.api, Duration::from_millis(20), 10);
    tokio::time::sleep(Duration::from_millis(80)).await;

    assert_eq!(feed.badge(), 2);
    let ids: Vec<String> = feed.requests().into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec!["s-near", "s-far"]);
    assert!(feed.pharmacy_position().is_some());

    // Badge is recomputed from the fresh list, not patched incrementally.
    backend.state.sos_requests.write().pop();
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(feed.badge(), 1);

    handle.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn respond_drops_the_request_locally() -> Result<()> {
    let backend = common::spawn_backend().await;
    let tmp = tempdir()?;
    let core = ClientCore::new(&config_for(&backend.base, tmp.path()));
    core.manager.login("ph@x.com", "pw").await?;
    seed_sos(&backend.state);

    let feed = SosFeed::new();
    let handle = feed.start_polling(&core.api, Duration::from_millis(20), 10);
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(feed.badge(), 2);
    handle.shutdown().await;

    feed.respond(&core.api, "s-near", true, Some("on our way")).await?;
    assert_eq!(feed.badge(), 1);
    assert!(feed.requests().iter().all(|r| r.id != "s-near"));
    Ok(())
}
