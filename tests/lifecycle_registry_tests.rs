//! End-to-end coverage of the lifecycle-driven discovery path: a raw
//! `market_lifecycle` frame (as the Connection Manager would forward it)
//! triggers a point REST fetch and an emitted `MarketChange`, the same
//! signal the Connection Manager's change-worker pool acts on to assign a
//! fresh orderbook subscription.

use std::time::Duration;

use axum::extract::Path;
use axum::routing::get;
use axum::Json;
use gatherer::config::RegistryConfig;
use gatherer::domain::{MarketChangeKind, Status};
use gatherer::registry::{self, Registry};
use gatherer::rest::RestClient;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::timeout;

async fn market_by_ticker(Path(ticker): Path<String>) -> Json<serde_json::Value> {
    Json(json!({
        "ticker": ticker,
        "event_ticker": "EVT",
        "title": "Sample market",
        "market_type": "binary",
        "status": "active",
    }))
}

async fn spawn_mock_rest() -> String {
    let app = axum::Router::new().route("/markets/:ticker", get(market_by_ticker));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn created_lifecycle_event_triggers_fetch_and_emits_created_change() {
    let base_url = spawn_mock_rest().await;
    let rest = Arc::new(RestClient::new(base_url, Duration::from_secs(5)));
    let registry = Arc::new(Registry::new(rest, RegistryConfig::default()));

    let mut changes = registry.subscribe_changes();
    let (lifecycle_tx, lifecycle_rx) = mpsc::channel::<String>(10);
    tokio::spawn(registry::run_background(registry.clone(), lifecycle_rx));

    lifecycle_tx
        .send(r#"{"event_type":"created","market_ticker":"T-LIFECYCLE-1"}"#.to_string())
        .await
        .expect("send lifecycle frame");

    let change = timeout(Duration::from_secs(5), changes.recv())
        .await
        .expect("change within deadline")
        .expect("channel open");

    assert_eq!(change.ticker, "T-LIFECYCLE-1");
    assert!(matches!(change.kind, MarketChangeKind::Created));
    assert_eq!(change.new_status, Status::Active);
    assert_eq!(registry.get_market("T-LIFECYCLE-1").map(|m| m.status), Some(Status::Active));
}

#[tokio::test]
async fn malformed_lifecycle_frame_is_discarded_without_a_change() {
    let base_url = spawn_mock_rest().await;
    let rest = Arc::new(RestClient::new(base_url, Duration::from_secs(5)));
    let registry = Arc::new(Registry::new(rest, RegistryConfig::default()));

    let mut changes = registry.subscribe_changes();
    let (lifecycle_tx, lifecycle_rx) = mpsc::channel::<String>(10);
    tokio::spawn(registry::run_background(registry.clone(), lifecycle_rx));

    lifecycle_tx.send("not json".to_string()).await.expect("send");

    // Nothing should arrive; give the ingest loop a moment to (not) act.
    let result = timeout(Duration::from_millis(300), changes.recv()).await;
    assert!(result.is_err(), "expected no change to be emitted");
}
