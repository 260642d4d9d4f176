//! Operator-facing HTTP surface: a liveness probe plus read-only debug
//! endpoints backed by the Registry and Connection Manager, and one
//! operational write (`POST /debug/disconnect`) used by the CLI and by
//! operators poking at a stuck connection by hand.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::connmgr::ConnectionManager;
use crate::registry::Registry;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub connmgr: Arc<ConnectionManager>,
}

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
    active_markets: usize,
}

async fn health(State(state): State<AppState>) -> Json<HealthBody> {
    Json(HealthBody {
        status: "ok",
        active_markets: state.registry.market_count(),
    })
}

#[derive(Serialize)]
struct MarketSummary {
    ticker: String,
    status: String,
    is_active: bool,
}

async fn debug_markets(State(state): State<AppState>) -> Json<Vec<MarketSummary>> {
    let markets = state
        .registry
        .get_active_markets()
        .into_iter()
        .map(|m| MarketSummary {
            ticker: m.ticker.clone(),
            is_active: m.is_active(),
            status: format!("{:?}", m.status),
        })
        .collect();
    Json(markets)
}

#[derive(Serialize)]
struct ConnectionSummary {
    id: u32,
    role: String,
    healthy: bool,
    assigned: usize,
}

async fn debug_connections(State(state): State<AppState>) -> Json<Vec<ConnectionSummary>> {
    let roster = state
        .connmgr
        .connection_roster()
        .into_iter()
        .map(|(id, role, healthy, assigned)| ConnectionSummary {
            id,
            role: format!("{role:?}"),
            healthy,
            assigned,
        })
        .collect();
    Json(roster)
}

#[derive(Deserialize)]
struct DisconnectParams {
    conn: u32,
}

async fn debug_disconnect(
    State(state): State<AppState>,
    Query(params): Query<DisconnectParams>,
) -> StatusCode {
    match state.connmgr.force_disconnect(params.conn).await {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::NOT_FOUND,
    }
}

#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/debug/markets", get(debug_markets))
        .route("/debug/connections", get(debug_connections))
        .route("/debug/disconnect", post(debug_disconnect))
        .with_state(state)
}

/// Binds and serves the health/debug surface until the process exits; the
/// Supervisor does not currently tear this down gracefully on shutdown
/// (it is the last component brought up and dies with the process).
pub async fn serve(bind: &str, state: AppState) -> crate::error::Result<()> {
    let addr: SocketAddr = bind
        .parse()
        .map_err(|e| crate::error::Error::Config(format!("invalid health.bind address: {e}")))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "health/debug HTTP surface listening");
    axum::serve(listener, router(state))
        .await
        .map_err(crate::error::Error::Io)?;
    Ok(())
}
