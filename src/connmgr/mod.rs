//! The Connection Manager: allocates and operates the fixed 150-connection
//! pool, translates `MarketChange` events into subscribe/unsubscribe
//! commands, correlates command responses, detects per-`sid` sequence gaps,
//! and reconnects individual connections with back-off.

mod assignment;
mod connection;
mod correlation;
mod sequence;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

pub use assignment::{AssignmentTable, ORDERBOOK_CONN_RANGE};
pub use connection::{ManagedConnection, Role};
pub use correlation::Correlator;
pub use sequence::{SeqObservation, SequenceTracker};

use crate::auth::Signer;
use crate::config::ConnectionManagerConfig;
use crate::domain::{Channel, MarketChange, MarketChangeKind};
use crate::error::{Error, Result};
use crate::wire::{classify, Command, Envelope, WireClient};

const TOTAL_CONNECTIONS: u32 = 150;
const CHANGE_WORKER_COUNT: usize = 10;
const CHANGE_INTAKE_CAPACITY: usize = 1000;

/// One fully-parsed data frame handed to the Router, with the sequence-gap
/// stamps the Connection Manager alone is positioned to compute.
#[derive(Debug, Clone)]
pub struct DataFrame {
    pub bytes: String,
    pub connection_id: u32,
    pub received_at: i64,
    pub seq_gap: bool,
    pub gap_size: i64,
}

#[derive(Debug, Default)]
pub struct ConnectionManagerStats {
    pub change_events_dropped: AtomicU64,
    pub sequence_gaps: AtomicU64,
    pub reconnects: AtomicU64,
    pub subscribe_failures: AtomicU64,
}

pub struct ConnectionManager {
    connections: Vec<Arc<ManagedConnection>>,
    assignment: AssignmentTable,
    sequence: SequenceTracker,
    ticker_sid: DashMap<String, i64>,
    signer: Arc<Signer>,
    ws_url: String,
    config: ConnectionManagerConfig,
    data_tx: mpsc::UnboundedSender<DataFrame>,
    lifecycle_tx: mpsc::Sender<String>,
    shutdown: Arc<std::sync::atomic::AtomicBool>,
    stats: Arc<ConnectionManagerStats>,
}

impl ConnectionManager {
    #[must_use]
    pub fn new(
        signer: Arc<Signer>,
        ws_url: String,
        config: ConnectionManagerConfig,
        data_tx: mpsc::UnboundedSender<DataFrame>,
        lifecycle_tx: mpsc::Sender<String>,
    ) -> Self {
        let connections = (1..=TOTAL_CONNECTIONS)
            .map(|id| {
                let client = Arc::new(WireClient::new(
                    id,
                    ws_url.clone(),
                    config.message_buffer_size,
                    Duration::from_secs(config.ping_timeout_secs),
                ));
                Arc::new(ManagedConnection::new(id, client))
            })
            .collect();
        Self {
            connections,
            assignment: AssignmentTable::new(),
            sequence: SequenceTracker::new(),
            ticker_sid: DashMap::new(),
            signer,
            ws_url,
            config,
            data_tx,
            lifecycle_tx,
            shutdown: Arc::new(std::sync::atomic::AtomicBool::new(false)),
            stats: Arc::new(ConnectionManagerStats::default()),
        }
    }

    #[must_use]
    pub fn stats(&self) -> Arc<ConnectionManagerStats> {
        self.stats.clone()
    }

    #[must_use]
    pub fn connection_roster(&self) -> Vec<(u32, Role, bool, usize)> {
        self.connections
            .iter()
            .map(|c| {
                let assigned = if c.role == Role::Orderbook {
                    self.assignment.tickers_for_conn(c.id).len()
                } else {
                    usize::from(c.global_sid.lock().is_some())
                };
                (c.id, c.role, c.is_healthy(), assigned)
            })
            .collect()
    }

    /// Connects all 150 clients in parallel, subscribes global channels on
    /// the healthy ones, then spawns the per-connection forward/reconnect
    /// tasks and the `MarketChange` worker pool.
    pub async fn start(self: &Arc<Self>, mut changes: broadcast::Receiver<MarketChange>) -> Result<()> {
        let connect_results = futures_util::future::join_all(
            self.connections
                .iter()
                .map(|conn| Self::connect_one(conn.clone(), self.signer.clone())),
        )
        .await;

        let healthy_count = connect_results.iter().filter(|r| r.is_ok()).count();
        if healthy_count < self.config.min_healthy_connections {
            return Err(Error::Config(format!(
                "only {healthy_count} of {TOTAL_CONNECTIONS} connections came up, need {}",
                self.config.min_healthy_connections
            )));
        }
        info!(healthy_count, "connection pool up");

        for conn in &self.connections {
            if !conn.is_healthy() {
                continue;
            }
            if let Some(channel) = conn.role.global_channel() {
                if let Err(e) = self.subscribe_global(conn).await {
                    error!(conn_id = conn.id, channel, error = %e, "global subscribe failed");
                }
            }
        }

        for conn in &self.connections {
            self.spawn_forward_task(conn.clone());
            self.spawn_reconnect_task(conn.clone());
        }

        let (intake_tx, intake_rx) = mpsc::channel::<MarketChange>(CHANGE_INTAKE_CAPACITY);
        let stats = self.stats.clone();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => {
                        if intake_tx.try_send(change).is_err() {
                            stats.change_events_dropped.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "change dispatcher lagged, advancing");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
                if shutdown.load(Ordering::Acquire) {
                    break;
                }
            }
        });

        self.spawn_change_workers(intake_rx);
        Ok(())
    }

    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    async fn connect_one(conn: Arc<ManagedConnection>, signer: Arc<Signer>) -> Result<()> {
        match conn.client.connect(&signer).await {
            Ok(()) => {
                conn.set_healthy(true);
                Ok(())
            }
            Err(e) => {
                warn!(conn_id = conn.id, error = %e, "initial connect failed");
                Err(e)
            }
        }
    }

    async fn subscribe_global(&self, conn: &ManagedConnection) -> Result<()> {
        let channel = conn.role.global_channel().expect("global role");
        let (id, rx) = conn.correlator.register();
        let cmd = Command::subscribe(id, channel, None);
        let payload = serde_json::to_string(&cmd)?;
        conn.client.send(&payload).await?;
        let timeout = Duration::from_secs(self.config.subscribe_timeout_secs);
        let (sid, _) = conn.correlator.await_subscribe(id, rx, timeout).await?;
        *conn.global_sid.lock() = Some(sid);
        Ok(())
    }

    async fn subscribe_orderbook(&self, conn: &ManagedConnection, ticker: &str) -> Result<i64> {
        let (id, rx) = conn.correlator.register();
        let cmd = Command::subscribe(id, Channel::OrderbookDelta.as_str(), Some(ticker.to_string()));
        let payload = serde_json::to_string(&cmd)?;
        conn.client.send(&payload).await?;
        let timeout = Duration::from_secs(self.config.subscribe_timeout_secs);
        let (sid, _) = conn.correlator.await_subscribe(id, rx, timeout).await?;
        Ok(sid)
    }

    async fn unsubscribe(&self, conn: &ManagedConnection, sid: i64) -> Result<()> {
        let (id, rx) = conn.correlator.register();
        let cmd = Command::unsubscribe(id, sid);
        let payload = serde_json::to_string(&cmd)?;
        conn.client.send(&payload).await?;
        let timeout = Duration::from_secs(self.config.subscribe_timeout_secs);
        conn.correlator.await_unsubscribe(id, rx, timeout).await
    }

    fn spawn_change_workers(self: &Arc<Self>, intake_rx: mpsc::Receiver<MarketChange>) {
        let intake_rx = Arc::new(tokio::sync::Mutex::new(intake_rx));
        for _ in 0..CHANGE_WORKER_COUNT {
            let this = self.clone();
            let intake_rx = intake_rx.clone();
            tokio::spawn(async move {
                loop {
                    let change = { intake_rx.lock().await.recv().await };
                    match change {
                        Some(change) => this.handle_change(change).await,
                        None => break,
                    }
                    if this.shutdown.load(Ordering::Acquire) {
                        break;
                    }
                }
            });
        }
    }

    async fn handle_change(&self, change: MarketChange) {
        match change.kind {
            MarketChangeKind::Created => {
                if change
                    .instrument
                    .as_ref()
                    .map(crate::domain::Instrument::is_active)
                    .unwrap_or(false)
                {
                    self.ensure_subscribed(&change.ticker).await;
                }
            }
            MarketChangeKind::StatusChange => {
                let now_active = change
                    .instrument
                    .as_ref()
                    .map(crate::domain::Instrument::is_active)
                    .unwrap_or(false);
                if now_active {
                    self.ensure_subscribed(&change.ticker).await;
                } else {
                    self.ensure_unsubscribed(&change.ticker).await;
                }
            }
            MarketChangeKind::Settled => {
                self.ensure_unsubscribed(&change.ticker).await;
            }
        }
    }

    async fn ensure_subscribed(&self, ticker: &str) {
        if self.assignment.is_assigned(ticker) {
            return;
        }
        let healthy = |id: u32| {
            self.connections
                .get((id - 1) as usize)
                .map(|c| c.is_healthy())
                .unwrap_or(false)
        };
        let Some(conn_id) = self.assignment.pick_least_loaded(&healthy) else {
            warn!(ticker, "no healthy orderbook connection available");
            return;
        };
        let conn = &self.connections[(conn_id - 1) as usize];
        match self.subscribe_orderbook(conn, ticker).await {
            Ok(sid) => {
                self.assignment.assign(ticker, conn_id);
                self.ticker_sid.insert(ticker.to_string(), sid);
            }
            Err(e) => {
                self.stats.subscribe_failures.fetch_add(1, Ordering::Relaxed);
                warn!(ticker, conn_id, error = %e, "orderbook subscribe failed");
            }
        }
    }

    async fn ensure_unsubscribed(&self, ticker: &str) {
        let Some(conn_id) = self.assignment.unassign(ticker) else {
            return;
        };
        let Some((_, sid)) = self.ticker_sid.remove(ticker) else {
            return;
        };
        let conn = &self.connections[(conn_id - 1) as usize];
        if let Err(e) = self.unsubscribe(conn, sid).await {
            warn!(ticker, conn_id, error = %e, "orderbook unsubscribe failed");
        }
    }

    fn spawn_forward_task(self: &Arc<Self>, conn: Arc<ManagedConnection>) {
        let this = self.clone();
        tokio::spawn(async move {
            let Some(mut rx) = conn.client.take_messages().await else {
                return;
            };
            while let Some(frame) = rx.recv().await {
                this.handle_frame(&conn, frame.bytes, frame.received_at);
            }
        });
    }

    fn handle_frame(&self, conn: &ManagedConnection, bytes: String, received_at: i64) {
        let envelope: Envelope = match serde_json::from_str(&bytes) {
            Ok(e) => e,
            Err(e) => {
                debug!(conn_id = conn.id, error = %e, "unparseable frame, forwarding raw");
                let _ = self.data_tx.send(DataFrame {
                    bytes,
                    connection_id: conn.id,
                    received_at,
                    seq_gap: false,
                    gap_size: 0,
                });
                return;
            }
        };

        if let Some(id) = envelope.id {
            if let Some(response) = classify(&envelope) {
                conn.correlator.resolve(id, response);
                return;
            }
        }

        if conn.role == Role::Lifecycle {
            let _ = self.lifecycle_tx.try_send(bytes);
            return;
        }

        let (seq_gap, gap_size) = match (envelope.sid, envelope.seq) {
            (Some(sid), Some(seq)) => {
                let obs = self.sequence.observe(sid, seq);
                if obs.seq_gap {
                    self.stats.sequence_gaps.fetch_add(obs.gap_size as u64, Ordering::Relaxed);
                }
                (obs.seq_gap, obs.gap_size)
            }
            _ => (false, 0),
        };

        let _ = self.data_tx.send(DataFrame {
            bytes,
            connection_id: conn.id,
            received_at,
            seq_gap,
            gap_size,
        });
    }

    fn spawn_reconnect_task(self: &Arc<Self>, conn: Arc<ManagedConnection>) {
        let this = self.clone();
        tokio::spawn(async move {
            loop {
                if this.shutdown.load(Ordering::Acquire) {
                    break;
                }
                if conn.client.wait_for_error().await.is_none() {
                    break;
                }
                conn.set_healthy(false);
                this.stats.reconnects.fetch_add(1, Ordering::Relaxed);

                if let Some(sid) = conn.global_sid.lock().take() {
                    this.sequence.reset(sid);
                }

                let mut backoff = Duration::from_millis(this.config.reconnect_base_wait_ms);
                let max = Duration::from_secs(this.config.reconnect_max_wait_secs);
                loop {
                    if this.shutdown.load(Ordering::Acquire) {
                        return;
                    }
                    tokio::time::sleep(backoff).await;
                    match conn.client.connect(&this.signer).await {
                        Ok(()) => {
                            conn.set_healthy(true);
                            break;
                        }
                        Err(e) => {
                            warn!(conn_id = conn.id, error = %e, "reconnect attempt failed");
                            let next = (backoff.as_secs_f64() * this.config.reconnect_factor).min(max.as_secs_f64());
                            backoff = Duration::from_secs_f64(next);
                        }
                    }
                }

                if let Some(channel) = conn.role.global_channel() {
                    if let Err(e) = this.subscribe_global(&conn).await {
                        error!(conn_id = conn.id, channel, error = %e, "re-subscribe after reconnect failed");
                    }
                } else {
                    for ticker in this.assignment.tickers_for_conn(conn.id) {
                        match this.subscribe_orderbook(&conn, &ticker).await {
                            Ok(sid) => {
                                this.ticker_sid.insert(ticker, sid);
                            }
                            Err(e) => {
                                warn!(conn_id = conn.id, ticker, error = %e, "re-subscribe after reconnect failed");
                            }
                        }
                    }
                }
            }
        });
    }

    /// Force-disconnects a named connection, letting its reconnect task pick
    /// it back up. Exposed to the health/debug HTTP surface and the operator
    /// CLI.
    pub async fn force_disconnect(&self, conn_id: u32) -> Result<()> {
        let conn = self
            .connections
            .get((conn_id - 1) as usize)
            .ok_or_else(|| Error::Config(format!("no such connection: {conn_id}")))?;
        conn.client.close().await;
        conn.set_healthy(false);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orderbook_channel_name_matches_wire_format() {
        assert_eq!(Channel::OrderbookDelta.as_str(), "orderbook_delta");
    }
}
