//! The Market Registry: authoritative, in-memory instrument catalog plus the
//! lifecycle-change broadcast that drives subscription assignment downstream.

mod lifecycle;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::{broadcast, mpsc};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::RegistryConfig;
use crate::domain::{Instrument, MarketChange, MarketChangeKind, Status};
use crate::error::Result;
use crate::rest::RestClient;

pub use lifecycle::LifecycleEvent;

/// Channel capacity for the `MarketChange` broadcast. Overflow policy is
/// "advance": a lagging receiver drops the oldest unseen events and resumes
/// from the newest, since reconciliation independently heals missed state.
const CHANGE_CHANNEL_CAPACITY: usize = 1000;

#[derive(Debug, Default)]
pub struct RegistryStats {
    pub reconcile_cycles: AtomicU64,
    pub lifecycle_events_ingested: AtomicU64,
    pub lifecycle_events_malformed: AtomicU64,
    pub changes_dropped: AtomicU64,
}

pub struct Registry {
    rest: Arc<RestClient>,
    config: RegistryConfig,
    markets: RwLock<HashMap<String, Instrument>>,
    change_tx: broadcast::Sender<MarketChange>,
    shutdown: Arc<std::sync::atomic::AtomicBool>,
    stats: Arc<RegistryStats>,
}

impl Registry {
    #[must_use]
    pub fn new(rest: Arc<RestClient>, config: RegistryConfig) -> Self {
        let (change_tx, _rx) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            rest,
            config,
            markets: RwLock::new(HashMap::new()),
            change_tx,
            shutdown: Arc::new(std::sync::atomic::AtomicBool::new(false)),
            stats: Arc::new(RegistryStats::default()),
        }
    }

    #[must_use]
    pub fn stats(&self) -> Arc<RegistryStats> {
        self.stats.clone()
    }

    /// Blocks for the initial sync: the exchange-status check plus a full
    /// paginated pull of the `open`/`unopened` universe. The reconciliation
    /// loop and lifecycle-ingest task are started separately via
    /// `run_background`, once the caller has an `Arc<Registry>`.
    pub async fn start(&self) -> Result<()> {
        self.wait_for_exchange_active().await;
        self.initial_sync().await?;
        Ok(())
    }

    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn get_active_markets(&self) -> Vec<Instrument> {
        self.markets
            .read()
            .values()
            .filter(|m| m.is_active())
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn get_market(&self, ticker: &str) -> Option<Instrument> {
        self.markets.read().get(ticker).cloned()
    }

    #[must_use]
    pub fn market_count(&self) -> usize {
        self.markets.read().len()
    }

    #[must_use]
    pub fn subscribe_changes(&self) -> broadcast::Receiver<MarketChange> {
        self.change_tx.subscribe()
    }

    fn emit(&self, change: MarketChange) {
        // `send` only errors when there are no receivers; that's expected
        // before the Connection Manager has subscribed and is not a drop.
        let _ = self.change_tx.send(change);
    }

    async fn wait_for_exchange_active(&self) {
        loop {
            match self.rest.exchange_status().await {
                Ok(status) if status.exchange_active => return,
                Ok(status) => {
                    warn!(resume = ?status.estimated_resume_time, "exchange inactive, waiting");
                    sleep(Duration::from_secs(30)).await;
                }
                Err(e) => {
                    warn!(error = %e, "exchange status check failed, retrying");
                    sleep(Duration::from_secs(5)).await;
                }
            }
        }
    }

    async fn initial_sync(&self) -> Result<()> {
        for status in ["open", "unopened"] {
            self.pull_all_pages(status, true).await?;
        }
        Ok(())
    }

    /// Pages through one status filter with capped exponential back-off on
    /// transient REST errors (the Registry retries forever while the process
    /// runs). `emit_created` controls whether newly discovered instruments
    /// raise a `created` event (true during initial sync and reconciliation
    /// discovery, irrelevant elsewhere).
    async fn pull_all_pages(&self, status: &str, emit_created: bool) -> Result<()> {
        let mut cursor: Option<String> = None;
        let mut backoff = Duration::from_secs(1);
        loop {
            let page = match self
                .rest
                .markets_page(status, cursor.as_deref(), self.config.page_size)
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    error!(error = %e, status, "markets page fetch failed, retrying");
                    sleep(backoff).await;
                    backoff = (backoff * 2).min(Duration::from_secs(300));
                    continue;
                }
            };
            backoff = Duration::from_secs(1);

            for dto in page.markets {
                let instrument: Instrument = dto.into();
                self.upsert(instrument, emit_created);
            }

            match page.cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }
        Ok(())
    }

    /// Inserts or updates one instrument, emitting the appropriate change.
    fn upsert(&self, instrument: Instrument, emit_created_on_insert: bool) {
        let ticker = instrument.ticker.clone();
        let mut markets = self.markets.write();
        match markets.get(&ticker) {
            None => {
                let is_active = instrument.is_active();
                let new_status = instrument.status;
                markets.insert(ticker.clone(), instrument.clone());
                drop(markets);
                if emit_created_on_insert && is_active {
                    self.emit(MarketChange {
                        ticker,
                        kind: MarketChangeKind::Created,
                        old_status: None,
                        new_status,
                        instrument: Some(instrument),
                    });
                }
            }
            Some(existing) if existing.status != instrument.status => {
                let old_status = existing.status;
                let new_status = instrument.status;
                markets.insert(ticker.clone(), instrument.clone());
                drop(markets);
                let kind = if new_status.is_terminal() {
                    MarketChangeKind::Settled
                } else {
                    MarketChangeKind::StatusChange
                };
                self.emit(MarketChange {
                    ticker,
                    kind,
                    old_status: Some(old_status),
                    new_status,
                    instrument: Some(instrument),
                });
            }
            Some(_) => {
                // Same status: no-op, but still refresh other attributes.
                markets.insert(ticker, instrument);
            }
        }
    }

}

/// Runs the Registry's reconciliation loop and lifecycle-ingest task. Takes
/// `Arc<Registry>` so the spawned tasks can outlive the caller's stack frame.
pub async fn run_background(registry: Arc<Registry>, lifecycle_source: mpsc::Receiver<String>) {
    let reconcile = tokio::spawn(reconcile_loop(registry.clone()));
    let lifecycle = tokio::spawn(lifecycle_ingest_loop(registry, lifecycle_source));
    let _ = tokio::join!(reconcile, lifecycle);
}

async fn reconcile_loop(registry: Arc<Registry>) {
    let interval = Duration::from_secs(registry.config.reconcile_interval_secs);
    loop {
        sleep(interval).await;
        if registry.shutdown.load(Ordering::Acquire) {
            break;
        }
        debug!("reconciliation tick");
        for status in ["open", "unopened"] {
            if let Err(e) = registry.pull_all_pages(status, true).await {
                error!(error = %e, status, "reconciliation pass failed");
            }
        }
        registry.stats.reconcile_cycles.fetch_add(1, Ordering::Relaxed);
    }
}

async fn lifecycle_ingest_loop(registry: Arc<Registry>, mut source: mpsc::Receiver<String>) {
    while let Some(raw) = source.recv().await {
        if registry.shutdown.load(Ordering::Acquire) {
            break;
        }
        match serde_json::from_str::<LifecycleEvent>(&raw) {
            Ok(event) => {
                registry.stats.lifecycle_events_ingested.fetch_add(1, Ordering::Relaxed);
                if let Err(e) = registry.apply_lifecycle_event(event).await {
                    error!(error = %e, "lifecycle event REST fetch failed");
                }
            }
            Err(e) => {
                registry.stats.lifecycle_events_malformed.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, raw = %raw, "malformed lifecycle event, discarding");
            }
        }
    }
}

impl Registry {
    async fn apply_lifecycle_event(&self, event: LifecycleEvent) -> Result<()> {
        match event {
            LifecycleEvent::Created { ticker } => {
                // Latency of a point REST fetch is acceptable: creations are rare.
                let dto = self.rest.market(&ticker).await?;
                let instrument = dto.into();
                self.upsert(instrument, true);
            }
            LifecycleEvent::StatusChange { ticker, new_status } => {
                let mut markets = self.markets.write();
                if let Some(existing) = markets.get(&ticker).cloned() {
                    let old_status = existing.status;
                    let status = Status::parse(&new_status);
                    let mut updated = existing;
                    updated.status = status;
                    markets.insert(ticker.clone(), updated.clone());
                    drop(markets);
                    self.emit(MarketChange {
                        ticker,
                        kind: MarketChangeKind::StatusChange,
                        old_status: Some(old_status),
                        new_status: status,
                        instrument: Some(updated),
                    });
                }
            }
            LifecycleEvent::Settled { ticker, result } => {
                let mut markets = self.markets.write();
                if let Some(existing) = markets.get(&ticker).cloned() {
                    let old_status = existing.status;
                    let mut updated = existing;
                    updated.status = Status::Settled;
                    updated.result = Some(result);
                    markets.insert(ticker.clone(), updated.clone());
                    drop(markets);
                    self.emit(MarketChange {
                        ticker,
                        kind: MarketChangeKind::Settled,
                        old_status: Some(old_status),
                        new_status: Status::Settled,
                        instrument: Some(updated),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InstrumentType;

    fn sample(ticker: &str, status: Status) -> Instrument {
        Instrument {
            ticker: ticker.into(),
            event_ticker: "EVT".into(),
            title: "Sample".into(),
            instrument_type: InstrumentType::Binary,
            status,
            open_ts: 0,
            close_ts: 0,
            expiration_ts: 0,
            updated_at: 0,
            result: None,
        }
    }

    fn registry() -> Registry {
        Registry::new(
            Arc::new(RestClient::new("http://localhost".into(), Duration::from_secs(1))),
            RegistryConfig::default(),
        )
    }

    #[test]
    fn upsert_new_active_instrument_emits_created() {
        let reg = registry();
        let mut rx = reg.subscribe_changes();
        reg.upsert(sample("T-1", Status::Active), true);
        let change = rx.try_recv().expect("expected a created event");
        assert!(matches!(change.kind, MarketChangeKind::Created));
        assert_eq!(reg.get_active_markets().len(), 1);
    }

    #[test]
    fn upsert_status_change_emits_status_change() {
        let reg = registry();
        reg.upsert(sample("T-1", Status::Initialized), false);
        let mut rx = reg.subscribe_changes();
        reg.upsert(sample("T-1", Status::Active), true);
        let change = rx.try_recv().expect("expected a status_change event");
        assert!(matches!(change.kind, MarketChangeKind::StatusChange));
        assert_eq!(change.old_status, Some(Status::Initialized));
    }

    #[test]
    fn upsert_settled_marks_terminal() {
        let reg = registry();
        reg.upsert(sample("T-1", Status::Finalized), false);
        let mut rx = reg.subscribe_changes();
        reg.upsert(sample("T-1", Status::Settled), true);
        let change = rx.try_recv().expect("expected a settled event");
        assert!(matches!(change.kind, MarketChangeKind::Settled));
        assert_eq!(reg.get_active_markets().len(), 0);
    }

    #[test]
    fn same_status_upsert_is_a_no_op_for_changes() {
        let reg = registry();
        reg.upsert(sample("T-1", Status::Active), true);
        let mut rx = reg.subscribe_changes();
        reg.upsert(sample("T-1", Status::Active), true);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn active_set_equals_active_or_open_count() {
        let reg = registry();
        reg.upsert(sample("A", Status::Active), false);
        reg.upsert(sample("B", Status::Open), false);
        reg.upsert(sample("C", Status::Closed), false);
        assert_eq!(reg.get_active_markets().len(), 2);
    }
}
