//! The Snapshot Poller: periodic full-book REST sweep across active
//! instruments, recovering state the streaming path might have missed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::config::PollerConfig;
use crate::domain::{micros_now, SnapshotSource};
use crate::rest::RestClient;
use crate::registry::Registry;
use crate::writers::transform::dollar_pairs_to_levels;
use crate::writers::OrderbookWriter;

#[derive(Debug, Default)]
pub struct PollerStats {
    pub cycles: AtomicU64,
    pub snapshots_fetched: AtomicU64,
    pub errors: AtomicU64,
}

pub struct SnapshotPoller {
    rest: Arc<RestClient>,
    registry: Arc<Registry>,
    writer: Arc<OrderbookWriter>,
    config: PollerConfig,
    stats: Arc<PollerStats>,
    shutdown: Arc<std::sync::atomic::AtomicBool>,
}

impl SnapshotPoller {
    #[must_use]
    pub fn new(rest: Arc<RestClient>, registry: Arc<Registry>, writer: Arc<OrderbookWriter>, config: PollerConfig) -> Self {
        Self {
            rest,
            registry,
            writer,
            config,
            stats: Arc::new(PollerStats::default()),
            shutdown: Arc::new(std::sync::atomic::AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn stats(&self) -> Arc<PollerStats> {
        self.stats.clone()
    }

    /// Spawns the periodic sweep task. Cycles overlap gracefully at large
    /// cardinalities since each tick's workers are independent of the last.
    pub fn start(self: &Arc<Self>) {
        let this = self.clone();
        tokio::spawn(async move { this.run().await });
    }

    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    async fn run(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(Duration::from_secs(self.config.poll_interval_secs.max(1)));
        loop {
            ticker.tick().await;
            if self.shutdown.load(Ordering::Acquire) {
                break;
            }
            self.run_cycle().await;
        }
    }

    async fn run_cycle(self: &Arc<Self>) {
        let tickers: Vec<String> = self
            .registry
            .get_active_markets()
            .into_iter()
            .map(|m| m.ticker)
            .collect();
        debug!(count = tickers.len(), "snapshot poll cycle starting");

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut handles = Vec::with_capacity(tickers.len());
        for ticker in tickers {
            let permit = semaphore.clone();
            let this = self.clone();
            handles.push(tokio::spawn(async move {
                let _permit = permit.acquire_owned().await;
                this.poll_one(&ticker).await;
            }));
        }
        for handle in handles {
            let _ = handle.await;
        }

        self.stats.cycles.fetch_add(1, Ordering::Relaxed);
    }

    async fn poll_one(&self, ticker: &str) {
        let response = match self.rest.orderbook(ticker).await {
            Ok(r) => r,
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                warn!(ticker, error = %e, "snapshot poll failed, skipping until next cycle");
                return;
            }
        };

        let record = snapshot_from_levels(ticker, &response.orderbook.yes_dollars, &response.orderbook.no_dollars, micros_now());
        self.writer.write_rest_snapshot(record.into());
        self.stats.snapshots_fetched.fetch_add(1, Ordering::Relaxed);
    }
}

/// Builds the stored snapshot shape from the REST orderbook's dollar-string
/// arrays, mirroring the same bid-to-ask derivation the WS snapshot writer
/// uses. `exchange_ts` is unknown for a REST-polled snapshot (the endpoint
/// carries no timestamp), so it is left at zero per the data model.
fn snapshot_from_levels(
    ticker: &str,
    yes_dollars: &[(String, i64)],
    no_dollars: &[(String, i64)],
    snapshot_ts: i64,
) -> crate::domain::OrderbookSnapshot {
    let yes_bids = dollar_pairs_to_levels(yes_dollars);
    let no_bids = dollar_pairs_to_levels(no_dollars);
    let yes_asks = crate::domain::derive_asks(&no_bids);
    let no_asks = crate::domain::derive_asks(&yes_bids);
    let (best_yes_bid, best_yes_ask, spread) = crate::domain::best_and_spread(&yes_bids, &no_bids);
    crate::domain::OrderbookSnapshot {
        ticker: ticker.to_string(),
        snapshot_ts,
        exchange_ts: 0,
        source: SnapshotSource::Rest,
        yes_bids,
        yes_asks,
        no_bids,
        no_asks,
        best_yes_bid,
        best_yes_ask,
        spread,
        sid: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_from_levels_derives_asks_and_marks_rest_source() {
        let yes_dollars = vec![("0.52".to_string(), 100)];
        let no_dollars = vec![("0.48".to_string(), 150)];
        let snapshot = snapshot_from_levels("T", &yes_dollars, &no_dollars, 5_000);
        assert_eq!(snapshot.source, SnapshotSource::Rest);
        assert_eq!(snapshot.snapshot_ts, 5_000);
        assert_eq!(snapshot.exchange_ts, 0);
        assert_eq!(snapshot.best_yes_bid, 52_000);
        assert_eq!(snapshot.best_yes_ask, 52_000);
        assert_eq!(snapshot.no_asks[0].price, 48_000);
    }

    #[test]
    fn empty_book_yields_zeroed_best_prices() {
        let snapshot = snapshot_from_levels("T", &[], &[], 0);
        assert_eq!(snapshot.best_yes_bid, 0);
        assert_eq!(snapshot.best_yes_ask, 0);
        assert_eq!(snapshot.spread, 0);
    }
}
