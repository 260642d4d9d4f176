//! Orderbook writer: two independent batches (delta, snapshot) sharing one
//! consumer loop and one flush timer, since both come off the same queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, error, warn};

use super::transform::{delta_to_record, snapshot_to_record};
use super::WriterStats;
use crate::config::WritersConfig;
use crate::domain::SnapshotSource;
use crate::queue::GrowableQueue;
use crate::router::RoutedMessage;
use crate::storage::{OrderbookDeltaRow, OrderbookSnapshotRow, Store};

pub struct OrderbookWriter {
    queue: GrowableQueue<RoutedMessage>,
    store: Store,
    config: WritersConfig,
    delta_batch: Mutex<Vec<OrderbookDeltaRow>>,
    snapshot_batch: Mutex<Vec<OrderbookSnapshotRow>>,
    stats: Arc<WriterStats>,
    shutdown: Arc<AtomicBool>,
}

impl OrderbookWriter {
    #[must_use]
    pub fn new(queue: GrowableQueue<RoutedMessage>, store: Store, config: WritersConfig) -> Self {
        Self {
            queue,
            store,
            config,
            delta_batch: Mutex::new(Vec::new()),
            snapshot_batch: Mutex::new(Vec::new()),
            stats: Arc::new(WriterStats::default()),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn stats(&self) -> Arc<WriterStats> {
        self.stats.clone()
    }

    pub fn start(self: &Arc<Self>) {
        let consumer = self.clone();
        tokio::spawn(async move { consumer.run_consumer().await });

        let flusher = self.clone();
        tokio::spawn(async move { flusher.run_flusher().await });
    }

    pub async fn stop(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.flush_both();
    }

    /// Hands a REST-derived snapshot directly to the write path, bypassing
    /// the queue: the Snapshot Poller writes synchronously, one insert per
    /// poll, not batched with the WS consumer's accumulation.
    pub fn write_rest_snapshot(&self, row: OrderbookSnapshotRow) {
        match self.store.insert_one_snapshot(&row) {
            Ok(outcome) => {
                self.stats.inserts.fetch_add(outcome.inserted as u64, Ordering::Relaxed);
                self.stats.duplicates.fetch_add(outcome.duplicates as u64, Ordering::Relaxed);
                self.stats.flushes.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                error!(error = %e, "rest snapshot insert failed");
            }
        }
    }

    async fn run_consumer(self: Arc<Self>) {
        loop {
            if self.shutdown.load(Ordering::Acquire) {
                break;
            }
            match self.queue.try_receive() {
                Some(RoutedMessage::OrderbookDelta { msg, sid, seq, exchange_ts, received_at, seq_gap, gap_size }) => {
                    if seq_gap {
                        self.stats.sequence_gaps.fetch_add(1, Ordering::Relaxed);
                        warn!(ticker = %msg.market_ticker, sid, gap_size, "sequence gap observed");
                    }
                    let record = delta_to_record(&msg, sid, seq, exchange_ts, received_at, seq_gap, gap_size);
                    let reached_batch_size = {
                        let mut batch = self.delta_batch.lock();
                        batch.push(record.into());
                        batch.len() >= self.config.batch_size
                    };
                    if reached_batch_size {
                        self.flush_deltas();
                    }
                }
                Some(RoutedMessage::OrderbookSnapshot { msg, sid, exchange_ts, received_at, .. }) => {
                    let record = snapshot_to_record(&msg, Some(sid), exchange_ts, received_at, SnapshotSource::Ws);
                    let reached_batch_size = {
                        let mut batch = self.snapshot_batch.lock();
                        batch.push(record.into());
                        batch.len() >= self.config.batch_size
                    };
                    if reached_batch_size {
                        self.flush_snapshots();
                    }
                }
                Some(_) => {}
                None => {
                    if self.queue.is_closed() {
                        self.flush_both();
                        break;
                    }
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }

    async fn run_flusher(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(Duration::from_secs(self.config.flush_interval_secs.max(1)));
        loop {
            ticker.tick().await;
            if self.shutdown.load(Ordering::Acquire) {
                break;
            }
            self.flush_both();
        }
    }

    fn flush_both(&self) {
        self.flush_deltas();
        self.flush_snapshots();
    }

    fn flush_deltas(&self) {
        let rows = {
            let mut batch = self.delta_batch.lock();
            if batch.is_empty() {
                return;
            }
            std::mem::take(&mut *batch)
        };
        let attempted = rows.len();
        match self.store.insert_orderbook_deltas(&rows) {
            Ok(outcome) => {
                self.stats.inserts.fetch_add(outcome.inserted as u64, Ordering::Relaxed);
                self.stats.duplicates.fetch_add(outcome.duplicates as u64, Ordering::Relaxed);
                self.stats.flushes.fetch_add(1, Ordering::Relaxed);
                debug!(attempted, inserted = outcome.inserted, "delta batch flushed");
            }
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                error!(attempted, error = %e, "delta batch insert failed, discarding batch");
            }
        }
    }

    fn flush_snapshots(&self) {
        let rows = {
            let mut batch = self.snapshot_batch.lock();
            if batch.is_empty() {
                return;
            }
            std::mem::take(&mut *batch)
        };
        let attempted = rows.len();
        match self.store.insert_orderbook_snapshots(&rows) {
            Ok(outcome) => {
                self.stats.inserts.fetch_add(outcome.inserted as u64, Ordering::Relaxed);
                self.stats.duplicates.fetch_add(outcome.duplicates as u64, Ordering::Relaxed);
                self.stats.flushes.fetch_add(1, Ordering::Relaxed);
                debug!(attempted, inserted = outcome.inserted, "snapshot batch flushed");
            }
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                error!(attempted, error = %e, "snapshot batch insert failed, discarding batch");
            }
        }
    }
}
