//! Trade writer: one batch, deduped on `trade_id`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, error};

use super::transform::trade_to_record;
use super::WriterStats;
use crate::config::WritersConfig;
use crate::queue::GrowableQueue;
use crate::router::RoutedMessage;
use crate::storage::{Store, TradeRow};

pub struct TradeWriter {
    queue: GrowableQueue<RoutedMessage>,
    store: Store,
    config: WritersConfig,
    batch: Mutex<Vec<TradeRow>>,
    stats: Arc<WriterStats>,
    shutdown: Arc<AtomicBool>,
}

impl TradeWriter {
    #[must_use]
    pub fn new(queue: GrowableQueue<RoutedMessage>, store: Store, config: WritersConfig) -> Self {
        Self {
            queue,
            store,
            config,
            batch: Mutex::new(Vec::new()),
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
        self.flush();
    }

    async fn run_consumer(self: Arc<Self>) {
        loop {
            if self.shutdown.load(Ordering::Acquire) {
                break;
            }
            match self.queue.try_receive() {
                Some(RoutedMessage::Trade { msg, sid, exchange_ts, received_at }) => {
                    let record = trade_to_record(&msg, sid, exchange_ts, received_at);
                    let reached_batch_size = {
                        let mut batch = self.batch.lock();
                        batch.push(record.into());
                        batch.len() >= self.config.batch_size
                    };
                    if reached_batch_size {
                        self.flush();
                    }
                }
                Some(_) => {}
                None => {
                    if self.queue.is_closed() {
                        self.flush();
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
            self.flush();
        }
    }

    fn flush(&self) {
        let rows = {
            let mut batch = self.batch.lock();
            if batch.is_empty() {
                return;
            }
            std::mem::take(&mut *batch)
        };
        let attempted = rows.len();
        match self.store.insert_trades(&rows) {
            Ok(outcome) => {
                self.stats.inserts.fetch_add(outcome.inserted as u64, Ordering::Relaxed);
                self.stats.duplicates.fetch_add(outcome.duplicates as u64, Ordering::Relaxed);
                self.stats.flushes.fetch_add(1, Ordering::Relaxed);
                debug!(attempted, inserted = outcome.inserted, duplicates = outcome.duplicates, "trade batch flushed");
            }
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                error!(attempted, error = %e, "trade batch insert failed, discarding batch");
            }
        }
    }
}

