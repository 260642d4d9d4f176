//! The four Writers: per-class batched, idempotent appenders that drain the
//! Router's growable queues and flush transformed rows to the store.

mod orderbook;
mod ticker;
mod trade;
pub mod transform;

use std::sync::atomic::AtomicU64;
use std::sync::Arc;

pub use orderbook::OrderbookWriter;
pub use ticker::TickerWriter;
pub use trade::TradeWriter;

use crate::config::WritersConfig;
use crate::router::Router;
use crate::storage::Store;

/// Common counters every writer exposes; `sequence_gaps` stays zero for the
/// trade and ticker writers (only the orderbook writer observes gap flags).
#[derive(Debug, Default)]
pub struct WriterStats {
    pub inserts: AtomicU64,
    pub duplicates: AtomicU64,
    pub errors: AtomicU64,
    pub flushes: AtomicU64,
    pub sequence_gaps: AtomicU64,
}

/// Owns the three writer instances (trade, orderbook, ticker) and starts
/// them against the Router's three queues.
pub struct Writers {
    pub trade: Arc<TradeWriter>,
    pub orderbook: Arc<OrderbookWriter>,
    pub ticker: Arc<TickerWriter>,
}

impl Writers {
    #[must_use]
    pub fn new(router: &Router, store: Store, config: WritersConfig) -> Self {
        Self {
            trade: Arc::new(TradeWriter::new(router.trade_queue(), store.clone(), config.clone())),
            orderbook: Arc::new(OrderbookWriter::new(router.orderbook_queue(), store.clone(), config.clone())),
            ticker: Arc::new(TickerWriter::new(router.ticker_queue(), store, config)),
        }
    }

    pub fn start(&self) {
        self.trade.start();
        self.orderbook.start();
        self.ticker.start();
    }

    /// Cancels all three writers and performs each one's final flush.
    pub async fn stop(&self) {
        self.trade.stop().await;
        self.orderbook.stop().await;
        self.ticker.stop().await;
    }
}
