//! The Message Router: demultiplexes raw frames into typed, back-pressure-
//! resilient growable queues per record class. One task, no blocking.

mod parsed;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

pub use parsed::{OrderbookDeltaMsg, OrderbookSnapshotMsg, RoutedMessage, TickerMsg, TradeMsg};

use crate::config::RouterConfig;
use crate::connmgr::DataFrame;
use crate::queue::GrowableQueue;
use crate::wire::Envelope;

#[derive(Debug, Default)]
pub struct RouterStats {
    pub orderbook_enqueued: AtomicU64,
    pub trade_enqueued: AtomicU64,
    pub ticker_enqueued: AtomicU64,
    pub unknown_message: AtomicU64,
    pub parse_failures: AtomicU64,
}

/// Converts a wire `ts` (Unix seconds, possibly fractional) into canonical
/// microseconds.
fn ts_to_micros(ts: f64) -> i64 {
    (ts * 1_000_000.0).round() as i64
}

pub struct Router {
    orderbook: GrowableQueue<RoutedMessage>,
    trade: GrowableQueue<RoutedMessage>,
    ticker: GrowableQueue<RoutedMessage>,
    stats: Arc<RouterStats>,
    shutdown: Arc<std::sync::atomic::AtomicBool>,
}

impl Router {
    #[must_use]
    pub fn new(config: &RouterConfig) -> Self {
        Self {
            orderbook: GrowableQueue::new(config.orderbook_buffer_size),
            trade: GrowableQueue::new(config.trade_buffer_size),
            ticker: GrowableQueue::new(config.ticker_buffer_size),
            stats: Arc::new(RouterStats::default()),
            shutdown: Arc::new(std::sync::atomic::AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn stats(&self) -> Arc<RouterStats> {
        self.stats.clone()
    }

    #[must_use]
    pub fn orderbook_queue(&self) -> GrowableQueue<RoutedMessage> {
        self.orderbook.clone()
    }

    #[must_use]
    pub fn trade_queue(&self) -> GrowableQueue<RoutedMessage> {
        self.trade.clone()
    }

    #[must_use]
    pub fn ticker_queue(&self) -> GrowableQueue<RoutedMessage> {
        self.ticker.clone()
    }

    /// Spawns the single routing task, consuming from the Connection
    /// Manager's data-frame stream until it closes or `stop` is called.
    pub fn start(self: &Arc<Self>, mut frames: mpsc::UnboundedReceiver<DataFrame>) {
        let this = self.clone();
        tokio::spawn(async move {
            while let Some(frame) = frames.recv().await {
                if this.shutdown.load(Ordering::Acquire) {
                    break;
                }
                this.route_frame(frame);
            }
        });
    }

    /// Cancels routing and closes all three queues so Writers observe EOF
    /// once their tails are drained.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.orderbook.close();
        self.trade.close();
        self.ticker.close();
    }

    fn route_frame(&self, frame: DataFrame) {
        let envelope: Envelope = match serde_json::from_str(&frame.bytes) {
            Ok(e) => e,
            Err(e) => {
                self.stats.parse_failures.fetch_add(1, Ordering::Relaxed);
                debug!(error = %e, "router: unparseable envelope, dropped");
                return;
            }
        };

        match envelope.kind.as_str() {
            "orderbook_delta" => self.dispatch_delta(envelope, &frame),
            "orderbook_snapshot" => self.dispatch_snapshot(envelope, &frame),
            "trade" => self.dispatch_trade(envelope, &frame),
            "ticker" => self.dispatch_ticker(envelope, &frame),
            "subscribed" | "unsubscribed" | "error" => {}
            other => {
                self.stats.unknown_message.fetch_add(1, Ordering::Relaxed);
                warn!(kind = other, "router: unknown message type");
            }
        }
    }

    fn dispatch_delta(&self, envelope: Envelope, frame: &DataFrame) {
        let msg: OrderbookDeltaMsg = match serde_json::from_value(envelope.msg) {
            Ok(m) => m,
            Err(e) => return self.parse_failed(e),
        };
        let exchange_ts = ts_to_micros(msg.ts);
        let routed = RoutedMessage::OrderbookDelta {
            msg,
            sid: envelope.sid.unwrap_or_default(),
            seq: envelope.seq.unwrap_or_default(),
            exchange_ts,
            received_at: frame.received_at,
            seq_gap: frame.seq_gap,
            gap_size: frame.gap_size,
        };
        if self.orderbook.send(routed) {
            self.stats.orderbook_enqueued.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn dispatch_snapshot(&self, envelope: Envelope, frame: &DataFrame) {
        let msg: OrderbookSnapshotMsg = match serde_json::from_value(envelope.msg) {
            Ok(m) => m,
            Err(e) => return self.parse_failed(e),
        };
        let exchange_ts = ts_to_micros(msg.ts);
        let routed = RoutedMessage::OrderbookSnapshot {
            msg,
            sid: envelope.sid.unwrap_or_default(),
            seq: envelope.seq.unwrap_or_default(),
            exchange_ts,
            received_at: frame.received_at,
            seq_gap: frame.seq_gap,
            gap_size: frame.gap_size,
        };
        if self.orderbook.send(routed) {
            self.stats.orderbook_enqueued.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn dispatch_trade(&self, envelope: Envelope, frame: &DataFrame) {
        let msg: TradeMsg = match serde_json::from_value(envelope.msg) {
            Ok(m) => m,
            Err(e) => return self.parse_failed(e),
        };
        let exchange_ts = ts_to_micros(msg.ts);
        let routed = RoutedMessage::Trade {
            msg,
            sid: envelope.sid.unwrap_or_default(),
            exchange_ts,
            received_at: frame.received_at,
        };
        if self.trade.send(routed) {
            self.stats.trade_enqueued.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn dispatch_ticker(&self, envelope: Envelope, frame: &DataFrame) {
        let msg: TickerMsg = match serde_json::from_value(envelope.msg) {
            Ok(m) => m,
            Err(e) => return self.parse_failed(e),
        };
        let exchange_ts = ts_to_micros(msg.ts);
        let routed = RoutedMessage::Ticker {
            msg,
            sid: envelope.sid.unwrap_or_default(),
            exchange_ts,
            received_at: frame.received_at,
        };
        if self.ticker.send(routed) {
            self.stats.ticker_enqueued.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn parse_failed(&self, e: serde_json::Error) {
        self.stats.parse_failures.fetch_add(1, Ordering::Relaxed);
        debug!(error = %e, "router: malformed message body, dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(bytes: &str) -> DataFrame {
        DataFrame {
            bytes: bytes.to_string(),
            connection_id: 7,
            received_at: 1_000,
            seq_gap: false,
            gap_size: 0,
        }
    }

    fn router() -> Arc<Router> {
        Arc::new(Router::new(&RouterConfig::default()))
    }

    #[test]
    fn routes_orderbook_delta_to_orderbook_queue() {
        let r = router();
        r.route_frame(frame(
            r#"{"type":"orderbook_delta","sid":1,"seq":1,"msg":{"market_ticker":"T","ts":1.0,"price_dollars":"0.52","side":"yes","delta":10}}"#,
        ));
        assert_eq!(r.stats.orderbook_enqueued.load(Ordering::Relaxed), 1);
        assert!(r.orderbook.try_receive().is_some());
    }

    #[test]
    fn routes_orderbook_snapshot_to_orderbook_queue() {
        let r = router();
        r.route_frame(frame(
            r#"{"type":"orderbook_snapshot","sid":1,"msg":{"market_ticker":"T","ts":1.0,"yes_dollars":[["0.52",10]],"no_dollars":[]}}"#,
        ));
        assert_eq!(r.stats.orderbook_enqueued.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn routes_trade_to_trade_queue() {
        let r = router();
        r.route_frame(frame(
            r#"{"type":"trade","sid":3,"msg":{"market_ticker":"T","ts":1.0,"trade_id":"t1","yes_price":"0.52","count":5,"taker_side":"yes"}}"#,
        ));
        assert_eq!(r.stats.trade_enqueued.load(Ordering::Relaxed), 1);
        assert!(r.trade.try_receive().is_some());
    }

    #[test]
    fn routes_ticker_to_ticker_queue() {
        let r = router();
        r.route_frame(frame(
            r#"{"type":"ticker","sid":1,"msg":{"market_ticker":"T","ts":1.0,"yes_bid":"0.50","yes_ask":"0.52"}}"#,
        ));
        assert_eq!(r.stats.ticker_enqueued.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn ignores_command_response_types() {
        let r = router();
        r.route_frame(frame(r#"{"type":"subscribed","id":1,"msg":{"sid":1,"channel":"trade"}}"#));
        r.route_frame(frame(r#"{"type":"error","id":2,"msg":{"code":"x","message":"y"}}"#));
        assert_eq!(r.stats.unknown_message.load(Ordering::Relaxed), 0);
        assert_eq!(r.stats.parse_failures.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn unknown_type_increments_counter() {
        let r = router();
        r.route_frame(frame(r#"{"type":"fill","msg":{}}"#));
        assert_eq!(r.stats.unknown_message.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn malformed_body_counts_parse_failure_and_drops() {
        let r = router();
        r.route_frame(frame(r#"{"type":"trade","sid":1,"msg":{"market_ticker":"T"}}"#));
        assert_eq!(r.stats.parse_failures.load(Ordering::Relaxed), 1);
        assert_eq!(r.stats.trade_enqueued.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn unparseable_envelope_counts_parse_failure() {
        let r = router();
        r.route_frame(frame("not json"));
        assert_eq!(r.stats.parse_failures.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn ts_conversion_matches_seconds_to_micros() {
        assert_eq!(ts_to_micros(1.5), 1_500_000);
        assert_eq!(ts_to_micros(0.0), 0);
    }
}
