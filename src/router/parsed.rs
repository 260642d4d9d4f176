//! Wire-shaped parsed payloads handed to Writers. Prices stay as decimal
//! strings here; the Router's job ends at typed dispatch, not numeric
//! conversion — that belongs with the Writers, which own the storage format.

use serde::Deserialize;

fn default_ts() -> f64 {
    0.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderbookDeltaMsg {
    pub market_ticker: String,
    #[serde(default = "default_ts")]
    pub ts: f64,
    #[serde(rename = "price_dollars")]
    pub price: String,
    pub side: String,
    pub delta: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderbookSnapshotMsg {
    pub market_ticker: String,
    #[serde(default = "default_ts")]
    pub ts: f64,
    #[serde(default)]
    pub yes_dollars: Vec<(String, i64)>,
    #[serde(default)]
    pub no_dollars: Vec<(String, i64)>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradeMsg {
    pub market_ticker: String,
    #[serde(default = "default_ts")]
    pub ts: f64,
    pub trade_id: String,
    pub yes_price: String,
    pub count: i64,
    pub taker_side: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TickerMsg {
    pub market_ticker: String,
    #[serde(default = "default_ts")]
    pub ts: f64,
    #[serde(default)]
    pub yes_bid: String,
    #[serde(default)]
    pub yes_ask: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub volume: i64,
    #[serde(default)]
    pub open_interest: i64,
    #[serde(default)]
    pub dollar_volume: i64,
    #[serde(default)]
    pub dollar_open_interest: i64,
}

/// One fully-parsed wire payload, still in wire (string-price) shape, tagged
/// with the envelope fields the Router passes through unconverted.
#[derive(Debug, Clone)]
pub enum RoutedMessage {
    OrderbookDelta {
        msg: OrderbookDeltaMsg,
        sid: i64,
        seq: i64,
        exchange_ts: i64,
        received_at: i64,
        seq_gap: bool,
        gap_size: i64,
    },
    OrderbookSnapshot {
        msg: OrderbookSnapshotMsg,
        sid: i64,
        seq: i64,
        exchange_ts: i64,
        received_at: i64,
        seq_gap: bool,
        gap_size: i64,
    },
    Trade {
        msg: TradeMsg,
        sid: i64,
        exchange_ts: i64,
        received_at: i64,
    },
    Ticker {
        msg: TickerMsg,
        sid: i64,
        exchange_ts: i64,
        received_at: i64,
    },
}
