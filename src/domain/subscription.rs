//! Subscription identity and the streaming channels a wire connection can
//! carry.

use serde::{Deserialize, Serialize};

/// Server-assigned subscription identifier.
pub type Sid = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Ticker,
    Trade,
    MarketLifecycle,
    OrderbookDelta,
}

impl Channel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ticker => "ticker",
            Self::Trade => "trade",
            Self::MarketLifecycle => "market_lifecycle",
            Self::OrderbookDelta => "orderbook_delta",
        }
    }
}

/// One active stream of a channel type on a connection, optionally bound to
/// a ticker (global channels leave this empty).
#[derive(Debug, Clone)]
pub struct Subscription {
    pub sid: Sid,
    pub channel: Channel,
    pub connection_id: u32,
    pub ticker: Option<String>,
    pub last_seq: Option<i64>,
}

impl Subscription {
    #[must_use]
    pub const fn new(sid: Sid, channel: Channel, connection_id: u32, ticker: Option<String>) -> Self {
        Self {
            sid,
            channel,
            connection_id,
            ticker,
            last_seq: None,
        }
    }
}
