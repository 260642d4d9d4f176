//! The four record classes that flow from the wire to the time-series
//! store, in their canonical (already-transformed) storage shape.

use serde::{Deserialize, Serialize};

/// A single `(price, quantity)` level in a stored orderbook snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotSource {
    Ws,
    Rest,
}

impl SnapshotSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ws => "ws",
            Self::Rest => "rest",
        }
    }
}

/// Primary key: `(ticker, exchange_ts, price, side)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderbookDelta {
    pub ticker: String,
    pub exchange_ts: i64,
    pub received_at: i64,
    pub seq: i64,
    pub side_yes: bool,
    pub price: i64,
    pub size_delta: i64,
    pub sid: i64,
    pub seq_gap: bool,
    pub gap_size: i64,
}

/// Primary key: `(ticker, snapshot_ts, source)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderbookSnapshot {
    pub ticker: String,
    pub snapshot_ts: i64,
    pub exchange_ts: i64,
    pub source: SnapshotSource,
    pub yes_bids: Vec<PriceLevel>,
    pub yes_asks: Vec<PriceLevel>,
    pub no_bids: Vec<PriceLevel>,
    pub no_asks: Vec<PriceLevel>,
    pub best_yes_bid: i64,
    pub best_yes_ask: i64,
    pub spread: i64,
    pub sid: Option<i64>,
}

/// Primary key: `trade_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trade {
    pub trade_id: String,
    pub exchange_ts: i64,
    pub received_at: i64,
    pub ticker: String,
    pub price: i64,
    pub size: i64,
    pub taker_side_yes: bool,
    pub sid: i64,
}

/// Primary key: `(ticker, exchange_ts)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerQuote {
    pub ticker: String,
    pub exchange_ts: i64,
    pub received_at: i64,
    pub yes_bid: i64,
    pub yes_ask: i64,
    pub last_price: i64,
    pub volume: i64,
    pub open_interest: i64,
    pub dollar_volume: i64,
    pub dollar_open_interest: i64,
    pub sid: i64,
}

/// Derives the ask levels for one side by mirroring the opposite side's bid
/// prices (`100000 - price`), preserving quantity.
///
/// `derive_asks(derive_asks(bids)) == bids` in the price field, since
/// mirroring is involutive.
#[must_use]
pub fn derive_asks(opposite_bids: &[PriceLevel]) -> Vec<PriceLevel> {
    opposite_bids
        .iter()
        .map(|level| PriceLevel {
            price: crate::domain::mirror(level.price),
            quantity: level.quantity,
        })
        .collect()
}

/// Computes `(best_yes_bid, best_yes_ask, spread)` from the first (best)
/// level of each side. Empty arrays on either side yield all-zero output.
#[must_use]
pub fn best_and_spread(yes_bids: &[PriceLevel], no_bids: &[PriceLevel]) -> (i64, i64, i64) {
    let best_yes_bid = yes_bids.first().map_or(0, |l| l.price);
    let best_yes_ask = no_bids
        .first()
        .map_or(0, |l| crate::domain::mirror(l.price));
    if yes_bids.is_empty() || no_bids.is_empty() {
        return (best_yes_bid, best_yes_ask, 0);
    }
    (best_yes_bid, best_yes_ask, best_yes_ask - best_yes_bid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels(pairs: &[(i64, i64)]) -> Vec<PriceLevel> {
        pairs
            .iter()
            .map(|&(price, quantity)| PriceLevel { price, quantity })
            .collect()
    }

    #[test]
    fn derive_asks_mirrors_price_preserves_quantity() {
        let no_bids = levels(&[(48_000, 150), (47_000, 250)]);
        let yes_asks = derive_asks(&no_bids);
        assert_eq!(yes_asks, levels(&[(52_000, 150), (53_000, 250)]));
    }

    #[test]
    fn derive_asks_is_involutive_on_price() {
        let bids = levels(&[(52_000, 100), (51_000, 200)]);
        let once = derive_asks(&bids);
        let twice = derive_asks(&once);
        let prices: Vec<i64> = twice.iter().map(|l| l.price).collect();
        let original_prices: Vec<i64> = bids.iter().map(|l| l.price).collect();
        assert_eq!(prices, original_prices);
    }

    #[test]
    fn best_and_spread_literal_scenario() {
        // End-to-end scenario 4 from the specification.
        let yes_bids = levels(&[(52_000, 100), (51_000, 200)]);
        let no_bids = levels(&[(48_000, 150), (47_000, 250)]);
        let (best_bid, best_ask, spread) = best_and_spread(&yes_bids, &no_bids);
        assert_eq!(best_bid, 52_000);
        assert_eq!(best_ask, 52_000);
        assert_eq!(spread, 0);
    }

    #[test]
    fn empty_levels_yield_zero() {
        assert_eq!(best_and_spread(&[], &[]), (0, 0, 0));
        assert_eq!(best_and_spread(&levels(&[(52_000, 1)]), &[]), (52_000, 0, 0));
    }
}
