//! Wire-string-to-storage-encoding transforms shared by all four writers.

use crate::domain::{price_from_dollars, PriceLevel};
use crate::router::{OrderbookDeltaMsg, OrderbookSnapshotMsg, TickerMsg, TradeMsg};

/// `"yes"` maps to `true`; anything else (including absent/malformed input)
/// maps to `false`.
#[must_use]
pub fn side_to_bool(side: &str) -> bool {
    side == "yes"
}

#[must_use]
pub fn dollar_pairs_to_levels(pairs: &[(String, i64)]) -> Vec<PriceLevel> {
    pairs
        .iter()
        .map(|(price, quantity)| PriceLevel {
            price: price_from_dollars(price),
            quantity: *quantity,
        })
        .collect()
}

#[must_use]
pub fn delta_to_record(
    msg: &OrderbookDeltaMsg,
    sid: i64,
    seq: i64,
    exchange_ts: i64,
    received_at: i64,
    seq_gap: bool,
    gap_size: i64,
) -> crate::domain::OrderbookDelta {
    crate::domain::OrderbookDelta {
        ticker: msg.market_ticker.clone(),
        exchange_ts,
        received_at,
        seq,
        side_yes: side_to_bool(&msg.side),
        price: price_from_dollars(&msg.price),
        size_delta: msg.delta,
        sid,
        seq_gap,
        gap_size,
    }
}

#[must_use]
pub fn snapshot_to_record(
    msg: &OrderbookSnapshotMsg,
    sid: Option<i64>,
    exchange_ts: i64,
    snapshot_ts: i64,
    source: crate::domain::SnapshotSource,
) -> crate::domain::OrderbookSnapshot {
    let yes_bids = dollar_pairs_to_levels(&msg.yes_dollars);
    let no_bids = dollar_pairs_to_levels(&msg.no_dollars);
    let yes_asks = crate::domain::derive_asks(&no_bids);
    let no_asks = crate::domain::derive_asks(&yes_bids);
    let (best_yes_bid, best_yes_ask, spread) = crate::domain::best_and_spread(&yes_bids, &no_bids);
    crate::domain::OrderbookSnapshot {
        ticker: msg.market_ticker.clone(),
        snapshot_ts,
        exchange_ts,
        source,
        yes_bids,
        yes_asks,
        no_bids,
        no_asks,
        best_yes_bid,
        best_yes_ask,
        spread,
        sid,
    }
}

#[must_use]
pub fn trade_to_record(msg: &TradeMsg, sid: i64, exchange_ts: i64, received_at: i64) -> crate::domain::Trade {
    crate::domain::Trade {
        trade_id: msg.trade_id.clone(),
        exchange_ts,
        received_at,
        ticker: msg.market_ticker.clone(),
        price: price_from_dollars(&msg.yes_price),
        size: msg.count,
        taker_side_yes: side_to_bool(&msg.taker_side),
        sid,
    }
}

#[must_use]
pub fn ticker_to_record(msg: &TickerMsg, sid: i64, exchange_ts: i64, received_at: i64) -> crate::domain::TickerQuote {
    crate::domain::TickerQuote {
        ticker: msg.market_ticker.clone(),
        exchange_ts,
        received_at,
        yes_bid: price_from_dollars(&msg.yes_bid),
        yes_ask: price_from_dollars(&msg.yes_ask),
        last_price: price_from_dollars(&msg.price),
        volume: msg.volume,
        open_interest: msg.open_interest,
        dollar_volume: msg.dollar_volume,
        dollar_open_interest: msg.dollar_open_interest,
        sid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_to_bool_only_yes_is_true() {
        assert!(side_to_bool("yes"));
        assert!(!side_to_bool("no"));
        assert!(!side_to_bool(""));
        assert!(!side_to_bool("garbage"));
    }

    #[test]
    fn delta_to_record_converts_price_and_side() {
        let msg = OrderbookDeltaMsg {
            market_ticker: "T".into(),
            ts: 1.0,
            price: "0.52".into(),
            side: "yes".into(),
            delta: 10,
        };
        let record = delta_to_record(&msg, 1, 2, 1_000_000, 1_500, false, 0);
        assert_eq!(record.price, 52_000);
        assert!(record.side_yes);
        assert_eq!(record.exchange_ts, 1_000_000);
    }

    #[test]
    fn snapshot_to_record_derives_asks_and_best_prices() {
        let msg = OrderbookSnapshotMsg {
            market_ticker: "T".into(),
            ts: 1.0,
            yes_dollars: vec![("0.52".into(), 100), ("0.51".into(), 200)],
            no_dollars: vec![("0.48".into(), 150), ("0.47".into(), 250)],
        };
        let record = snapshot_to_record(&msg, Some(9), 1_000_000, 2_000_000, crate::domain::SnapshotSource::Ws);
        assert_eq!(record.best_yes_bid, 52_000);
        assert_eq!(record.best_yes_ask, 52_000);
        assert_eq!(record.spread, 0);
        assert_eq!(record.yes_asks[0].price, 52_000);
        assert_eq!(record.no_asks[0].price, 48_000);
    }

    #[test]
    fn trade_to_record_maps_taker_side() {
        let msg = TradeMsg {
            market_ticker: "T".into(),
            ts: 1.0,
            trade_id: "t1".into(),
            yes_price: "0.52".into(),
            count: 5,
            taker_side: "no".into(),
        };
        let record = trade_to_record(&msg, 4, 1_000_000, 1_500);
        assert_eq!(record.trade_id, "t1");
        assert!(!record.taker_side_yes);
        assert_eq!(record.price, 52_000);
    }
}
