//! Insertable row types, one per record class, converting from the domain
//! shape into the column layout in `schema`.

use diesel::prelude::*;
use serde_json::Value as Json;

use crate::domain::{OrderbookDelta, OrderbookSnapshot, PriceLevel, Trade, TickerQuote};

use super::schema::{orderbook_deltas, orderbook_snapshots, tickers, trades};

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = trades)]
pub struct TradeRow {
    pub trade_id: String,
    pub exchange_ts: i64,
    pub received_at: i64,
    pub ticker: String,
    pub price: i64,
    pub size: i64,
    pub taker_side_yes: bool,
    pub sid: i64,
}

impl From<Trade> for TradeRow {
    fn from(t: Trade) -> Self {
        Self {
            trade_id: t.trade_id,
            exchange_ts: t.exchange_ts,
            received_at: t.received_at,
            ticker: t.ticker,
            price: t.price,
            size: t.size,
            taker_side_yes: t.taker_side_yes,
            sid: t.sid,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = orderbook_deltas)]
pub struct OrderbookDeltaRow {
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

impl From<OrderbookDelta> for OrderbookDeltaRow {
    fn from(d: OrderbookDelta) -> Self {
        Self {
            ticker: d.ticker,
            exchange_ts: d.exchange_ts,
            received_at: d.received_at,
            seq: d.seq,
            side_yes: d.side_yes,
            price: d.price,
            size_delta: d.size_delta,
            sid: d.sid,
            seq_gap: d.seq_gap,
            gap_size: d.gap_size,
        }
    }
}

fn levels_to_json(levels: &[PriceLevel]) -> Json {
    serde_json::to_value(
        levels
            .iter()
            .map(|l| serde_json::json!({"price": l.price, "quantity": l.quantity}))
            .collect::<Vec<_>>(),
    )
    .unwrap_or_else(|_| Json::Array(Vec::new()))
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = orderbook_snapshots)]
pub struct OrderbookSnapshotRow {
    pub ticker: String,
    pub snapshot_ts: i64,
    pub exchange_ts: i64,
    pub source: String,
    pub yes_bids: Json,
    pub yes_asks: Json,
    pub no_bids: Json,
    pub no_asks: Json,
    pub best_yes_bid: i64,
    pub best_yes_ask: i64,
    pub spread: i64,
    pub sid: Option<i64>,
}

impl From<OrderbookSnapshot> for OrderbookSnapshotRow {
    fn from(s: OrderbookSnapshot) -> Self {
        Self {
            ticker: s.ticker,
            snapshot_ts: s.snapshot_ts,
            exchange_ts: s.exchange_ts,
            source: s.source.as_str().to_string(),
            yes_bids: levels_to_json(&s.yes_bids),
            yes_asks: levels_to_json(&s.yes_asks),
            no_bids: levels_to_json(&s.no_bids),
            no_asks: levels_to_json(&s.no_asks),
            best_yes_bid: s.best_yes_bid,
            best_yes_ask: s.best_yes_ask,
            spread: s.spread,
            sid: s.sid,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = tickers)]
pub struct TickerRow {
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

impl From<TickerQuote> for TickerRow {
    fn from(q: TickerQuote) -> Self {
        Self {
            ticker: q.ticker,
            exchange_ts: q.exchange_ts,
            received_at: q.received_at,
            yes_bid: q.yes_bid,
            yes_ask: q.yes_ask,
            last_price: q.last_price,
            volume: q.volume,
            open_interest: q.open_interest,
            dollar_volume: q.dollar_volume,
            dollar_open_interest: q.dollar_open_interest,
            sid: q.sid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SnapshotSource;

    #[test]
    fn trade_row_converts_fields_verbatim() {
        let trade = Trade {
            trade_id: "t1".into(),
            exchange_ts: 1,
            received_at: 2,
            ticker: "T".into(),
            price: 52_000,
            size: 10,
            taker_side_yes: true,
            sid: 3,
        };
        let row: TradeRow = trade.into();
        assert_eq!(row.trade_id, "t1");
        assert_eq!(row.price, 52_000);
    }

    #[test]
    fn snapshot_row_serializes_levels_as_json_arrays() {
        let snapshot = OrderbookSnapshot {
            ticker: "T".into(),
            snapshot_ts: 1,
            exchange_ts: 1,
            source: SnapshotSource::Ws,
            yes_bids: vec![PriceLevel { price: 52_000, quantity: 10 }],
            yes_asks: vec![],
            no_bids: vec![],
            no_asks: vec![],
            best_yes_bid: 52_000,
            best_yes_ask: 0,
            spread: 0,
            sid: Some(5),
        };
        let row: OrderbookSnapshotRow = snapshot.into();
        assert_eq!(row.yes_bids[0]["price"], 52_000);
        assert_eq!(row.source, "ws");
    }
}
