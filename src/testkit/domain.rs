//! Builders for domain primitives and wire-frame JSON used across tests.

use crate::domain::{Instrument, InstrumentType, Status};

/// Builds an `Instrument` with the given ticker and status; every other
/// field gets an innocuous placeholder.
#[must_use]
pub fn instrument(ticker: &str, status: Status) -> Instrument {
    Instrument {
        ticker: ticker.to_string(),
        event_ticker: format!("{ticker}-EVT"),
        title: ticker.to_string(),
        instrument_type: InstrumentType::Binary,
        status,
        open_ts: 0,
        close_ts: 0,
        expiration_ts: 0,
        updated_at: 0,
        result: None,
    }
}

/// Builds a streaming envelope frame: `{"type":..,"sid":..,"seq":..,"msg":..}`,
/// omitting `sid`/`seq` when `None` to match the wire contract for command
/// responses and lifecycle frames.
#[must_use]
pub fn envelope_json(kind: &str, sid: Option<i64>, seq: Option<i64>, msg: serde_json::Value) -> String {
    let mut obj = serde_json::json!({ "type": kind, "msg": msg });
    if let Some(sid) = sid {
        obj["sid"] = serde_json::json!(sid);
    }
    if let Some(seq) = seq {
        obj["seq"] = serde_json::json!(seq);
    }
    obj.to_string()
}

/// A minimal `orderbook_delta` frame body.
#[must_use]
pub fn delta_msg(ticker: &str, ts: f64, price: &str, side: &str, delta: i64) -> serde_json::Value {
    serde_json::json!({
        "market_ticker": ticker,
        "ts": ts,
        "price_dollars": price,
        "side": side,
        "delta": delta,
    })
}

/// A minimal `trade` frame body.
#[must_use]
pub fn trade_msg(ticker: &str, ts: f64, trade_id: &str, yes_price: &str, count: i64, taker_side: &str) -> serde_json::Value {
    serde_json::json!({
        "market_ticker": ticker,
        "ts": ts,
        "trade_id": trade_id,
        "yes_price": yes_price,
        "count": count,
        "taker_side": taker_side,
    })
}
