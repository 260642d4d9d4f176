// @generated manually to match the four record-class tables in the
// specification's data model; kept hand-written (no `diesel print-schema`
// step) since this crate has no live database in CI.

diesel::table! {
    trades (trade_id) {
        trade_id -> Text,
        exchange_ts -> BigInt,
        received_at -> BigInt,
        ticker -> Text,
        price -> BigInt,
        size -> BigInt,
        taker_side_yes -> Bool,
        sid -> BigInt,
    }
}

diesel::table! {
    orderbook_deltas (ticker, exchange_ts, price, side_yes) {
        ticker -> Text,
        exchange_ts -> BigInt,
        received_at -> BigInt,
        seq -> BigInt,
        side_yes -> Bool,
        price -> BigInt,
        size_delta -> BigInt,
        sid -> BigInt,
        seq_gap -> Bool,
        gap_size -> BigInt,
    }
}

diesel::table! {
    orderbook_snapshots (ticker, snapshot_ts, source) {
        ticker -> Text,
        snapshot_ts -> BigInt,
        exchange_ts -> BigInt,
        source -> Text,
        yes_bids -> Jsonb,
        yes_asks -> Jsonb,
        no_bids -> Jsonb,
        no_asks -> Jsonb,
        best_yes_bid -> BigInt,
        best_yes_ask -> BigInt,
        spread -> BigInt,
        sid -> Nullable<BigInt>,
    }
}

diesel::table! {
    tickers (ticker, exchange_ts) {
        ticker -> Text,
        exchange_ts -> BigInt,
        received_at -> BigInt,
        yes_bid -> BigInt,
        yes_ask -> BigInt,
        last_price -> BigInt,
        volume -> BigInt,
        open_interest -> BigInt,
        dollar_volume -> BigInt,
        dollar_open_interest -> BigInt,
        sid -> BigInt,
    }
}

diesel::allow_tables_to_appear_in_same_query!(trades, orderbook_deltas, orderbook_snapshots, tickers,);
