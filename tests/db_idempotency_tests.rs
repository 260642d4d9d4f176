//! Exercises the idempotent-insert contract against a real Postgres
//! instance. Gated behind the `integration-tests` feature since it needs a
//! reachable `DATABASE_URL` with the embedded migrations applied — not run
//! by the default test suite.
//!
//! Run with:
//! ```sh
//! DATABASE_URL=postgres://localhost/gatherer_test \
//!     cargo test --features integration-tests --test db_idempotency_tests
//! ```
#![cfg(feature = "integration-tests")]

use gatherer::storage::{Store, TradeRow};

fn store() -> Store {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");
    let pool = gatherer::storage::create_pool(&database_url, 4).expect("create pool");
    gatherer::storage::run_migrations(&pool).expect("run migrations");
    Store::new(pool)
}

fn trade(trade_id: &str) -> TradeRow {
    TradeRow {
        trade_id: trade_id.to_string(),
        exchange_ts: 1_000,
        received_at: 1_001,
        ticker: "T-IDEMPOTENT".to_string(),
        price: 52_000,
        size: 10,
        taker_side_yes: true,
        sid: 1,
    }
}

#[test]
fn duplicate_trade_id_is_silently_skipped() {
    let store = store();
    let first = store.insert_trades(&[trade("dup-1")]).expect("first insert");
    assert_eq!(first.inserted, 1);
    assert_eq!(first.duplicates, 0);

    let second = store.insert_trades(&[trade("dup-1")]).expect("second insert");
    assert_eq!(second.inserted, 0);
    assert_eq!(second.duplicates, 1);
}

#[test]
fn mixed_batch_counts_new_and_duplicate_rows_separately() {
    let store = store();
    store.insert_trades(&[trade("dup-2")]).expect("seed");

    let outcome = store
        .insert_trades(&[trade("dup-2"), trade("dup-3")])
        .expect("mixed insert");
    assert_eq!(outcome.inserted, 1);
    assert_eq!(outcome.duplicates, 1);
}
