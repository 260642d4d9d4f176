//! The time-series store: a thin Diesel/Postgres wrapper doing idempotent,
//! multi-row `INSERT ... ON CONFLICT DO NOTHING` per record class. No
//! updates, no deletes — matching the specification's external-interface
//! contract for the downstream store.

pub mod model;
pub mod pool;
pub mod schema;

use diesel::prelude::*;

pub use model::{OrderbookDeltaRow, OrderbookSnapshotRow, TickerRow, TradeRow};
pub use pool::{create_pool, run_migrations, DbPool, MIGRATIONS};

use crate::error::Result;

/// Outcome of one idempotent batch insert: rows actually written versus
/// rows that hit a conflicting key and were silently skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertOutcome {
    pub inserted: usize,
    pub duplicates: usize,
}

impl InsertOutcome {
    fn from_attempted(attempted: usize, written: usize) -> Self {
        Self {
            inserted: written,
            duplicates: attempted - written,
        }
    }
}

/// Owns the connection pool; cloned cheaply (the pool is internally
/// `Arc`-backed) and shared across all four Writers.
#[derive(Clone)]
pub struct Store {
    pool: DbPool,
}

impl Store {
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn insert_trades(&self, rows: &[TradeRow]) -> Result<InsertOutcome> {
        use schema::trades::dsl;
        if rows.is_empty() {
            return Ok(InsertOutcome::default());
        }
        let mut conn = self.pool.get()?;
        let written = diesel::insert_into(dsl::trades)
            .values(rows)
            .on_conflict(dsl::trade_id)
            .do_nothing()
            .execute(&mut conn)?;
        Ok(InsertOutcome::from_attempted(rows.len(), written))
    }

    pub fn insert_orderbook_deltas(&self, rows: &[OrderbookDeltaRow]) -> Result<InsertOutcome> {
        use schema::orderbook_deltas::dsl;
        if rows.is_empty() {
            return Ok(InsertOutcome::default());
        }
        let mut conn = self.pool.get()?;
        let written = diesel::insert_into(dsl::orderbook_deltas)
            .values(rows)
            .on_conflict((dsl::ticker, dsl::exchange_ts, dsl::price, dsl::side_yes))
            .do_nothing()
            .execute(&mut conn)?;
        Ok(InsertOutcome::from_attempted(rows.len(), written))
    }

    pub fn insert_orderbook_snapshots(&self, rows: &[OrderbookSnapshotRow]) -> Result<InsertOutcome> {
        use schema::orderbook_snapshots::dsl;
        if rows.is_empty() {
            return Ok(InsertOutcome::default());
        }
        let mut conn = self.pool.get()?;
        let written = diesel::insert_into(dsl::orderbook_snapshots)
            .values(rows)
            .on_conflict((dsl::ticker, dsl::snapshot_ts, dsl::source))
            .do_nothing()
            .execute(&mut conn)?;
        Ok(InsertOutcome::from_attempted(rows.len(), written))
    }

    /// Single synchronous insert for the Snapshot Poller's REST-derived
    /// path, which writes one snapshot per ticker per poll rather than
    /// batching.
    pub fn insert_one_snapshot(&self, row: &OrderbookSnapshotRow) -> Result<InsertOutcome> {
        self.insert_orderbook_snapshots(std::slice::from_ref(row))
    }

    pub fn insert_tickers(&self, rows: &[TickerRow]) -> Result<InsertOutcome> {
        use schema::tickers::dsl;
        if rows.is_empty() {
            return Ok(InsertOutcome::default());
        }
        let mut conn = self.pool.get()?;
        let written = diesel::insert_into(dsl::tickers)
            .values(rows)
            .on_conflict((dsl::ticker, dsl::exchange_ts))
            .do_nothing()
            .execute(&mut conn)?;
        Ok(InsertOutcome::from_attempted(rows.len(), written))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_outcome_splits_attempted_into_inserted_and_duplicate() {
        let outcome = InsertOutcome::from_attempted(10, 7);
        assert_eq!(outcome.inserted, 7);
        assert_eq!(outcome.duplicates, 3);
    }

    #[test]
    fn empty_batch_is_a_no_op_outcome() {
        assert_eq!(InsertOutcome::default(), InsertOutcome { inserted: 0, duplicates: 0 });
    }
}
