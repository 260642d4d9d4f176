//! Least-loaded ticker-to-connection assignment for the orderbook role
//! (connection ids 7..=150).

use dashmap::DashMap;

pub const ORDERBOOK_CONN_RANGE: std::ops::RangeInclusive<u32> = 7..=150;

/// Tracks which orderbook connection owns each ticker's subscription, and
/// how many tickers each orderbook connection currently carries.
pub struct AssignmentTable {
    ticker_to_conn: DashMap<String, u32>,
    load: DashMap<u32, usize>,
}

impl Default for AssignmentTable {
    fn default() -> Self {
        let load = DashMap::new();
        for conn_id in ORDERBOOK_CONN_RANGE {
            load.insert(conn_id, 0);
        }
        Self {
            ticker_to_conn: DashMap::new(),
            load,
        }
    }
}

impl AssignmentTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Picks the healthy orderbook connection with the fewest assigned
    /// tickers, tie-broken by lowest connection id.
    #[must_use]
    pub fn pick_least_loaded(&self, healthy: &dyn Fn(u32) -> bool) -> Option<u32> {
        let mut best: Option<(u32, usize)> = None;
        for conn_id in ORDERBOOK_CONN_RANGE {
            if !healthy(conn_id) {
                continue;
            }
            let count = self.load.get(&conn_id).map_or(0, |v| *v);
            best = match best {
                None => Some((conn_id, count)),
                Some((_, best_count)) if count < best_count => Some((conn_id, count)),
                Some(existing) => Some(existing),
            };
        }
        best.map(|(conn_id, _)| conn_id)
    }

    /// Records a new assignment, bumping that connection's load.
    pub fn assign(&self, ticker: &str, conn_id: u32) {
        self.ticker_to_conn.insert(ticker.to_string(), conn_id);
        *self.load.entry(conn_id).or_insert(0) += 1;
    }

    /// Removes an assignment (on `inactive`/`settled`), decrementing load.
    pub fn unassign(&self, ticker: &str) -> Option<u32> {
        let (_, conn_id) = self.ticker_to_conn.remove(ticker)?;
        if let Some(mut count) = self.load.get_mut(&conn_id) {
            *count = count.saturating_sub(1);
        }
        Some(conn_id)
    }

    #[must_use]
    pub fn conn_for(&self, ticker: &str) -> Option<u32> {
        self.ticker_to_conn.get(ticker).map(|v| *v)
    }

    #[must_use]
    pub fn is_assigned(&self, ticker: &str) -> bool {
        self.ticker_to_conn.contains_key(ticker)
    }

    /// All tickers currently assigned to one connection, used to re-subscribe
    /// after that connection reconnects.
    #[must_use]
    pub fn tickers_for_conn(&self, conn_id: u32) -> Vec<String> {
        self.ticker_to_conn
            .iter()
            .filter(|entry| *entry.value() == conn_id)
            .map(|entry| entry.key().clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_the_lowest_loaded_connection() {
        let table = AssignmentTable::new();
        table.assign("A", 7);
        table.assign("B", 7);
        table.assign("C", 8);
        let picked = table.pick_least_loaded(&|_| true).unwrap();
        assert_eq!(picked, 9);
    }

    #[test]
    fn ties_break_on_lowest_connection_id() {
        let table = AssignmentTable::new();
        let picked = table.pick_least_loaded(&|_| true).unwrap();
        assert_eq!(picked, 7);
    }

    #[test]
    fn unhealthy_connections_are_skipped() {
        let table = AssignmentTable::new();
        let picked = table.pick_least_loaded(&|id| id != 7).unwrap();
        assert_eq!(picked, 8);
    }

    #[test]
    fn unassign_decrements_load_and_frees_the_ticker() {
        let table = AssignmentTable::new();
        table.assign("A", 7);
        assert_eq!(table.unassign("A"), Some(7));
        assert!(!table.is_assigned("A"));
        table.assign("B", 7);
        assert_eq!(table.conn_for("B"), Some(7));
    }

    #[test]
    fn tickers_for_conn_lists_all_assignments() {
        let table = AssignmentTable::new();
        table.assign("A", 7);
        table.assign("B", 7);
        table.assign("C", 8);
        let mut tickers = table.tickers_for_conn(7);
        tickers.sort();
        assert_eq!(tickers, vec!["A".to_string(), "B".to_string()]);
    }
}
