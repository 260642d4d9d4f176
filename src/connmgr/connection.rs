//! Per-connection state: role, assigned tickers, and the wire client it
//! wraps.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::wire::WireClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Ticker,
    Trade,
    Lifecycle,
    Orderbook,
}

impl Role {
    #[must_use]
    pub const fn for_connection(conn_id: u32) -> Self {
        match conn_id {
            1..=2 => Self::Ticker,
            3..=4 => Self::Trade,
            5..=6 => Self::Lifecycle,
            _ => Self::Orderbook,
        }
    }

    #[must_use]
    pub const fn global_channel(self) -> Option<&'static str> {
        match self {
            Self::Ticker => Some("ticker"),
            Self::Trade => Some("trade"),
            Self::Lifecycle => Some("market_lifecycle"),
            Self::Orderbook => None,
        }
    }
}

/// One entry in the fixed 150-connection allocation table.
pub struct ManagedConnection {
    pub id: u32,
    pub role: Role,
    pub client: Arc<WireClient>,
    pub correlator: super::correlation::Correlator,
    /// `sid` of this connection's own global subscription (roles 1–6 only;
    /// orderbook connections hold one `sid` per assigned ticker, tracked in
    /// the shared `AssignmentTable` alongside a separate per-ticker sid map).
    pub global_sid: Mutex<Option<i64>>,
    pub healthy: AtomicBool,
}

impl ManagedConnection {
    #[must_use]
    pub fn new(id: u32, client: Arc<WireClient>) -> Self {
        Self {
            id,
            role: Role::for_connection(id),
            client,
            correlator: super::correlation::Correlator::new(),
            global_sid: Mutex::new(None),
            healthy: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_allocation_matches_fixed_table() {
        assert_eq!(Role::for_connection(1), Role::Ticker);
        assert_eq!(Role::for_connection(2), Role::Ticker);
        assert_eq!(Role::for_connection(3), Role::Trade);
        assert_eq!(Role::for_connection(4), Role::Trade);
        assert_eq!(Role::for_connection(5), Role::Lifecycle);
        assert_eq!(Role::for_connection(6), Role::Lifecycle);
        assert_eq!(Role::for_connection(7), Role::Orderbook);
        assert_eq!(Role::for_connection(150), Role::Orderbook);
    }

    #[test]
    fn global_channel_only_set_for_non_orderbook_roles() {
        assert_eq!(Role::Ticker.global_channel(), Some("ticker"));
        assert_eq!(Role::Trade.global_channel(), Some("trade"));
        assert_eq!(Role::Lifecycle.global_channel(), Some("market_lifecycle"));
        assert_eq!(Role::Orderbook.global_channel(), None);
    }
}
