//! Instrument identity, status lifecycle, and the change events the Market
//! Registry broadcasts as that lifecycle progresses.

use serde::{Deserialize, Serialize};

/// An instrument's status, per the exchange's lifecycle.
///
/// The expected progression is `Initialized -> Inactive/Open -> Active <->
/// Closed -> Determined -> [Disputed|Amended]? -> Finalized -> Settled`,
/// with `Settled` terminal. Only forward transitions are expected, but the
/// Registry treats any observed transition — including a backward one — as
/// authoritative and emits it unconditionally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Initialized,
    Inactive,
    Active,
    Open,
    Closed,
    Determined,
    Disputed,
    Amended,
    Finalized,
    Settled,
}

impl Status {
    /// The active set is `{active, open}` — the universe of orderbook
    /// subscriptions.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active | Self::Open)
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Settled)
    }

    /// Parses a wire status string. Unknown strings fall back to
    /// `Initialized` rather than failing the whole upsert — a single
    /// unrecognized status should not drop the instrument from the catalog.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "inactive" => Self::Inactive,
            "active" => Self::Active,
            "open" => Self::Open,
            "closed" => Self::Closed,
            "determined" => Self::Determined,
            "disputed" => Self::Disputed,
            "amended" => Self::Amended,
            "finalized" => Self::Finalized,
            "settled" => Self::Settled,
            _ => Self::Initialized,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::Inactive => "inactive",
            Self::Active => "active",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Determined => "determined",
            Self::Disputed => "disputed",
            Self::Amended => "amended",
            Self::Finalized => "finalized",
            Self::Settled => "settled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentType {
    Binary,
    Scalar,
}

/// A single tradable contract, identified by an opaque ticker string.
#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
    pub ticker: String,
    pub event_ticker: String,
    pub title: String,
    pub instrument_type: InstrumentType,
    pub status: Status,
    pub open_ts: i64,
    pub close_ts: i64,
    pub expiration_ts: i64,
    pub updated_at: i64,
    pub result: Option<String>,
}

impl Instrument {
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

/// A lifecycle event emitted by the Market Registry whenever an instrument
/// is discovered or its status changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketChangeKind {
    Created,
    StatusChange,
    Settled,
}

/// One change notification delivered on the Registry's change stream.
#[derive(Debug, Clone)]
pub struct MarketChange {
    pub ticker: String,
    pub kind: MarketChangeKind,
    pub old_status: Option<Status>,
    pub new_status: Status,
    pub instrument: Option<Instrument>,
}
