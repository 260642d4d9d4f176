//! The exchange's read-only REST surface: exchange status, paginated market
//! listing, single-market fetch, and full order-book snapshots.

mod client;
mod types;

pub use client::RestClient;
pub use types::{ExchangeStatus, MarketDto, MarketsPage, OrderbookLevels, OrderbookResponse};
