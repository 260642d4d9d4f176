//! Core domain types: instruments, subscriptions, wire records, and the
//! price/timestamp codecs that keep everything downstream in canonical form.

mod instrument;
mod price;
mod record;
mod subscription;
mod timestamp;

pub use instrument::{Instrument, InstrumentType, MarketChange, MarketChangeKind, Status};
pub use price::{mirror, price_from_dollars, price_to_dollars};
pub use record::{OrderbookDelta, OrderbookSnapshot, PriceLevel, SnapshotSource, Trade, TickerQuote};
pub use subscription::{Channel, Sid, Subscription};
pub use record::{best_and_spread, derive_asks};
pub use timestamp::{micros_now, parse_rfc3339_micros, seconds_to_micros};
