//! Gatherer - real-time market-data ingestion core for a prediction-market
//! capture platform.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── domain/       # Instruments, subscriptions, records, price/timestamp codecs
//! ├── rest/         # Read-only exchange REST client
//! ├── wire/         # One streaming connection: frame I/O, ping/pong, auth
//! ├── queue/         # The growable back-pressure queue shared by the Router
//! ├── registry/     # Market Registry: instrument catalog + change events
//! ├── connmgr/      # Connection Manager: 150-connection pool, allocation, gaps
//! ├── router/       # Message Router: envelope parsing + demultiplexing
//! ├── writers/      # Per-class batched, idempotent store appenders
//! ├── poller/       # Snapshot Poller: periodic full-book REST sweep
//! ├── storage/      # Diesel schema/models/pool for the time-series store
//! ├── health/       # Operator HTTP surface (/health, /debug/*)
//! ├── cli/          # Command-line entry points
//! └── supervisor/   # Bring-up/shutdown ordering
//! ```
//!
//! This crate issues no writes to the exchange and performs no order
//! placement: it is a capture pipeline only.

pub mod auth;
pub mod cli;
pub mod config;
pub mod connmgr;
pub mod domain;
pub mod error;
pub mod health;
pub mod poller;
pub mod queue;
pub mod registry;
pub mod rest;
pub mod router;
pub mod storage;
pub mod supervisor;
#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
pub mod wire;
pub mod writers;
