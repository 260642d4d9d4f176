//! Shared test utilities, available to unit tests (`#[cfg(test)]`) and to
//! the integration tests under `tests/` via the `testkit` feature.
//!
//! - [`domain`] — builders for `Instrument` and wire-frame JSON fixtures.
//! - [`config`] — a minimal, validating `Config` for tests that need one.
//! - [`key`] — throwaway RSA key generation for `Signer`-dependent tests.

pub mod config;
pub mod domain;
pub mod key;
