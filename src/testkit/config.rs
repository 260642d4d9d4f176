//! A minimal, validating `Config` for tests that need a whole one.

use crate::config::Config;

/// Fills in the three mandatory fields over the typed defaults; every other
/// option keeps its production default.
#[must_use]
pub fn minimal_config(database_url: &str, private_key_path: &str) -> Config {
    let mut config = Config::default();
    config.auth.key_id = "test-key".to_string();
    config.auth.private_key_path = private_key_path.to_string();
    config.database.url = database_url.to_string();
    config
}
