//! TOML configuration, with typed defaults matching the option table and a
//! `.env` overlay (via `dotenvy`) for secrets that should not live in the
//! checked-in config file.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub network: NetworkConfig,
    pub auth: AuthConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub health: HealthConfig,
    pub registry: RegistryConfig,
    pub connection_manager: ConnectionManagerConfig,
    pub router: RouterConfig,
    pub writers: WritersConfig,
    pub poller: PollerConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub rest_base_url: String,
    pub ws_url: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rest_base_url: "https://api.elections.kalshi.com/trade-api/v2".into(),
            ws_url: "wss://api.elections.kalshi.com/trade-api/ws/v2".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuthConfig {
    pub key_id: String,
    pub private_key_path: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_pool_size: 20,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

impl LoggingConfig {
    /// Initializes the global tracing subscriber. `RUST_LOG` overrides
    /// `level` when set.
    pub fn init(&self) {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&self.level));

        if self.format == "json" {
            tracing_subscriber::fmt().json().with_env_filter(filter).init();
        } else {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub bind: String,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:9090".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub reconcile_interval_secs: u64,
    pub page_size: usize,
    pub initial_load_timeout_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            reconcile_interval_secs: 300,
            page_size: 1000,
            initial_load_timeout_secs: 1800,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConnectionManagerConfig {
    pub subscribe_timeout_secs: u64,
    pub min_healthy_connections: usize,
    pub message_buffer_size: usize,
    pub ping_timeout_secs: u64,
    pub reconnect_base_wait_ms: u64,
    pub reconnect_max_wait_secs: u64,
    pub reconnect_factor: f64,
}

impl Default for ConnectionManagerConfig {
    fn default() -> Self {
        Self {
            subscribe_timeout_secs: 10,
            min_healthy_connections: 100,
            message_buffer_size: 10_000,
            ping_timeout_secs: 60,
            reconnect_base_wait_ms: 1000,
            reconnect_max_wait_secs: 300,
            reconnect_factor: 2.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub orderbook_buffer_size: usize,
    pub trade_buffer_size: usize,
    pub ticker_buffer_size: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            orderbook_buffer_size: 5000,
            trade_buffer_size: 1000,
            ticker_buffer_size: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WritersConfig {
    pub batch_size: usize,
    pub flush_interval_secs: u64,
}

impl Default for WritersConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            flush_interval_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    pub poll_interval_secs: u64,
    pub concurrency: usize,
    pub request_timeout_secs: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 900,
            concurrency: 100,
            request_timeout_secs: 30,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            auth: AuthConfig::default(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            health: HealthConfig::default(),
            registry: RegistryConfig::default(),
            connection_manager: ConnectionManagerConfig::default(),
            router: RouterConfig::default(),
            writers: WritersConfig::default(),
            poller: PollerConfig::default(),
        }
    }
}

impl Config {
    /// Loads config from a TOML file, first overlaying any `.env` file found
    /// in the working directory (secrets such as `database.url` can instead
    /// be set as `GATHERER_DATABASE__URL` etc. via the env overlay).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file: {e}")))?;

        let config: Self =
            toml::from_str(&content).map_err(|e| Error::Config(format!("failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.auth.key_id.is_empty() {
            return Err(Error::Config("auth.key_id is required".into()));
        }
        if self.auth.private_key_path.is_empty() {
            return Err(Error::Config("auth.private_key_path is required".into()));
        }
        if self.database.url.is_empty() {
            return Err(Error::Config("database.url is required".into()));
        }
        if self.network.rest_base_url.is_empty() || self.network.ws_url.is_empty() {
            return Err(Error::Config("network URLs cannot be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_option_table() {
        let config = Config::default();
        assert_eq!(config.registry.reconcile_interval_secs, 300);
        assert_eq!(config.registry.page_size, 1000);
        assert_eq!(config.connection_manager.min_healthy_connections, 100);
        assert_eq!(config.router.orderbook_buffer_size, 5000);
        assert_eq!(config.writers.batch_size, 1000);
        assert_eq!(config.poller.poll_interval_secs, 900);
    }

    #[test]
    fn validate_rejects_missing_mandatory_fields() {
        let config = Config::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_parses_minimal_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gatherer.toml");
        std::fs::write(
            &path,
            r#"
            [auth]
            key_id = "abc"
            private_key_path = "/tmp/key.pem"

            [database]
            url = "postgres://localhost/gatherer"
            "#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.auth.key_id, "abc");
        assert_eq!(config.database.max_pool_size, 20);
        assert_eq!(config.registry.page_size, 1000);
    }
}
