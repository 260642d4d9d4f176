use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("database pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("migration error: {0}")]
    Migration(String),

    #[error("not connected")]
    NotConnected,

    #[error("stale connection: no ping observed in {0:?}")]
    StaleConnection(std::time::Duration),

    #[error("command timed out")]
    Timeout,

    #[error("command rejected: {code}: {message}")]
    CommandRejected { code: String, message: String },

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("exchange status unavailable, resume expected at {0}")]
    ExchangeInactive(String),
}

pub type Result<T> = std::result::Result<T, Error>;
