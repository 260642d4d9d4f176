//! One streaming connection: handshake, framed send/receive, ping/pong
//! keepalive. Never reconnects — that is the Connection Manager's job.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Mutex as AsyncMutex};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use crate::auth::Signer;
use crate::domain::micros_now;
use crate::error::{Error, Result};

/// One inbound frame, stamped the instant it emerges from the reader.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub bytes: String,
    pub connection_id: u32,
    pub received_at: i64,
}

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// One streaming connection. Owns its own read loop and heartbeat monitor,
/// spawned by `connect`; the caller drains `messages` and `errors`.
pub struct WireClient {
    connection_id: u32,
    ws_url: String,
    ping_timeout: Duration,
    write: Arc<AsyncMutex<Option<WsSink>>>,
    connected: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    last_ping_at: Arc<AtomicI64>,
    messages_tx: mpsc::Sender<RawFrame>,
    messages_rx: AsyncMutex<Option<mpsc::Receiver<RawFrame>>>,
    error_tx: AsyncMutex<Option<oneshot::Sender<Error>>>,
    error_rx: AsyncMutex<Option<oneshot::Receiver<Error>>>,
    dropped_frames: Arc<std::sync::atomic::AtomicU64>,
}

impl WireClient {
    #[must_use]
    pub fn new(
        connection_id: u32,
        ws_url: String,
        message_buffer_size: usize,
        ping_timeout: Duration,
    ) -> Self {
        let (messages_tx, messages_rx) = mpsc::channel(message_buffer_size.max(1));
        let (error_tx, error_rx) = oneshot::channel();
        Self {
            connection_id,
            ws_url,
            ping_timeout,
            write: Arc::new(AsyncMutex::new(None)),
            connected: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(AtomicBool::new(false)),
            last_ping_at: Arc::new(AtomicI64::new(micros_now())),
            messages_tx,
            messages_rx: AsyncMutex::new(Some(messages_rx)),
            error_tx: AsyncMutex::new(Some(error_tx)),
            error_rx: AsyncMutex::new(Some(error_rx)),
            dropped_frames: Arc::new(std::sync::atomic::AtomicU64::new(0)),
        }
    }

    #[must_use]
    pub const fn connection_id(&self) -> u32 {
        self.connection_id
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn dropped_frame_count(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }

    /// Performs the handshake with credentialed headers, then spawns the
    /// read loop and heartbeat monitor.
    pub async fn connect(&self, signer: &Signer) -> Result<()> {
        self.shutdown.store(false, Ordering::Release);

        let path = url::Url::parse(&self.ws_url)
            .map(|u| u.path().to_string())
            .unwrap_or_default();
        let headers = signer.sign("GET", &path);

        let mut request = self.ws_url.as_str().into_client_request()?;
        let req_headers = request.headers_mut();
        req_headers.insert(
            "KALSHI-ACCESS-KEY",
            HeaderValue::from_str(&headers.key_id).map_err(|_| Error::Auth("invalid key id".into()))?,
        );
        req_headers.insert(
            "KALSHI-ACCESS-SIGNATURE",
            HeaderValue::from_str(&headers.signature)
                .map_err(|_| Error::Auth("invalid signature encoding".into()))?,
        );
        req_headers.insert(
            "KALSHI-ACCESS-TIMESTAMP",
            HeaderValue::from_str(&headers.timestamp_ms)
                .map_err(|_| Error::Auth("invalid timestamp".into()))?,
        );

        let (ws_stream, _response) = connect_async(request).await?;
        let (sink, mut stream) = ws_stream.split();

        *self.write.lock().await = Some(sink);
        self.connected.store(true, Ordering::Release);
        self.last_ping_at.store(micros_now(), Ordering::Release);

        let (error_tx, error_rx) = oneshot::channel();
        *self.error_tx.lock().await = Some(error_tx);
        *self.error_rx.lock().await = Some(error_rx);

        let connection_id = self.connection_id;
        let messages_tx = self.messages_tx.clone();
        let shutdown = self.shutdown.clone();
        let connected = self.connected.clone();
        let last_ping_at = self.last_ping_at.clone();
        let dropped_frames = self.dropped_frames.clone();
        let write = self.write.clone();
        let ping_timeout = self.ping_timeout;
        let error_tx = Arc::new(std::sync::Mutex::new(self.take_error_tx().await));

        let read_loop_error_tx = error_tx.clone();
        tokio::spawn(async move {
            let mut fatal: Option<Error> = None;
            loop {
                match stream.next().await {
                    None => break,
                    Some(Ok(Message::Text(text))) => {
                        let received_at = micros_now();
                        let frame = RawFrame {
                            bytes: text,
                            connection_id,
                            received_at,
                        };
                        if messages_tx.try_send(frame).is_err() {
                            dropped_frames.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        last_ping_at.store(micros_now(), Ordering::Release);
                        let mut guard = write.lock().await;
                        if let Some(sink) = guard.as_mut() {
                            let _ = timeout(Duration::from_secs(5), sink.send(Message::Pong(payload))).await;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        if !shutdown.load(Ordering::Acquire) {
                            fatal = Some(Error::NotConnected);
                        }
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        if !shutdown.load(Ordering::Acquire) {
                            fatal = Some(Error::WebSocket(e));
                        }
                        break;
                    }
                }
            }
            connected.store(false, Ordering::Release);
            if let Some(err) = fatal {
                if let Some(tx) = read_loop_error_tx.lock().unwrap().take() {
                    let _ = tx.send(err);
                }
            }
        });

        let shutdown_watch = self.shutdown.clone();
        let connected_watch = self.connected.clone();
        let last_ping_watch = self.last_ping_at.clone();
        let heartbeat_error_tx = error_tx;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(15));
            loop {
                ticker.tick().await;
                if shutdown_watch.load(Ordering::Acquire) || !connected_watch.load(Ordering::Acquire) {
                    break;
                }
                let since_last_ping = micros_now() - last_ping_watch.load(Ordering::Acquire);
                if since_last_ping > ping_timeout.as_micros() as i64 {
                    warn!(since_last_ping_us = since_last_ping, "stale connection, no ping observed");
                    connected_watch.store(false, Ordering::Release);
                    if let Some(tx) = heartbeat_error_tx.lock().unwrap().take() {
                        let _ = tx.send(Error::StaleConnection(ping_timeout));
                    }
                    break;
                }
            }
        });

        Ok(())
    }

    async fn take_error_tx(&self) -> Option<oneshot::Sender<Error>> {
        self.error_tx.lock().await.take()
    }

    /// Idempotent. Signals shutdown and drops the write half.
    pub async fn close(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.connected.store(false, Ordering::Release);
        let mut guard = self.write.lock().await;
        if let Some(sink) = guard.as_mut() {
            // Best-effort: a close frame lets the peer release the socket
            // promptly and nudges our own read loop past its next poll.
            let _ = timeout(Duration::from_secs(2), sink.send(Message::Close(None))).await;
        }
        *guard = None;
    }

    /// Writes one framed message, serialized against concurrent sends.
    pub async fn send(&self, payload: &str) -> Result<()> {
        let mut guard = self.write.lock().await;
        let sink = guard.as_mut().ok_or(Error::NotConnected)?;
        timeout(Duration::from_secs(5), sink.send(Message::Text(payload.to_string())))
            .await
            .map_err(|_| Error::Timeout)??;
        Ok(())
    }

    /// Takes the receiving half of the message stream. Only one caller may
    /// hold this at a time; subsequent calls after the first return `None`.
    pub async fn take_messages(&self) -> Option<mpsc::Receiver<RawFrame>> {
        self.messages_rx.lock().await.take()
    }

    /// Waits for the single fatal error this connection lifetime will ever
    /// publish, or returns `None` if `close` was called first.
    pub async fn wait_for_error(&self) -> Option<Error> {
        let rx = self.error_rx.lock().await.take()?;
        rx.await.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_client_is_disconnected() {
        let client = WireClient::new(1, "wss://example.invalid/ws".into(), 100, Duration::from_secs(60));
        assert!(!client.is_connected());
        assert_eq!(client.dropped_frame_count(), 0);
    }

    #[tokio::test]
    async fn send_before_connect_is_not_connected() {
        let client = WireClient::new(1, "wss://example.invalid/ws".into(), 100, Duration::from_secs(60));
        let result = client.send("hello").await;
        assert!(matches!(result, Err(Error::NotConnected)));
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let client = WireClient::new(1, "wss://example.invalid/ws".into(), 100, Duration::from_secs(60));
        client.close().await;
        client.close().await;
        assert!(!client.is_connected());
    }
}
