//! Streaming wire format: inbound envelopes/commands/responses and the raw
//! frame type handed up from the read loop.
//!
//! The Router does the actual field-by-field parsing (`router::parse`); this
//! module only owns the envelope shape shared by every message type.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One inbound JSON frame: `{type, sid?, seq?, id?, msg}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub sid: Option<i64>,
    #[serde(default)]
    pub seq: Option<i64>,
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub msg: Value,
}

/// An outbound command: `{id, cmd, params}`.
#[derive(Debug, Clone, Serialize)]
pub struct Command {
    pub id: u64,
    pub cmd: &'static str,
    pub params: CommandParams,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandParams {
    pub channels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_ticker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<i64>,
}

impl Command {
    #[must_use]
    pub fn subscribe(id: u64, channel: &str, market_ticker: Option<String>) -> Self {
        Self {
            id,
            cmd: "subscribe",
            params: CommandParams {
                channels: vec![channel.to_string()],
                market_ticker,
                sid: None,
            },
        }
    }

    #[must_use]
    pub const fn unsubscribe(id: u64, sid: i64) -> Self {
        Self {
            id,
            cmd: "unsubscribe",
            params: CommandParams {
                channels: Vec::new(),
                market_ticker: None,
                sid: Some(sid),
            },
        }
    }
}

/// The outcome of a correlated command: a server-acknowledged subscribe, an
/// unsubscribe ack, or a rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResponse {
    Subscribed { sid: i64, channel: String },
    Unsubscribed,
    Error { code: String, message: String },
}

/// Classifies an inbound envelope as either a correlated command response
/// (to be delivered to a waiter) or a data frame (to be forwarded).
#[must_use]
pub fn classify(envelope: &Envelope) -> Option<CommandResponse> {
    match envelope.kind.as_str() {
        "subscribed" => Some(CommandResponse::Subscribed {
            sid: envelope.msg.get("sid").and_then(Value::as_i64).unwrap_or_default(),
            channel: envelope
                .msg
                .get("channel")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        }),
        "unsubscribed" => Some(CommandResponse::Unsubscribed),
        "error" => Some(CommandResponse::Error {
            code: envelope
                .msg
                .get("code")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            message: envelope
                .msg
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_subscribed_response() {
        let envelope: Envelope = serde_json::from_str(
            r#"{"id":1,"type":"subscribed","msg":{"sid":42,"channel":"orderbook_delta"}}"#,
        )
        .unwrap();
        match classify(&envelope) {
            Some(CommandResponse::Subscribed { sid, channel }) => {
                assert_eq!(sid, 42);
                assert_eq!(channel, "orderbook_delta");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn classifies_data_frame_as_none() {
        let envelope: Envelope = serde_json::from_str(
            r#"{"type":"orderbook_delta","sid":42,"seq":7,"msg":{}}"#,
        )
        .unwrap();
        assert!(classify(&envelope).is_none());
    }
}
