//! Lifecycle event shapes delivered by the Connection Manager's
//! `market_lifecycle` channel.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    Created {
        #[serde(rename = "market_ticker")]
        ticker: String,
    },
    StatusChange {
        #[serde(rename = "market_ticker")]
        ticker: String,
        new_status: String,
    },
    Settled {
        #[serde(rename = "market_ticker")]
        ticker: String,
        result: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_created_event() {
        let event: LifecycleEvent =
            serde_json::from_str(r#"{"event_type":"created","market_ticker":"T-1"}"#).unwrap();
        assert!(matches!(event, LifecycleEvent::Created { ticker } if ticker == "T-1"));
    }

    #[test]
    fn parses_status_change_event() {
        let event: LifecycleEvent = serde_json::from_str(
            r#"{"event_type":"status_change","market_ticker":"T-1","new_status":"closed"}"#,
        )
        .unwrap();
        assert!(matches!(event, LifecycleEvent::StatusChange { new_status, .. } if new_status == "closed"));
    }

    #[test]
    fn parses_settled_event() {
        let event: LifecycleEvent = serde_json::from_str(
            r#"{"event_type":"settled","market_ticker":"T-1","result":"yes"}"#,
        )
        .unwrap();
        assert!(matches!(event, LifecycleEvent::Settled { result, .. } if result == "yes"));
    }

    #[test]
    fn unknown_event_type_fails_to_parse() {
        let result: std::result::Result<LifecycleEvent, _> =
            serde_json::from_str(r#"{"event_type":"mystery","market_ticker":"T-1"}"#);
        assert!(result.is_err());
    }
}
