//! Canonical timestamp encoding: microseconds since the Unix epoch, signed
//! 64-bit, used for every `exchange_ts` and `received_at` field at rest.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time as microseconds since the Unix epoch.
///
/// Called at the instant bytes emerge from the frame reader (for
/// `received_at`) and by the Snapshot Poller (for `snapshot_ts`).
#[must_use]
pub fn micros_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as i64)
        .unwrap_or(0)
}

/// Converts a wire Unix-seconds timestamp into canonical microseconds.
#[must_use]
pub const fn seconds_to_micros(seconds: i64) -> i64 {
    seconds * 1_000_000
}

/// Parses an RFC 3339 timestamp string (as returned by the REST market
/// listing) into canonical microseconds. Unparseable or absent input yields
/// zero rather than failing the whole instrument upsert.
#[must_use]
pub fn parse_rfc3339_micros(s: Option<&str>) -> i64 {
    s.and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map_or(0, |dt| dt.timestamp_micros())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_conversion() {
        assert_eq!(seconds_to_micros(1_705_328_200), 1_705_328_200_000_000);
        assert_eq!(seconds_to_micros(0), 0);
    }

    #[test]
    fn rfc3339_parses_known_instant() {
        assert_eq!(
            parse_rfc3339_micros(Some("2024-01-15T12:00:00Z")),
            1_705_320_000_000_000
        );
        assert_eq!(parse_rfc3339_micros(Some("not-a-date")), 0);
        assert_eq!(parse_rfc3339_micros(None), 0);
    }

    #[test]
    fn now_is_positive_and_monotonic_enough() {
        let a = micros_now();
        let b = micros_now();
        assert!(a > 0);
        assert!(b >= a);
    }
}
