//! Conversion between wire decimal-string prices and the canonical int5
//! encoding (hundred-thousandths of a unit, `[0, 100000]`).
//!
//! Dollar strings can represent binary-fraction-unfriendly decimals, so the
//! multiplication is always followed by an explicit round-half-to-even
//! before truncating to an integer. Rounding before truncating instead of
//! truncating the raw product is what keeps `"0.52"` from landing on `51999`.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

const SCALE: i64 = 100_000;

/// Parses a wire dollar string (e.g. `"0.5250"`) into an int5 price.
///
/// Empty or unparseable input maps to `0`, matching the wire contract that
/// absent price strings mean "no quote".
#[must_use]
pub fn price_from_dollars(s: &str) -> i64 {
    if s.is_empty() {
        return 0;
    }
    let Ok(decimal) = s.parse::<Decimal>() else {
        return 0;
    };
    let scaled = decimal * Decimal::from(SCALE);
    let rounded = scaled.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
    rounded.to_i64().unwrap_or(0).clamp(0, SCALE)
}

/// Formats an int5 price back into a 5-decimal-place dollar string.
///
/// `price_from_dollars(&price_to_dollars(p)) == p` for every `p` in
/// `[0, 100000]` — this is the round-trip law in the testable-properties
/// section of the specification.
#[must_use]
pub fn price_to_dollars(price: i64) -> String {
    format!("{:.5}", Decimal::from(price) / Decimal::from(SCALE))
}

/// Mirrors a price across the yes/no duality: `100000 - price`.
#[must_use]
pub const fn mirror(price: i64) -> i64 {
    SCALE - price
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_conversion() {
        assert_eq!(price_from_dollars("0.52"), 52_000);
        assert_eq!(price_from_dollars("0.5250"), 52_500);
    }

    #[test]
    fn empty_and_invalid_are_zero() {
        assert_eq!(price_from_dollars(""), 0);
        assert_eq!(price_from_dollars("not-a-number"), 0);
    }

    #[test]
    fn rounds_half_to_even_not_down() {
        // 0.000005 * 100000 = 0.5, half-to-even rounds to 0 (nearest even).
        assert_eq!(price_from_dollars("0.000005"), 0);
        // 0.000015 * 100000 = 1.5, half-to-even rounds to 2 (nearest even).
        assert_eq!(price_from_dollars("0.000015"), 2);
    }

    #[test]
    fn clamps_to_valid_range() {
        assert_eq!(price_from_dollars("-0.5"), 0);
        assert_eq!(price_from_dollars("2.0"), 100_000);
    }

    #[test]
    fn round_trip() {
        for p in [0_i64, 1, 52_000, 52_500, 99_999, 100_000] {
            let s = price_to_dollars(p);
            assert_eq!(price_from_dollars(&s), p, "round-trip failed for {p}");
        }
    }

    #[test]
    fn mirror_is_involutive() {
        for p in [0_i64, 1, 52_000, 100_000] {
            assert_eq!(mirror(mirror(p)), p);
        }
    }

    #[test]
    fn yes_no_duality() {
        let yes = 52_000_i64;
        let no = mirror(yes);
        assert_eq!(yes + no, 100_000);
    }
}
