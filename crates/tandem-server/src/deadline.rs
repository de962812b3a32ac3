//! `grpc-timeout` header syntax: up to eight ASCII digits followed by a
//! unit (`H`, `M`, `S`, `m`, `u`, `n`).

use std::time::Duration;

/// Request header carrying a call deadline.
pub const GRPC_TIMEOUT_HEADER: &str = "grpc-timeout";

const MAX_DIGITS: usize = 8;
const MAX_VALUE: u64 = 99_999_999;

/// Parses a `grpc-timeout` value. Returns `None` for malformed input.
#[must_use]
pub fn parse_grpc_timeout(value: &str) -> Option<Duration> {
    let value = value.trim();
    if value.len() < 2 {
        return None;
    }
    let (digits, unit) = value.split_at(value.len() - 1);
    if digits.len() > MAX_DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let amount: u64 = digits.parse().ok()?;

    let duration = match unit {
        "H" => Duration::from_secs(amount.checked_mul(3600)?),
        "M" => Duration::from_secs(amount.checked_mul(60)?),
        "S" => Duration::from_secs(amount),
        "m" => Duration::from_millis(amount),
        "u" => Duration::from_micros(amount),
        "n" => Duration::from_nanos(amount),
        _ => return None,
    };
    Some(duration)
}

/// Formats a duration as a `grpc-timeout` value, using the finest unit that
/// fits in eight digits. Durations too long for hours are clamped.
#[must_use]
pub fn format_grpc_timeout(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    let units: [(u128, char); 6] = [
        (1, 'n'),
        (1_000, 'u'),
        (1_000_000, 'm'),
        (1_000_000_000, 'S'),
        (60_000_000_000, 'M'),
        (3_600_000_000_000, 'H'),
    ];

    for (per_unit, suffix) in units {
        // Round up so the callee never sees a shorter deadline than ours.
        let amount = nanos.div_ceil(per_unit);
        if amount <= u128::from(MAX_VALUE) {
            return format!("{amount}{suffix}");
        }
    }
    format!("{MAX_VALUE}H")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_grpc_timeout("2H"), Some(Duration::from_secs(7200)));
        assert_eq!(parse_grpc_timeout("3M"), Some(Duration::from_secs(180)));
        assert_eq!(parse_grpc_timeout("2S"), Some(Duration::from_secs(2)));
        assert_eq!(parse_grpc_timeout("500m"), Some(Duration::from_millis(500)));
        assert_eq!(parse_grpc_timeout("250u"), Some(Duration::from_micros(250)));
        assert_eq!(parse_grpc_timeout("10n"), Some(Duration::from_nanos(10)));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(parse_grpc_timeout(""), None);
        assert_eq!(parse_grpc_timeout("S"), None);
        assert_eq!(parse_grpc_timeout("10"), None);
        assert_eq!(parse_grpc_timeout("10s"), None);
        assert_eq!(parse_grpc_timeout("-1S"), None);
        assert_eq!(parse_grpc_timeout("123456789S"), None);
        assert_eq!(parse_grpc_timeout("1.5S"), None);
    }

    #[test]
    fn test_format_picks_fitting_unit() {
        assert_eq!(format_grpc_timeout(Duration::from_millis(500)), "500000u");
        assert_eq!(format_grpc_timeout(Duration::from_micros(20)), "20000n");
        assert_eq!(format_grpc_timeout(Duration::from_secs(30)), "30000000u");
        assert_eq!(format_grpc_timeout(Duration::from_secs(3600)), "3600000m");
        assert_eq!(format_grpc_timeout(Duration::ZERO), "0n");
    }

    proptest! {
        #[test]
        fn prop_format_never_shortens(millis in 0u64..10_000_000_000) {
            let original = Duration::from_millis(millis);
            let formatted = format_grpc_timeout(original);
            let parsed = parse_grpc_timeout(&formatted).unwrap();
            prop_assert!(parsed >= original);
        }
    }
}
