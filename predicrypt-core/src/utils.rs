//! # Utility Functions
//!
//! Common helpers for ledger identifiers, timestamps and hashing.

use crate::{error::Result, MarketError};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use sha2::{Digest, Sha256};

/// Maximum number of hex digits in an object id or address
pub const OBJECT_ID_HEX_LEN: usize = 64;

/// Validate an object id or account address (`0x` followed by 1..=64 hex digits)
pub fn validate_object_id(id: &str) -> bool {
    let Some(digits) = id.strip_prefix("0x") else {
        return false;
    };
    !digits.is_empty()
        && digits.len() <= OBJECT_ID_HEX_LEN
        && digits.chars().all(|c| c.is_ascii_hexdigit())
}

/// Validate and lowercase an object id or address
pub fn normalize_object_id(id: &str) -> Result<String> {
    let id = id.trim();
    if !validate_object_id(id) {
        return Err(MarketError::InvalidInput(format!("Invalid object id: {id}")));
    }
    Ok(id.to_ascii_lowercase())
}

/// Hash bytes using SHA256, hex-encoded
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Current wall-clock time in Unix milliseconds
pub fn now_millis() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

/// Format a millisecond timestamp as a human-readable string
pub fn format_timestamp(timestamp_ms: u64) -> String {
    let dt = DateTime::from_timestamp_millis(timestamp_ms as i64).unwrap_or_default();
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Parse an end date as produced by a date/time form into Unix milliseconds.
///
/// Accepts `YYYY-MM-DDTHH:MM[:SS]` in local time, `YYYY-MM-DD` as UTC
/// midnight, and RFC 3339 with an explicit offset.
pub fn parse_end_date(input: &str) -> Result<u64> {
    let input = input.trim();
    let invalid = || MarketError::InvalidInput(format!("Invalid end date: {input:?}"));

    let millis = if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        dt.timestamp_millis()
    } else if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(invalid)?;
        Utc.from_utc_datetime(&midnight).timestamp_millis()
    } else {
        let naive = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M")
            .or_else(|_| NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S"))
            .map_err(|_| invalid())?;
        // A wall-clock time skipped by a DST jump has no instant
        Local
            .from_local_datetime(&naive)
            .earliest()
            .ok_or_else(invalid)?
            .timestamp_millis()
    };

    u64::try_from(millis).map_err(|_| invalid())
}

/// Render the time left until a deadline as `"{d}d {h}h {m}m"`, or `"Ended"`.
pub fn format_countdown(end_timestamp_ms: u64, now_ms: u64) -> String {
    if now_ms >= end_timestamp_ms {
        return "Ended".to_string();
    }
    let distance = end_timestamp_ms - now_ms;
    let days = distance / 86_400_000;
    let hours = (distance % 86_400_000) / 3_600_000;
    let minutes = (distance % 3_600_000) / 60_000;
    format!("{days}d {hours}h {minutes}m")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_id_validation() {
        assert!(validate_object_id("0x6"));
        assert!(validate_object_id(
            "0x5a1cf3c5e1e3b0f84e7bd7d3ab8b0e0f9d4b7e1f2a3c4d5e6f708192a3b4c5d6"
        ));
        assert!(!validate_object_id("0x"));
        assert!(!validate_object_id("5a1c"));
        assert!(!validate_object_id("0xzz"));
        assert!(!validate_object_id(&format!("0x{}", "a".repeat(65))));
    }

    #[test]
    fn test_normalize_object_id() {
        assert_eq!(normalize_object_id(" 0xABcd ").unwrap(), "0xabcd");
        assert!(matches!(
            normalize_object_id("market"),
            Err(MarketError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_sha256_hex() {
        let hash = sha256_hex(b"Hello, World!");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_parse_end_date_utc_formats() {
        assert_eq!(parse_end_date("2025-01-01").unwrap(), 1_735_689_600_000);
        assert_eq!(
            parse_end_date("2025-01-01T00:00:00Z").unwrap(),
            1_735_689_600_000
        );
        assert_eq!(
            parse_end_date("2025-01-01T02:00:00+02:00").unwrap(),
            1_735_689_600_000
        );
    }

    #[test]
    fn test_parse_end_date_local_formats() {
        let short = parse_end_date("2030-06-15T12:30").unwrap();
        let long = parse_end_date("2030-06-15T12:30:45").unwrap();
        assert_eq!(long - short, 45_000);

        let naive = NaiveDateTime::parse_from_str("2030-06-15T12:30", "%Y-%m-%dT%H:%M").unwrap();
        let expected = Local
            .from_local_datetime(&naive)
            .earliest()
            .unwrap()
            .timestamp_millis() as u64;
        assert_eq!(short, expected);
    }

    #[test]
    fn test_parse_end_date_rejects_garbage() {
        for input in ["", "tomorrow", "2025-13-01", "2025-02-30T10:00", "1969-12-31"] {
            assert!(
                matches!(parse_end_date(input), Err(MarketError::InvalidInput(_))),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(1_735_689_600_000), "2025-01-01 00:00:00 UTC");
    }

    #[test]
    fn test_format_countdown() {
        assert_eq!(format_countdown(1_000, 1_000), "Ended");
        assert_eq!(format_countdown(1_000, 5_000), "Ended");
        let end = 2 * 86_400_000 + 3 * 3_600_000 + 4 * 60_000 + 59_000;
        assert_eq!(format_countdown(end, 0), "2d 3h 4m");
    }
}
