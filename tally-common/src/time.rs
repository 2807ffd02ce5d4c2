//! Timestamp utilities
//!
//! Persisted timestamps are epoch milliseconds. Wall-clock phase boundaries are
//! expressed in the fixed UTC+6 offset used on election day.

use chrono::{DateTime, FixedOffset, Offset, TimeZone, Utc};

/// Offset of the election's local clock from UTC, in seconds
pub const LOCAL_OFFSET_SECS: i32 = 6 * 3600;

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current time as epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// The fixed election-day offset (UTC+6)
pub fn local_offset() -> FixedOffset {
    FixedOffset::east_opt(LOCAL_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Convert a UTC instant to the election's local clock
pub fn to_local(at: DateTime<Utc>) -> DateTime<FixedOffset> {
    at.with_timezone(&local_offset())
}

/// Convert epoch milliseconds back to a UTC instant
///
/// Out-of-range values clamp to the Unix epoch.
pub fn from_millis(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_now_millis_is_recent() {
        let millis = now_millis();
        // After 2020-01-01 and before 2100-01-01
        assert!(millis > 1_577_836_800_000);
        assert!(millis < 4_102_444_800_000);
    }

    #[test]
    fn test_to_local_shifts_six_hours() {
        let utc = Utc.with_ymd_and_hms(2026, 2, 12, 1, 30, 0).unwrap();
        let local = to_local(utc);
        assert_eq!(local.hour(), 7);
        assert_eq!(local.minute(), 30);
    }

    #[test]
    fn test_from_millis_round_trips_instant() {
        let utc = Utc.with_ymd_and_hms(2026, 2, 12, 10, 30, 0).unwrap();
        assert_eq!(from_millis(utc.timestamp_millis()), utc);
    }
}
