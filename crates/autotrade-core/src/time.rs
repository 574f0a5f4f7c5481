//! Session clock helpers.

use chrono::{FixedOffset, NaiveTime, TimeZone, Utc};

/// Default exchange offset from UTC (+09:00).
pub const DEFAULT_EXCHANGE_UTC_OFFSET_SECS: i32 = 9 * 3600;

/// Resolve a broker `HHMMSS` wall-clock time to Unix milliseconds on the
/// session day containing `now_ms`.
///
/// Falls back to `now_ms` when the field is missing or malformed, when the
/// offset is invalid, or when the resolved time lies in the future.
pub fn resolve_session_time(now_ms: u64, hhmmss: &str, utc_offset_secs: i32) -> u64 {
    let Ok(time) = NaiveTime::parse_from_str(hhmmss.trim(), "%H%M%S") else {
        return now_ms;
    };
    let Some(offset) = FixedOffset::east_opt(utc_offset_secs) else {
        return now_ms;
    };
    let Some(now) = i64::try_from(now_ms)
        .ok()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    else {
        return now_ms;
    };

    let session_day = now.with_timezone(&offset).date_naive();
    let resolved = offset
        .from_local_datetime(&session_day.and_time(time))
        .single()
        .and_then(|dt| u64::try_from(dt.timestamp_millis()).ok());

    match resolved {
        Some(ms) if ms <= now_ms => ms,
        _ => now_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-03-04T01:00:00Z == 10:00:00 at +09:00
    const NOW: u64 = 1_709_514_000_000;

    #[test]
    fn test_resolves_on_session_day() {
        let accepted = resolve_session_time(NOW, "095950", DEFAULT_EXCHANGE_UTC_OFFSET_SECS);
        assert_eq!(accepted, NOW - 10_000);
    }

    #[test]
    fn test_malformed_falls_back_to_now() {
        assert_eq!(resolve_session_time(NOW, "", DEFAULT_EXCHANGE_UTC_OFFSET_SECS), NOW);
        assert_eq!(resolve_session_time(NOW, "9x", DEFAULT_EXCHANGE_UTC_OFFSET_SECS), NOW);
    }

    #[test]
    fn test_future_time_clamped_to_now() {
        assert_eq!(resolve_session_time(NOW, "153000", DEFAULT_EXCHANGE_UTC_OFFSET_SECS), NOW);
    }
}
