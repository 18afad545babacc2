//! Timestamp utilities

use chrono::{DateTime, Datelike, FixedOffset, SecondsFormat, Utc};

use crate::{Error, Result};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp for storage
///
/// Always microsecond precision with a `Z` suffix, so stored values have a
/// fixed width and sort lexically in chronological order.
pub fn to_db_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a timestamp written by [`to_db_timestamp`]
pub fn parse_db_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Invalid stored timestamp '{}': {}", value, e)))
}

/// ISO-8601 year-week key of `ts` as seen in `offset`, e.g. `2026-W42`
pub fn week_key(ts: &DateTime<Utc>, offset: &FixedOffset) -> String {
    let week = ts.with_timezone(offset).iso_week();
    format!("{:04}-W{:02}", week.year(), week.week())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // After 2000-01-01 00:00:00 UTC
        assert!(timestamp.timestamp() > 946_684_800);
    }

    #[test]
    fn test_db_timestamp_is_fixed_width() {
        let a = Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2026, 10, 17, 14, 30, 45).unwrap();

        let sa = to_db_timestamp(&a);
        let sb = to_db_timestamp(&b);

        assert_eq!(sa, "2026-01-05T08:00:00.000000Z");
        assert_eq!(sa.len(), sb.len());
        assert!(sa < sb);
    }

    #[test]
    fn test_db_timestamp_parses_back() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let parsed = parse_db_timestamp(&to_db_timestamp(&ts)).unwrap();
        assert_eq!(parsed, ts);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_db_timestamp("last tuesday").is_err());
    }

    #[test]
    fn test_week_key_uses_offset() {
        // Monday 2026-10-19 03:00 UTC is still Sunday evening at UTC-06:00
        let ts = Utc.with_ymd_and_hms(2026, 10, 19, 3, 0, 0).unwrap();
        let utc = FixedOffset::east_opt(0).unwrap();
        let cst = FixedOffset::west_opt(6 * 3600).unwrap();

        assert_eq!(week_key(&ts, &utc), "2026-W43");
        assert_eq!(week_key(&ts, &cst), "2026-W42");
    }

    #[test]
    fn test_week_key_iso_year_boundary() {
        // 2027-01-01 is a Friday and belongs to ISO week 53 of 2026
        let ts = Utc.with_ymd_and_hms(2027, 1, 1, 12, 0, 0).unwrap();
        let utc = FixedOffset::east_opt(0).unwrap();
        assert_eq!(week_key(&ts, &utc), "2026-W53");
    }
}
