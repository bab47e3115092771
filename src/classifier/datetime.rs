//! Local wall-clock helpers for the date/time extraction round-trip.
//!
//! The model reads and writes local wall-clock times. Nothing here converts an
//! extracted time to UTC: the clock fields the model produced are kept and the
//! call's timezone is attached to them.

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::ClassifyError;

/// Accepted ISO-8601 local date-time layouts, tried in order.
const LOCAL_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Load an IANA zone such as `Asia/Singapore`.
pub fn load_timezone(name: &str) -> Result<Tz, ClassifyError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| ClassifyError::InvalidTimezone(name.to_string()))
}

/// Render `called_at` as local date, time, and weekday, e.g. `2024-01-10 18:00:00, Wednesday`.
pub fn format_call_time(called_at: DateTime<Utc>, tz: Tz) -> String {
    called_at
        .with_timezone(&tz)
        .format("%Y-%m-%d %H:%M:%S, %A")
        .to_string()
}

/// Parse the model's `agreedDatetime` answer.
///
/// Returns `Ok(None)` for the "no date" answers (empty or the literal `null`).
pub fn parse_agreed_datetime(raw: &str) -> Result<Option<NaiveDateTime>, ClassifyError> {
    let value = raw.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("null") {
        return Ok(None);
    }

    let mut last_err = None;
    for format in LOCAL_FORMATS {
        match NaiveDateTime::parse_from_str(value, format) {
            Ok(naive) => return Ok(Some(naive)),
            Err(e) => last_err = Some(e),
        }
    }
    Err(ClassifyError::InvalidDatetime {
        value: value.to_string(),
        reason: last_err.map(|e| e.to_string()).unwrap_or_default(),
    })
}

/// Attach `tz` to wall-clock `naive` without moving the clock fields.
///
/// A time inside a DST fold takes the earlier instant. A time inside a DST gap
/// does not exist locally, so it is pushed forward by an hour.
pub fn localize(naive: NaiveDateTime, tz: Tz) -> Result<DateTime<Tz>, ClassifyError> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest),
        LocalResult::None => tz
            .from_local_datetime(&(naive + TimeDelta::hours(1)))
            .earliest()
            .ok_or_else(|| ClassifyError::InvalidDatetime {
                value: naive.to_string(),
                reason: format!("does not exist in {}", tz.name()),
            }),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::*;

    #[test]
    fn loads_known_zone() {
        assert_eq!(load_timezone("Asia/Singapore").unwrap(), chrono_tz::Asia::Singapore);
    }

    #[test]
    fn unknown_zone_is_an_error() {
        let err = load_timezone("Mars/Colony").unwrap_err();
        assert!(matches!(err, ClassifyError::InvalidTimezone(ref name) if name == "Mars/Colony"));
    }

    #[test]
    fn call_time_rendered_in_local_zone() {
        let called_at = Utc.with_ymd_and_hms(2024, 1, 10, 10, 0, 0).unwrap();
        let rendered = format_call_time(called_at, chrono_tz::Asia::Singapore);
        assert_eq!(rendered, "2024-01-10 18:00:00, Wednesday");
    }

    #[test]
    fn null_and_empty_mean_no_date() {
        assert_eq!(parse_agreed_datetime("null").unwrap(), None);
        assert_eq!(parse_agreed_datetime("NULL").unwrap(), None);
        assert_eq!(parse_agreed_datetime("").unwrap(), None);
        assert_eq!(parse_agreed_datetime("  ").unwrap(), None);
    }

    #[test]
    fn parses_seconds_and_minute_precision() {
        let full = parse_agreed_datetime("2024-01-11T15:00:00").unwrap().unwrap();
        let short = parse_agreed_datetime("2024-01-11T15:00").unwrap().unwrap();
        assert_eq!(full, short);
        assert_eq!(full.hour(), 15);

        let fractional = parse_agreed_datetime("2024-01-11T15:00:00.500").unwrap().unwrap();
        assert_eq!(fractional.second(), 0);
    }

    #[test]
    fn garbage_datetime_is_an_error() {
        assert!(matches!(
            parse_agreed_datetime("tomorrow at 3"),
            Err(ClassifyError::InvalidDatetime { .. })
        ));
        // A zone suffix is not part of the expected answer.
        assert!(parse_agreed_datetime("2024-01-11T15:00:00Z").is_err());
    }

    #[test]
    fn localize_keeps_clock_fields() {
        let naive = parse_agreed_datetime("2024-01-11T15:00:00").unwrap().unwrap();
        let local = localize(naive, chrono_tz::Asia::Singapore).unwrap();

        assert_eq!((local.year(), local.month(), local.day()), (2024, 1, 11));
        assert_eq!((local.hour(), local.minute()), (15, 0));
        assert_eq!(local.timezone(), chrono_tz::Asia::Singapore);
        assert_eq!(local.with_timezone(&Utc).hour(), 7);
    }

    #[test]
    fn localize_fold_takes_earlier_instant() {
        // 01:30 happens twice in New York on 2024-11-03.
        let naive = parse_agreed_datetime("2024-11-03T01:30:00").unwrap().unwrap();
        let local = localize(naive, chrono_tz::America::New_York).unwrap();
        assert_eq!(local.with_timezone(&Utc).hour(), 5);
    }

    #[test]
    fn localize_gap_moves_forward() {
        // 02:30 is skipped in New York on 2024-03-10.
        let naive = parse_agreed_datetime("2024-03-10T02:30:00").unwrap().unwrap();
        let local = localize(naive, chrono_tz::America::New_York).unwrap();
        assert_eq!((local.hour(), local.minute()), (3, 30));
    }
}
