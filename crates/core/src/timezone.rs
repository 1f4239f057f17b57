//! IANA time zone parsing and wall-clock resolution.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Timelike};
use chrono_tz::Tz;

use crate::error::CoreError;
use crate::types::Timestamp;

/// Parse an IANA zone name. Blank input means UTC.
pub fn parse_time_zone(name: &str) -> Result<Tz, CoreError> {
    let name = name.trim();
    if name.is_empty() {
        return Ok(Tz::UTC);
    }
    name.parse::<Tz>()
        .map_err(|_| CoreError::Validation(format!("Unknown time zone: {name}")))
}

/// Resolve a wall-clock `date`+`time` in `tz` to a concrete instant.
///
/// Ambiguous times (DST fall-back) resolve to the earlier instant. Times that
/// do not exist (DST spring-forward gap) are pushed forward by one hour.
pub fn resolve_local(date: NaiveDate, time: NaiveTime, tz: Tz) -> DateTime<Tz> {
    let naive = date.and_time(time);
    match naive.and_local_timezone(tz) {
        LocalResult::Single(t) => t,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => (naive + Duration::hours(1))
            .and_local_timezone(tz)
            .earliest()
            .unwrap_or_else(|| tz.from_utc_datetime(&naive)),
    }
}

/// Calendar date of `now` as seen in `tz`.
pub fn today_in(tz: Tz, now: Timestamp) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// Minutes elapsed since local midnight.
pub fn minutes_since_midnight<T: TimeZone>(t: &DateTime<T>) -> i64 {
    i64::from(t.hour()) * 60 + i64::from(t.minute())
}

/// Wall-clock `HH:MM` label used as the availability key.
pub fn hh_mm<T: TimeZone>(t: &DateTime<T>) -> String
where
    T::Offset: std::fmt::Display,
{
    t.format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Utc;

    #[test]
    fn blank_zone_defaults_to_utc() {
        assert_eq!(parse_time_zone("").unwrap(), Tz::UTC);
        assert_eq!(parse_time_zone("  ").unwrap(), Tz::UTC);
    }

    #[test]
    fn unknown_zone_is_a_validation_error() {
        assert_matches!(
            parse_time_zone("Mars/Olympus_Mons"),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn resolves_sao_paulo_wall_clock() {
        let tz = parse_time_zone("America/Sao_Paulo").unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let t = resolve_local(date, NaiveTime::from_hms_opt(9, 0, 0).unwrap(), tz);
        assert_eq!(
            t.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap()
        );
        assert_eq!(hh_mm(&t), "09:00");
        assert_eq!(minutes_since_midnight(&t), 540);
    }

    #[test]
    fn spring_forward_gap_moves_one_hour_later() {
        let tz = chrono_tz::America::New_York;
        let date = NaiveDate::from_ymd_opt(2026, 3, 8).unwrap();
        let t = resolve_local(date, NaiveTime::from_hms_opt(2, 30, 0).unwrap(), tz);
        assert_eq!(hh_mm(&t), "03:30");
    }

    #[test]
    fn fall_back_ambiguity_picks_earliest() {
        let tz = chrono_tz::America::New_York;
        let date = NaiveDate::from_ymd_opt(2026, 11, 1).unwrap();
        let t = resolve_local(date, NaiveTime::from_hms_opt(1, 30, 0).unwrap(), tz);
        assert_eq!(
            t.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2026, 11, 1, 5, 30, 0).unwrap()
        );
    }
}
