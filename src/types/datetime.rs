//! Date and time conversions.
//!
//! Binary forms count from the PostgreSQL epoch (2000-01-01): DATE as
//! days (i32), TIME/TIMESTAMP/TIMESTAMPTZ as microseconds (i64).
//! Text forms follow the ISO `DateStyle`, with a ` BC` suffix for years
//! before 1 (chrono year 0 is 1 BC).
//!
//! DATE, TIMESTAMP and TIMESTAMPTZ also have the special values
//! `infinity` and `-infinity`, stored as the extreme integers in binary.
//! They have no chrono counterpart and are carried as [`Value::Text`].
//!
//! [`Value::Text`]: super::Value::Text

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone,
    Timelike, Utc,
};

use crate::error::{Error, Result};

/// PostgreSQL epoch: 2000-01-01
const PG_EPOCH: NaiveDate = match NaiveDate::from_ymd_opt(2000, 1, 1) {
    Some(d) => d,
    None => panic!("invalid date"),
};

const USECS_PER_SEC: i64 = 1_000_000;
const USECS_PER_DAY: i64 = 86_400 * USECS_PER_SEC;

const TIME_FMT: &str = "%H:%M:%S%.f";

/// Upper special value of DATE and TIMESTAMP[TZ]
pub(crate) const INFINITY: &str = "infinity";
/// Lower special value of DATE and TIMESTAMP[TZ]
pub(crate) const NEG_INFINITY: &str = "-infinity";

/// Check if `s` is `infinity` or `-infinity`.
pub(crate) fn is_infinity(s: &str) -> bool {
    s == INFINITY || s == NEG_INFINITY
}

/// Binary DATE form of `infinity` / `-infinity`.
pub(crate) fn infinity_days(s: &str) -> i32 {
    if s == INFINITY { i32::MAX } else { i32::MIN }
}

/// Binary TIMESTAMP form of `infinity` / `-infinity`.
pub(crate) fn infinity_micros(s: &str) -> i64 {
    if s == INFINITY { i64::MAX } else { i64::MIN }
}

/// Special value stored as `days`, if any.
pub(crate) fn special_days(days: i32) -> Option<&'static str> {
    match days {
        i32::MAX => Some(INFINITY),
        i32::MIN => Some(NEG_INFINITY),
        _ => None,
    }
}

/// Special value stored as `usecs`, if any.
pub(crate) fn special_micros(usecs: i64) -> Option<&'static str> {
    match usecs {
        i64::MAX => Some(INFINITY),
        i64::MIN => Some(NEG_INFINITY),
        _ => None,
    }
}

fn pg_epoch() -> NaiveDateTime {
    PG_EPOCH.and_time(NaiveTime::MIN)
}

pub(crate) fn date_to_days(date: NaiveDate) -> Result<i32> {
    i32::try_from(date.signed_duration_since(PG_EPOCH).num_days())
        .map_err(|_| Error::Encode(format!("date out of range: {}", date)))
}

pub(crate) fn days_to_date(days: i32) -> Option<NaiveDate> {
    PG_EPOCH.checked_add_signed(TimeDelta::try_days(i64::from(days))?)
}

pub(crate) fn time_to_micros(time: NaiveTime) -> i64 {
    i64::from(time.num_seconds_from_midnight()) * USECS_PER_SEC
        + i64::from(time.nanosecond() / 1000)
}

pub(crate) fn micros_to_time(usecs: i64) -> Option<NaiveTime> {
    // 24:00:00 is valid in PostgreSQL but not in chrono
    if !(0..USECS_PER_DAY).contains(&usecs) {
        return None;
    }
    let secs = u32::try_from(usecs / USECS_PER_SEC).ok()?;
    let nano = u32::try_from((usecs % USECS_PER_SEC) * 1000).ok()?;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, nano)
}

pub(crate) fn timestamp_to_micros(ts: NaiveDateTime) -> Result<i64> {
    ts.signed_duration_since(pg_epoch())
        .num_microseconds()
        .ok_or_else(|| Error::Encode(format!("timestamp out of range: {}", ts)))
}

pub(crate) fn micros_to_timestamp(usecs: i64) -> Option<NaiveDateTime> {
    pg_epoch().checked_add_signed(TimeDelta::microseconds(usecs))
}

/// `YYYY-MM-DD` and the era suffix.
fn ymd_to_text(date: NaiveDate) -> (String, &'static str) {
    let (year, era) = if date.year() <= 0 {
        (1 - date.year(), " BC")
    } else {
        (date.year(), "")
    };
    (
        format!("{:04}-{:02}-{:02}", year, date.month(), date.day()),
        era,
    )
}

pub(crate) fn date_to_text(date: NaiveDate) -> String {
    let (ymd, era) = ymd_to_text(date);
    format!("{}{}", ymd, era)
}

pub(crate) fn time_to_text(time: NaiveTime) -> String {
    time.format(TIME_FMT).to_string()
}

pub(crate) fn timestamp_to_text(ts: NaiveDateTime) -> String {
    let (ymd, era) = ymd_to_text(ts.date());
    format!("{} {}{}", ymd, time_to_text(ts.time()), era)
}

pub(crate) fn timestamptz_to_text(ts: DateTime<Utc>) -> String {
    let naive = ts.naive_utc();
    let (ymd, era) = ymd_to_text(naive.date());
    format!("{} {}+00{}", ymd, time_to_text(naive.time()), era)
}

/// Strip the ` BC` suffix.
fn split_era(s: &str) -> (&str, bool) {
    match s.strip_suffix(" BC") {
        Some(rest) => (rest, true),
        None => (s, false),
    }
}

fn parse_ymd(s: &str, bc: bool) -> Option<NaiveDate> {
    let mut parts = s.splitn(3, '-');
    let year = parts.next()?;
    if year.is_empty() || !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = year.parse().ok()?;
    let month = parts.next()?.parse().ok()?;
    let day = parts.next()?.parse().ok()?;
    NaiveDate::from_ymd_opt(if bc { 1 - year } else { year }, month, day)
}

/// Parse `+05`, `-08:00` or `+05:30:15`.
fn parse_offset(s: &str) -> Option<FixedOffset> {
    let (sign, rest) = match s.split_at_checked(1)? {
        ("+", rest) => (1, rest),
        ("-", rest) => (-1, rest),
        _ => return None,
    };
    let parts: Vec<&str> = rest.split(':').collect();
    if parts.len() > 3 {
        return None;
    }
    let mut secs = 0;
    for (part, unit) in parts.into_iter().zip([3600, 60, 1]) {
        if part.len() != 2 {
            return None;
        }
        secs += part.parse::<i32>().ok()? * unit;
    }
    FixedOffset::east_opt(sign * secs)
}

pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    let (s, bc) = split_era(s);
    parse_ymd(s, bc)
}

pub(crate) fn parse_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, TIME_FMT).ok()
}

pub(crate) fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let (s, bc) = split_era(s);
    let (date, time) = s.split_once(' ')?;
    Some(parse_ymd(date, bc)?.and_time(parse_time(time)?))
}

/// Parse `2024-01-02 03:04:05.678+05:30`; offsets may omit minutes.
pub(crate) fn parse_timestamptz(s: &str) -> Option<DateTime<Utc>> {
    let (s, bc) = split_era(s);
    let (date, rest) = s.split_once(' ')?;
    let (time, offset) = rest.split_at_checked(rest.rfind(['+', '-'])?)?;
    let local = parse_ymd(date, bc)?.and_time(parse_time(time)?);
    let dt = parse_offset(offset)?.from_local_datetime(&local).single()?;
    Some(dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_offsets() {
        assert_eq!(date_to_days(PG_EPOCH).unwrap(), 0);
        assert_eq!(days_to_date(-1), NaiveDate::from_ymd_opt(1999, 12, 31));
        assert_eq!(days_to_date(366), NaiveDate::from_ymd_opt(2001, 1, 1));

        let ts = NaiveDate::from_ymd_opt(2000, 1, 2)
            .unwrap()
            .and_hms_micro_opt(0, 0, 1, 5)
            .unwrap();
        let usecs = timestamp_to_micros(ts).unwrap();
        assert_eq!(usecs, USECS_PER_DAY + USECS_PER_SEC + 5);
        assert_eq!(micros_to_timestamp(usecs), Some(ts));
    }

    #[test]
    fn test_time_micros() {
        let t = NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999).unwrap();
        assert_eq!(micros_to_time(time_to_micros(t)), Some(t));
        assert_eq!(micros_to_time(USECS_PER_DAY), None);
        assert_eq!(micros_to_time(-1), None);
    }

    #[test]
    fn test_text_forms() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_micro_opt(7, 8, 9, 120_000)
            .unwrap();
        assert_eq!(timestamp_to_text(ts), "2024-03-09 07:08:09.120");
        assert_eq!(parse_timestamp("2024-03-09 07:08:09.12"), Some(ts));
        assert_eq!(parse_time("07:08:09"), NaiveTime::from_hms_opt(7, 8, 9));

        let utc = parse_timestamptz("2024-03-09 12:38:09.12+05:30").unwrap();
        assert_eq!(utc.naive_utc(), ts);
        assert_eq!(
            parse_timestamptz("2024-03-09 07:08:09.12+00").unwrap().naive_utc(),
            ts
        );
        assert_eq!(
            date_to_text(NaiveDate::from_ymd_opt(10000, 1, 1).unwrap()),
            "10000-01-01"
        );
        assert!(parse_timestamptz("2024-03-09 07:08:09").is_none());
        assert!(parse_date("2024-13-01").is_none());
    }

    #[test]
    fn test_bc_dates() {
        let ides = NaiveDate::from_ymd_opt(-43, 3, 15).unwrap();
        assert_eq!(date_to_text(ides), "0044-03-15 BC");
        assert_eq!(parse_date("0044-03-15 BC"), Some(ides));

        // 1 BC is a leap year
        let leap = NaiveDate::from_ymd_opt(0, 2, 29).unwrap();
        assert_eq!(parse_date("0001-02-29 BC"), Some(leap));

        let ts = ides.and_hms_opt(10, 0, 0).unwrap();
        assert_eq!(timestamp_to_text(ts), "0044-03-15 10:00:00 BC");
        assert_eq!(parse_timestamp("0044-03-15 10:00:00 BC"), Some(ts));
        assert_eq!(
            parse_timestamptz("0044-03-15 11:00:00+01 BC").unwrap().naive_utc(),
            ts
        );
        assert_eq!(
            timestamptz_to_text(Utc.from_utc_datetime(&ts)),
            "0044-03-15 10:00:00+00 BC"
        );
    }

    #[test]
    fn test_special_values() {
        assert!(is_infinity("infinity"));
        assert!(is_infinity("-infinity"));
        assert!(!is_infinity("Infinity"));
        assert_eq!(special_days(infinity_days(INFINITY)), Some(INFINITY));
        assert_eq!(special_days(infinity_days(NEG_INFINITY)), Some(NEG_INFINITY));
        assert_eq!(special_micros(infinity_micros(INFINITY)), Some(INFINITY));
        assert_eq!(special_micros(0), None);
    }
}
