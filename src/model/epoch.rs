//! Conversions between the time representations found in vendor records
//!
//! Formats stamp records either as split calendar fields (year, day of year,
//! hour, ...) or as floating-point seconds since the Unix epoch. Both are
//! converted to and from [`time::OffsetDateTime`] here.
use crate::error::{Error, Result};
use time::{Date, Duration, Month, OffsetDateTime, PrimitiveDateTime, Time};

/// Seconds since the Unix epoch
pub fn seconds(t: OffsetDateTime) -> f64 {
    t.unix_timestamp_nanos() as f64 / 1.0e9
}

/// Convert seconds since the Unix epoch to a UTC timestamp
pub fn from_seconds(s: f64) -> Result<OffsetDateTime> {
    if !s.is_finite() {
        return Err(Error::BadParameter(format!("non-finite epoch time {}", s)));
    }
    let nanos = (s * 1.0e9).round() as i128;
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .map_err(|e| Error::BadParameter(format!("epoch time {}: {}", s, e)))
}

/// Build a UTC timestamp from year, day of year and time of day
///
/// Out-of-range fields carry over (day 366 of a common year is January 1st
/// of the next) so that zeroed or slightly odd headers still yield a time.
///
/// ```
/// # use swathio::model::epoch::from_julian;
/// # fn main() -> Result<(),Box<dyn std::error::Error>> {
/// let t = from_julian(2001, 32, 12, 30, 15, 250)?;
/// assert_eq!(t.month(), time::Month::February);
/// assert_eq!(t.day(), 1);
/// assert_eq!(t.millisecond(), 250);
/// # Ok(())
/// # }
/// ```
pub fn from_julian(
    year: i32,
    jday: i32,
    hour: i32,
    minute: i32,
    second: i32,
    millis: i32,
) -> Result<OffsetDateTime> {
    let start = Date::from_calendar_date(year, Month::January, 1)
        .map_err(|e| Error::BadParameter(format!("year {}: {}", year, e)))?;
    let offset = Duration::days(jday as i64 - 1)
        + Duration::hours(hour as i64)
        + Duration::minutes(minute as i64)
        + Duration::seconds(second as i64)
        + Duration::milliseconds(millis as i64);
    PrimitiveDateTime::new(start, Time::MIDNIGHT)
        .checked_add(offset)
        .map(|t| t.assume_utc())
        .ok_or_else(|| Error::BadParameter(format!("day {} of {} out of range", jday, year)))
}

/// Split a timestamp into year, day of year, hour, minute, second and millisecond
pub fn to_julian(t: OffsetDateTime) -> (i32, i32, i32, i32, i32, i32) {
    (
        t.year(),
        t.ordinal() as i32,
        t.hour() as i32,
        t.minute() as i32,
        t.second() as i32,
        t.millisecond() as i32,
    )
}

/// Build a UTC timestamp from calendar date and time with nanoseconds
pub fn from_calendar(
    year: i32,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
    nanos: u32,
) -> Result<OffsetDateTime> {
    let month = Month::try_from(month)
        .map_err(|e| Error::BadParameter(format!("month {}: {}", month, e)))?;
    let date = Date::from_calendar_date(year, month, day)
        .map_err(|e| Error::BadParameter(format!("date {}-{}-{}: {}", year, month, day, e)))?;
    let time = Time::from_hms_nano(hour, minute, second, nanos)
        .map_err(|e| Error::BadParameter(format!("time of day: {}", e)))?;
    Ok(PrimitiveDateTime::new(date, time).assume_utc())
}

#[cfg(test)]
mod test {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_julian_round_trip() {
        let t = datetime!(1998-07-15 03:04:05.678 UTC);
        let (y, j, h, m, s, ms) = to_julian(t);
        assert_eq!((y, j), (1998, 196));
        assert_eq!(from_julian(y, j, h, m, s, ms).unwrap(), t);
    }

    #[test]
    fn test_julian_carries_over() {
        let t = from_julian(1999, 366, 0, 0, 0, 0).unwrap();
        assert_eq!(t, datetime!(2000-01-01 0:00 UTC));
    }

    #[test]
    fn test_epoch_seconds() {
        let t = from_seconds(1.5).unwrap();
        assert_eq!(t, datetime!(1970-01-01 0:00:01.5 UTC));
        assert_eq!(seconds(t), 1.5);
        assert!(from_seconds(f64::NAN).is_err());
    }

    #[test]
    fn test_calendar() {
        let t = from_calendar(2020, 2, 29, 23, 59, 59, 500_000_000).unwrap();
        assert_eq!(t, datetime!(2020-02-29 23:59:59.5 UTC));
        assert!(from_calendar(2021, 2, 29, 0, 0, 0, 0).is_err());
    }
}
