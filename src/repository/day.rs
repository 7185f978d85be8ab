//! Local calendar-day normalization.

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};

use crate::types::TimestampMs;

/// Bounds of one local calendar day.
///
/// `start` is 00:00:00.000 and `end` is 23:59:59.999 of the same date.
/// Range queries treat `end` as exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayRange {
    /// Local midnight.
    pub start: TimestampMs,
    /// Last millisecond of the day.
    pub end: TimestampMs,
}

impl DayRange {
    /// Day containing `instant` in the system time zone.
    pub fn containing(instant: TimestampMs) -> Self {
        Self::containing_in(instant, &Local)
    }

    /// Day containing `instant` in `tz`.
    pub fn containing_in<Tz: TimeZone>(instant: TimestampMs, tz: &Tz) -> Self {
        let Some(utc) = DateTime::<Utc>::from_timestamp_millis(instant) else {
            // Outside chrono's representable range.
            return Self {
                start: instant,
                end: instant,
            };
        };
        let date = utc.with_timezone(tz).date_naive();

        let start = start_of_day(date, tz).unwrap_or(instant);
        let end = date
            .succ_opt()
            .and_then(|next| start_of_day(next, tz))
            .map(|next_start| next_start - 1)
            .unwrap_or(start);
        Self { start, end }
    }

    /// True when `timestamp` falls in `[start, end)`.
    pub fn contains(&self, timestamp: TimestampMs) -> bool {
        timestamp >= self.start && timestamp < self.end
    }
}

/// First valid instant of `date` in `tz`; skips forward over a DST gap at midnight.
fn start_of_day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Option<TimestampMs> {
    let midnight = date.and_time(NaiveTime::MIN);
    (0..=24).find_map(|hours| {
        tz.from_local_datetime(&(midnight + TimeDelta::hours(hours)))
            .earliest()
            .map(|dt| dt.timestamp_millis())
    })
}
