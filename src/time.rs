//! Dates, instants, and the bits of calendar arithmetic shared by the whole crate

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// The start or end of an event, or the due date of a task.
///
/// All-day values only carry a date. Timed values carry an instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateOrTime {
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
}

impl DateOrTime {
    pub fn is_date(&self) -> bool {
        matches!(self, DateOrTime::Date(_))
    }

    /// The calendar date this value falls on, as seen in `tz`
    pub fn date_in(&self, tz: &Tz) -> NaiveDate {
        match self {
            DateOrTime::Date(date) => *date,
            DateOrTime::DateTime(instant) => instant.with_timezone(tz).date_naive(),
        }
    }

    /// The instant this value designates. Dates start at local midnight.
    pub fn instant_in(&self, tz: &Tz) -> DateTime<Tz> {
        match self {
            DateOrTime::Date(date) => local_datetime(*date, NaiveTime::MIN, tz),
            DateOrTime::DateTime(instant) => instant.with_timezone(tz),
        }
    }
}

impl From<NaiveDate> for DateOrTime {
    fn from(date: NaiveDate) -> Self {
        DateOrTime::Date(date)
    }
}

impl From<DateTime<Utc>> for DateOrTime {
    fn from(instant: DateTime<Utc>) -> Self {
        DateOrTime::DateTime(instant)
    }
}

/// Resolve a wall-clock time in `tz`.
///
/// Ambiguous times (DST fall-back) resolve to the earliest instant. Times that do not exist
/// (DST spring-forward gap) are moved one hour later.
pub fn local_datetime(date: NaiveDate, time: NaiveTime, tz: &Tz) -> DateTime<Tz> {
    let naive = date.and_time(time);
    if let Some(dt) = tz.from_local_datetime(&naive).earliest() {
        return dt;
    }
    let shifted = naive + Duration::hours(1);
    match tz.from_local_datetime(&shifted).earliest() {
        Some(dt) => dt,
        None => tz.from_utc_datetime(&naive),
    }
}

/// The Monday of the week containing `day`
pub fn week_start(day: NaiveDate) -> NaiveDate {
    day - Duration::days(day.weekday().num_days_from_monday() as i64)
}
