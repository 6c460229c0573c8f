//! Calendar events

use chrono::{DateTime, Duration};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::annotation::Annotations;
use crate::time::DateOrTime;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Confirmed,
    Tentative,
    /// The event has been deleted (or declined). Remote sources report deletions this way.
    Cancelled,
}

impl Default for EventStatus {
    fn default() -> Self {
        EventStatus::Confirmed
    }
}

/// A calendar event, as mirrored from a remote calendar
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    id: String,
    #[serde(default)]
    summary: String,
    /// Remote deletions may come without any date
    #[serde(default)]
    start: Option<DateOrTime>,
    #[serde(default)]
    end: Option<DateOrTime>,
    #[serde(default)]
    status: EventStatus,
    /// Free-text description, that may link this event to a task
    #[serde(default)]
    description: Annotations,
}

impl EventRecord {
    pub fn new(id: &str, summary: &str, start: DateOrTime, end: DateOrTime) -> Self {
        Self {
            id: id.to_string(),
            summary: summary.to_string(),
            start: Some(start),
            end: Some(end),
            status: EventStatus::Confirmed,
            description: Annotations::new(),
        }
    }

    /// A deletion marker, as returned by incremental listings
    pub fn cancelled(id: &str) -> Self {
        Self {
            id: id.to_string(),
            summary: String::new(),
            start: None,
            end: None,
            status: EventStatus::Cancelled,
            description: Annotations::new(),
        }
    }

    pub fn with_status(mut self, status: EventStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_description(mut self, description: Annotations) -> Self {
        self.description = description;
        self
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn summary(&self) -> &str { &self.summary }
    pub fn start(&self) -> Option<&DateOrTime> { self.start.as_ref() }
    pub fn end(&self) -> Option<&DateOrTime> { self.end.as_ref() }
    pub fn status(&self) -> EventStatus { self.status }
    pub fn description(&self) -> &Annotations { &self.description }

    pub fn is_cancelled(&self) -> bool {
        self.status == EventStatus::Cancelled
    }

    pub fn is_all_day(&self) -> bool {
        self.start.map(|s| s.is_date()).unwrap_or(false)
    }

    /// The task this event has been scheduled for, if any
    pub fn linked_task_id(&self) -> Option<&str> {
        self.description.linked_task_id()
    }

    /// The `[start, end)` interval of this event in `tz`.
    ///
    /// All-day events span whole local days. A missing end is read as a one-day (all-day) or zero-length (timed) event.
    /// Returns `None` for events without a start.
    pub fn interval_in(&self, tz: &Tz) -> Option<(DateTime<Tz>, DateTime<Tz>)> {
        let start = self.start?;
        let begin = start.instant_in(tz);
        let end = match (self.end, start) {
            (Some(end), _) => end.instant_in(tz),
            (None, DateOrTime::Date(date)) => {
                let next_day = date.succ_opt()?;
                DateOrTime::Date(next_day).instant_in(tz)
            },
            (None, DateOrTime::DateTime(_)) => begin,
        };
        Some((begin, end.max(begin)))
    }

    /// Length of this event, if it has both ends
    pub fn duration(&self, tz: &Tz) -> Option<Duration> {
        self.end?;
        self.interval_in(tz).map(|(start, end)| end - start)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Timelike, Utc};
    use crate::annotation::Key;

    #[test]
    fn serde_defaults() {
        let event: EventRecord = serde_json::from_str(r#"{"id": "gone", "status": "cancelled"}"#).unwrap();
        assert_eq!(event, EventRecord::cancelled("gone"));

        let event: EventRecord = serde_json::from_str(
            r#"{"id": "e1", "summary": "Standup", "start": {"date": "2026-01-05"}, "end": {"date": "2026-01-06"},
                "description": "notes\njustdoit_task_id=t1"}"#
        ).unwrap();
        assert!(event.is_all_day());
        assert_eq!(event.status(), EventStatus::Confirmed);
        assert_eq!(event.linked_task_id(), Some("t1"));
        assert_eq!(event.description().text(), "notes");
    }

    #[test]
    fn intervals() {
        let tz: Tz = "Europe/Madrid".parse().unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let all_day = EventRecord::cancelled("x").with_status(EventStatus::Confirmed);
        assert_eq!(all_day.interval_in(&tz), None);

        let mut all_day = EventRecord::new("a", "Holiday", day.into(), day.into());
        all_day.end = None;
        let (start, end) = all_day.interval_in(&tz).unwrap();
        assert_eq!(end - start, Duration::days(1));
        assert_eq!(start.hour(), 0);

        let timed = EventRecord::new(
            "t", "Call",
            Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap().into(),
            Utc.with_ymd_and_hms(2026, 1, 5, 9, 45, 0).unwrap().into(),
        ).with_description(Annotations::new().with(Key::TaskId, "t9"));
        assert_eq!(timed.duration(&tz), Some(Duration::minutes(45)));
        assert_eq!(timed.interval_in(&tz).unwrap().0.hour(), 10);
        assert_eq!(timed.linked_task_id(), Some("t9"));
    }
}
