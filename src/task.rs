//! To-do tasks, as mirrored from a remote task list

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::annotation::{Annotations, Key};
use crate::event::EventRecord;
use crate::recurrence::{parse_expression, Rule};
use crate::time::{local_datetime, DateOrTime};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatus {
    NeedsAction,
    Completed,
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::NeedsAction
    }
}

/// A task of a task list
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskEntry {
    id: String,
    #[serde(default)]
    title: String,
    /// Free-text notes, that may carry a link to an event, a recurrence rule or a section marker
    #[serde(default)]
    notes: Annotations,
    /// The parent task (usually a section marker)
    #[serde(default)]
    parent: Option<String>,
    #[serde(default)]
    status: TaskStatus,
    #[serde(default)]
    due: Option<DateOrTime>,
    /// Last time this task was modified on the remote side
    #[serde(default)]
    updated: Option<DateTime<Utc>>,
}

impl TaskEntry {
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            notes: Annotations::new(),
            parent: None,
            status: TaskStatus::NeedsAction,
            due: None,
            updated: None,
        }
    }

    pub fn with_notes(mut self, notes: Annotations) -> Self {
        self.notes = notes;
        self
    }

    pub fn with_parent(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_string());
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_due(mut self, due: DateOrTime) -> Self {
        self.due = Some(due);
        self
    }

    pub fn with_updated(mut self, updated: DateTime<Utc>) -> Self {
        self.updated = Some(updated);
        self
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn title(&self) -> &str { &self.title }
    pub fn notes(&self) -> &Annotations { &self.notes }
    pub fn parent(&self) -> Option<&str> { self.parent.as_deref() }
    pub fn status(&self) -> TaskStatus { self.status }
    pub fn due(&self) -> Option<&DateOrTime> { self.due.as_ref() }
    pub fn updated(&self) -> Option<DateTime<Utc>> { self.updated }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Section markers only group other tasks: they are not actual work
    pub fn is_section_marker(&self) -> bool {
        self.notes.is_section_marker()
    }

    /// The event that schedules this task, if any
    pub fn linked_event_id(&self) -> Option<&str> {
        self.notes.linked_event_id()
    }

    /// The local date this task is due on
    pub fn due_date_in(&self, tz: &Tz) -> Option<NaiveDate> {
        self.due.map(|due| due.date_in(tz))
    }

    /// The recurrence rule stored in the notes, if it can be understood
    pub fn recurrence(&self) -> Option<Rule> {
        self.notes.rrule().and_then(parse_expression)
    }

    /// Plan the instance that should replace this recurring task once it is completed.
    ///
    /// The series is anchored on the start of `linked_event` when there is one (the new instance then gets a time block
    /// of the same length), or on the due date otherwise (the new instance is then due at 23:59 on its day).
    /// Returns `None` when this task does not recur, or when its rule has no further occurrence.
    pub fn next_instance(&self, linked_event: Option<&EventRecord>, now: DateTime<Utc>, tz: &Tz) -> Option<NextInstance> {
        let rule_text = self.notes.rrule()?;
        let rule = parse_expression(rule_text)?;

        let (anchor, duration) = self.timing(linked_event, tz);
        let anchor = anchor.unwrap_or_else(|| now.with_timezone(tz));
        let next = rule.next_after(&anchor, &now.with_timezone(tz))?;

        let (due, time_block) = if duration > Duration::zero() {
            let end = next + duration;
            (end, Some((next, end)))
        } else {
            let end_of_day = NaiveTime::from_hms_opt(23, 59, 0).unwrap_or(NaiveTime::MIN);
            (local_datetime(next.date_naive(), end_of_day, tz), None)
        };

        let notes = self.notes.without_entries().with(Key::Rrule, rule_text);
        log::debug!("Next instance of {:?} is due {}", self.title, due);

        Some(NextInstance {
            title: self.title.clone(),
            notes,
            parent: self.parent.clone(),
            due,
            time_block,
        })
    }

    fn timing(&self, linked_event: Option<&EventRecord>, tz: &Tz) -> (Option<DateTime<Tz>>, Duration) {
        if let Some((start, end)) = linked_event.and_then(|ev| ev.interval_in(tz)) {
            if end > start {
                return (Some(start), end - start);
            }
        }
        (self.due.map(|due| due.instant_in(tz)), Duration::zero())
    }
}

/// A task as returned by a remote listing: deletions are reported explicitly
#[derive(Clone, Debug, PartialEq)]
pub struct RemoteTask {
    pub entry: TaskEntry,
    pub deleted: bool,
}

impl RemoteTask {
    pub fn live(entry: TaskEntry) -> Self {
        Self { entry, deleted: false }
    }

    pub fn deleted(id: &str) -> Self {
        Self { entry: TaskEntry::new(id, ""), deleted: true }
    }
}

/// What an external task creator needs to enqueue the next instance of a recurring task
#[derive(Clone, Debug, PartialEq)]
pub struct NextInstance {
    pub title: String,
    /// The original notes, without links, with the recurrence rule
    pub notes: Annotations,
    pub parent: Option<String>,
    pub due: DateTime<Tz>,
    /// When the completed task was scheduled as an event, the time block of the next one
    pub time_block: Option<(DateTime<Tz>, DateTime<Tz>)>,
}
