//! What a refresh changed

use std::collections::BTreeMap;
use std::fmt::{Display, Error, Formatter};

use chrono::{DateTime, Utc};

/// How many entries a batch of remote changes touched
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChangeCount {
    pub upserted: usize,
    pub deleted: usize,
}

impl ChangeCount {
    pub fn total(&self) -> usize {
        self.upserted + self.deleted
    }
}

impl std::ops::AddAssign for ChangeCount {
    fn add_assign(&mut self, other: Self) {
        self.upserted += other.upserted;
        self.deleted += other.deleted;
    }
}

impl Display for ChangeCount {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{} upserted, {} deleted", self.upserted, self.deleted)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CalendarSyncReport {
    pub changes: BTreeMap<String, ChangeCount>,
    /// Calendars that have been listed from scratch, because they had no cursor or their cursor expired
    pub full_resyncs: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaskSyncReport {
    pub changes: BTreeMap<String, ChangeCount>,
}

/// The result of a complete refresh, once it has been saved
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncSummary {
    pub synced_at: DateTime<Utc>,
    pub calendars: CalendarSyncReport,
    pub tasks: TaskSyncReport,
}

impl SyncSummary {
    pub fn total_changes(&self) -> ChangeCount {
        let mut total = ChangeCount::default();
        for count in self.calendars.changes.values().chain(self.tasks.changes.values()) {
            total += *count;
        }
        total
    }
}

/// What a call to [`Provider::refresh`](crate::provider::Provider::refresh) did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    Done(SyncSummary),
    /// Another refresh was running, this one did nothing
    AlreadyInProgress,
}

impl SyncOutcome {
    pub fn summary(&self) -> Option<&SyncSummary> {
        match self {
            SyncOutcome::Done(summary) => Some(summary),
            SyncOutcome::AlreadyInProgress => None,
        }
    }
}
