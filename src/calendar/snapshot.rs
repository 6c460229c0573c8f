//! The local mirror of one calendar: its events and its sync cursor

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::event::EventRecord;
use crate::provider::report::ChangeCount;

/// The local mirror of a single remote calendar
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CalendarSnapshot {
    /// Opaque cursor for the next incremental listing. Empty means a full listing is required.
    #[serde(default)]
    sync_cursor: String,
    #[serde(default)]
    events: HashMap<String, EventRecord>,
}

impl CalendarSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sync_cursor(&self) -> &str {
        &self.sync_cursor
    }

    pub fn needs_full_sync(&self) -> bool {
        self.sync_cursor.is_empty()
    }

    pub fn events(&self) -> &HashMap<String, EventRecord> {
        &self.events
    }

    pub fn get(&self, event_id: &str) -> Option<&EventRecord> {
        self.events.get(event_id)
    }

    /// Apply a set of remote changes: cancelled events are removed, others are inserted or replaced
    pub fn apply_changes(&mut self, events: Vec<EventRecord>) -> ChangeCount {
        let mut count = ChangeCount::default();
        for event in events {
            if event.is_cancelled() {
                if self.events.remove(event.id()).is_some() {
                    count.deleted += 1;
                }
                continue;
            }
            self.events.insert(event.id().to_string(), event);
            count.upserted += 1;
        }
        count
    }

    /// Replace every event with the result of a full listing
    pub fn replace_all(&mut self, events: Vec<EventRecord>) -> ChangeCount {
        let previous: Vec<String> = self.events.drain().map(|(id, _)| id).collect();
        let mut count = self.apply_changes(events);
        count.deleted = previous.iter()
            .filter(|id| self.events.contains_key(id.as_str()) == false)
            .count();
        count
    }

    /// Keep `cursor` for the next incremental listing, unless it is empty
    pub fn adopt_cursor(&mut self, cursor: &str) {
        if cursor.is_empty() == false {
            self.sync_cursor = cursor.to_string();
        }
    }

    /// Forget the cursor, so that the next sync performs a full listing
    pub fn invalidate_cursor(&mut self) {
        self.sync_cursor.clear();
    }
}
