//! Calendars: how remote sources describe them, and the local snapshot of their events

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::event::EventRecord;

pub mod snapshot;
pub use snapshot::CalendarSnapshot;

/// What we remember about a calendar, apart from its events
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub primary: bool,
}

/// A calendar, as listed by a [`CalendarProvider`](crate::traits::CalendarProvider)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CalendarInfo {
    pub id: String,
    pub name: String,
    pub primary: bool,
}

impl CalendarInfo {
    pub fn new(id: &str, name: &str, primary: bool) -> Self {
        Self { id: id.to_string(), name: name.to_string(), primary }
    }
}

/// The result of an event listing
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventPage {
    /// Changed events. Deleted events are reported with a `cancelled` status.
    pub events: Vec<EventRecord>,
    /// The cursor to use for the next incremental listing. Empty when the source did not provide one.
    pub cursor: String,
}

impl EventPage {
    pub fn new(events: Vec<EventRecord>, cursor: &str) -> Self {
        Self { events, cursor: cursor.to_string() }
    }
}

/// Every calendar the cache knows about
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CalendarStore {
    /// Metadata of every calendar of the account, as returned by the last listing
    #[serde(default)]
    pub calendar_meta: HashMap<String, CalendarMeta>,
    /// Events of the calendars that are synced
    #[serde(default)]
    pub calendars: HashMap<String, CalendarSnapshot>,
}

impl CalendarStore {
    /// Replace the metadata with a fresh calendar listing
    pub fn replace_meta(&mut self, calendars: &[CalendarInfo]) {
        self.calendar_meta = calendars.iter()
            .map(|cal| (cal.id.clone(), CalendarMeta { name: cal.name.clone(), primary: cal.primary }))
            .collect();
    }

    /// Drop the events of every calendar that is not in `calendar_ids`, and return their ids
    pub fn retain_calendars(&mut self, calendar_ids: &[String]) -> Vec<String> {
        let mut forgotten: Vec<String> = self.calendars.keys()
            .filter(|id| calendar_ids.contains(id) == false)
            .cloned()
            .collect();
        forgotten.sort();
        for id in &forgotten {
            self.calendars.remove(id);
        }
        forgotten
    }

    /// The display name of a calendar (its id when it is unknown)
    pub fn name_of<'a>(&'a self, calendar_id: &'a str) -> &'a str {
        match self.calendar_meta.get(calendar_id) {
            Some(meta) if meta.name.is_empty() == false => &meta.name,
            _ => calendar_id,
        }
    }

    /// The id of the primary calendar, if the account has one
    pub fn primary_id(&self) -> Option<&str> {
        self.calendar_meta.iter()
            .find(|(_, meta)| meta.primary)
            .map(|(id, _)| id.as_str())
    }

    pub fn get(&self, calendar_id: &str) -> Option<&CalendarSnapshot> {
        self.calendars.get(calendar_id)
    }
}
