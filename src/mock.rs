//! In-memory calendar and task sources, that can be used in place of real remote services (mainly in tests)
//!
//! Their failures can be scripted with a [`MockBehaviour`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Notify;

use crate::calendar::{CalendarInfo, EventPage};
use crate::error::ProviderError;
use crate::event::EventRecord;
use crate::mock_behaviour::MockBehaviour;
use crate::task::{RemoteTask, TaskEntry};
use crate::traits::{CalendarProvider, TaskProvider};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct MockCalendar {
    name: String,
    primary: bool,
    events: BTreeMap<String, EventRecord>,
    /// Every change, in order, with its sequence number
    changes: Vec<(u64, EventRecord)>,
}

/// A calendar source that keeps its events in memory.
///
/// Cursors look like `<epoch>:<sequence>`. [`Self::expire_cursors`] starts a new epoch, which makes every
/// cursor issued before invalid.
#[derive(Default)]
pub struct MockCalendarProvider {
    calendars: Mutex<BTreeMap<String, MockCalendar>>,
    sequence: AtomicU64,
    epoch: AtomicU64,
    behaviour: Arc<Mutex<MockBehaviour>>,
    /// When set, `list_calendars` waits for this to be notified
    gate: Mutex<Option<Arc<Notify>>>,

    full_listings: AtomicUsize,
    incremental_listings: AtomicUsize,
}

impl MockCalendarProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Share a behaviour with the test, so that it can be changed later on
    pub fn with_behaviour(mut self, behaviour: Arc<Mutex<MockBehaviour>>) -> Self {
        self.behaviour = behaviour;
        self
    }

    pub fn add_calendar(&self, id: &str, name: &str, primary: bool) {
        let mut calendars = lock(&self.calendars);
        let calendar = calendars.entry(id.to_string()).or_default();
        calendar.name = name.to_string();
        calendar.primary = primary;
    }

    /// Insert or replace an event
    pub fn add_event(&self, calendar_id: &str, event: EventRecord) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let mut calendars = lock(&self.calendars);
        let calendar = calendars.entry(calendar_id.to_string()).or_default();
        calendar.events.insert(event.id().to_string(), event.clone());
        calendar.changes.push((seq, event));
    }

    /// Delete an event. Incremental listings report it as cancelled.
    pub fn remove_event(&self, calendar_id: &str, event_id: &str) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let mut calendars = lock(&self.calendars);
        let calendar = calendars.entry(calendar_id.to_string()).or_default();
        calendar.events.remove(event_id);
        calendar.changes.push((seq, EventRecord::cancelled(event_id)));
    }

    /// Make every cursor issued so far invalid
    pub fn expire_cursors(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }

    /// Make `list_calendars` wait until `gate` is notified
    pub fn hold_on(&self, gate: Arc<Notify>) {
        *lock(&self.gate) = Some(gate);
    }

    pub fn full_listings(&self) -> usize {
        self.full_listings.load(Ordering::SeqCst)
    }

    pub fn incremental_listings(&self) -> usize {
        self.incremental_listings.load(Ordering::SeqCst)
    }

    fn cursor(&self) -> String {
        format!("{}:{}", self.epoch.load(Ordering::SeqCst), self.sequence.load(Ordering::SeqCst))
    }

    fn parse_cursor(&self, cursor: &str) -> Result<u64, ProviderError> {
        let expired = || ProviderError::CursorExpired(format!("cursor {:?} is not valid anymore", cursor));
        let (epoch, seq) = cursor.split_once(':').ok_or_else(expired)?;
        let epoch: u64 = epoch.parse().map_err(|_| expired())?;
        if epoch != self.epoch.load(Ordering::SeqCst) {
            return Err(expired());
        }
        seq.parse().map_err(|_| expired())
    }
}

#[async_trait]
impl CalendarProvider for MockCalendarProvider {
    async fn list_calendars(&self) -> Result<Vec<CalendarInfo>, ProviderError> {
        let gate = lock(&self.gate).take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        lock(&self.behaviour).can_list_calendars()?;

        Ok(lock(&self.calendars).iter()
            .map(|(id, calendar)| CalendarInfo::new(id, &calendar.name, calendar.primary))
            .collect())
    }

    async fn list_all_events(&self, calendar_id: &str) -> Result<EventPage, ProviderError> {
        lock(&self.behaviour).can_list_all_events()?;
        self.full_listings.fetch_add(1, Ordering::SeqCst);

        let cursor = self.cursor();
        let calendars = lock(&self.calendars);
        let events = calendars.get(calendar_id)
            .map(|calendar| calendar.events.values().cloned().collect())
            .unwrap_or_default();
        Ok(EventPage::new(events, &cursor))
    }

    async fn list_events_since(&self, calendar_id: &str, cursor: &str) -> Result<EventPage, ProviderError> {
        lock(&self.behaviour).can_list_events_since()?;
        let since = self.parse_cursor(cursor)?;
        self.incremental_listings.fetch_add(1, Ordering::SeqCst);

        let new_cursor = self.cursor();
        let calendars = lock(&self.calendars);
        // Only the latest change of each event is reported
        let mut latest: BTreeMap<&str, &EventRecord> = BTreeMap::new();
        if let Some(calendar) = calendars.get(calendar_id) {
            for (seq, event) in &calendar.changes {
                if *seq > since {
                    latest.insert(event.id(), event);
                }
            }
        }
        Ok(EventPage::new(latest.into_values().cloned().collect(), &new_cursor))
    }
}


/// A task source that keeps its tasks in memory
#[derive(Default)]
pub struct MockTaskProvider {
    lists: Mutex<BTreeMap<String, BTreeMap<String, RemoteTask>>>,
    behaviour: Arc<Mutex<MockBehaviour>>,
    /// Every `updated_since` that has been requested, per list
    requests: Mutex<Vec<(String, Option<DateTime<Utc>>)>>,
}

impl MockTaskProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behaviour(mut self, behaviour: Arc<Mutex<MockBehaviour>>) -> Self {
        self.behaviour = behaviour;
        self
    }

    /// Insert or replace a task. Set its `updated` date to control which listings return it.
    pub fn add_task(&self, list_id: &str, task: TaskEntry) {
        let mut lists = lock(&self.lists);
        lists.entry(list_id.to_string()).or_default()
            .insert(task.id().to_string(), RemoteTask::live(task));
    }

    /// Mark a task as deleted at `when`
    pub fn delete_task(&self, list_id: &str, task_id: &str, when: DateTime<Utc>) {
        let tombstone = RemoteTask {
            entry: TaskEntry::new(task_id, "").with_updated(when),
            deleted: true,
        };
        let mut lists = lock(&self.lists);
        lists.entry(list_id.to_string()).or_default()
            .insert(task_id.to_string(), tombstone);
    }

    pub fn requests(&self) -> Vec<(String, Option<DateTime<Utc>>)> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl TaskProvider for MockTaskProvider {
    async fn list_tasks(&self, list_id: &str, updated_since: Option<DateTime<Utc>>) -> Result<Vec<RemoteTask>, ProviderError> {
        lock(&self.behaviour).can_list_tasks()?;
        lock(&self.requests).push((list_id.to_string(), updated_since));

        let lists = lock(&self.lists);
        let tasks = match lists.get(list_id) {
            None => return Ok(Vec::new()),
            Some(tasks) => tasks,
        };
        Ok(tasks.values()
            .filter(|task| match (updated_since, task.entry.updated()) {
                (Some(since), Some(updated)) => updated >= since,
                _ => true,
            })
            .cloned()
            .collect())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(id: &str, summary: &str) -> EventRecord {
        let start = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap();
        EventRecord::new(id, summary, start.into(), end.into())
    }

    #[tokio::test]
    async fn incremental_listings() {
        let provider = MockCalendarProvider::new();
        provider.add_event("cal", event("a", "A"));
        let page = provider.list_all_events("cal").await.unwrap();
        assert_eq!(page.events.len(), 1);

        provider.add_event("cal", event("b", "B"));
        provider.add_event("cal", event("b", "B2"));
        provider.remove_event("cal", "a");
        let changes = provider.list_events_since("cal", &page.cursor).await.unwrap();
        let summary: Vec<(&str, bool)> = changes.events.iter().map(|e| (e.summary(), e.is_cancelled())).collect();
        assert_eq!(summary, vec![("", true), ("B2", false)]);

        let nothing = provider.list_events_since("cal", &changes.cursor).await.unwrap();
        assert!(nothing.events.is_empty());

        provider.expire_cursors();
        let err = provider.list_events_since("cal", &nothing.cursor).await.unwrap_err();
        assert!(err.is_cursor_expired());
        assert!(provider.list_events_since("cal", "garbage").await.unwrap_err().is_cursor_expired());
    }

    #[tokio::test]
    async fn task_watermarks() {
        let provider = MockTaskProvider::new();
        let t = |h: u32| Utc.with_ymd_and_hms(2026, 1, 5, h, 0, 0).unwrap();
        provider.add_task("l", TaskEntry::new("old", "Old").with_updated(t(8)));
        provider.add_task("l", TaskEntry::new("new", "New").with_updated(t(10)));
        provider.delete_task("l", "gone", t(11));

        assert_eq!(provider.list_tasks("l", None).await.unwrap().len(), 3);
        let recent = provider.list_tasks("l", Some(t(10))).await.unwrap();
        let ids: Vec<(&str, bool)> = recent.iter().map(|t| (t.entry.id(), t.deleted)).collect();
        assert_eq!(ids, vec![("gone", true), ("new", false)]);
        assert_eq!(provider.requests().len(), 2);
    }
}
