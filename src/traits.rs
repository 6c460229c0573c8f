//! The remote sources this crate mirrors

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::calendar::{CalendarInfo, EventPage};
use crate::error::ProviderError;
use crate::task::RemoteTask;

/// A remote source of calendar events (e.g. a calendar API client)
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Every calendar of the account
    async fn list_calendars(&self) -> Result<Vec<CalendarInfo>, ProviderError>;

    /// Every event of a calendar, and a cursor to ask for changes later on
    async fn list_all_events(&self, calendar_id: &str) -> Result<EventPage, ProviderError>;

    /// The events that changed since `cursor` was issued (including cancelled ones), and a new cursor.
    ///
    /// Must return [`ProviderError::CursorExpired`] when `cursor` is not valid anymore.
    async fn list_events_since(&self, calendar_id: &str, cursor: &str) -> Result<EventPage, ProviderError>;
}

/// A remote source of tasks (e.g. a task API client)
#[async_trait]
pub trait TaskProvider: Send + Sync {
    /// Tasks of a list that have been updated at or after `updated_since` (or every task when it is `None`),
    /// including completed and deleted ones
    async fn list_tasks(&self, list_id: &str, updated_since: Option<DateTime<Utc>>) -> Result<Vec<RemoteTask>, ProviderError>;
}
