//! This crate keeps a local mirror of remote calendars and task lists, and turns it into week views.
//!
//! Remote services are abstracted behind the [`CalendarProvider`](traits::CalendarProvider) and
//! [`TaskProvider`](traits::TaskProvider) traits. A local, durable [`Cache`](cache::Cache) stores what they return,
//! so that a user-friendly app can display a week right away on startup, before the remote services answer.
//!
//! A [`Provider`](provider::Provider) refreshes the cache incrementally (sync cursors for calendars, watermarks for
//! task lists) and builds [`WeekViewData`](week::WeekViewData) out of it. \
//! The scheduling algorithms it relies on ([`schedule`]) and the recurrence rules of repeating tasks ([`recurrence`])
//! can be used as stand-alone modules.

pub mod traits;
pub mod error;
pub use error::{ProviderError, SyncError, SyncResult};

pub mod annotation;
pub mod time;
pub mod event;
pub use event::EventRecord;
pub mod task;
pub use task::TaskEntry;
pub mod calendar;
pub mod task_list;

pub mod recurrence;
pub mod schedule;
pub mod week;
pub use week::WeekViewData;

pub mod cache;
pub use cache::Cache;
pub mod provider;
pub use provider::Provider;

pub mod config;
pub mod mock_behaviour;
pub mod mock;
pub mod utils;
