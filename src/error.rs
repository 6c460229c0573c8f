//! Errors returned by this crate, and by the remote sources it reads from

use std::path::PathBuf;

use thiserror::Error;

/// An error reported by a [`CalendarProvider`](crate::traits::CalendarProvider) or a [`TaskProvider`](crate::traits::TaskProvider)
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The sync cursor is not accepted anymore: the caller must fall back to a full listing
    #[error("sync cursor has expired: {0}")]
    CursorExpired(String),
    /// Any other (usually transient) failure
    #[error("request failed: {0}")]
    Request(String),
}

impl ProviderError {
    pub fn is_cursor_expired(&self) -> bool {
        matches!(self, ProviderError::CursorExpired(_))
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("unable to list calendars: {0}")]
    CalendarList(#[source] ProviderError),

    #[error("unable to sync calendar {calendar_id}: {source}")]
    Calendar {
        calendar_id: String,
        #[source]
        source: ProviderError,
    },

    #[error("unable to sync task list {list_id}: {source}")]
    TaskList {
        list_id: String,
        #[source]
        source: ProviderError,
    },

    #[error("I/O error with {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to (de)serialize: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// The cache has never been synced, so there is nothing to show
    #[error("no synced data is available yet")]
    Unavailable,

    #[error("background refresh did not complete: {0}")]
    Join(String),
}

impl SyncError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::Io { path: path.into(), source }
    }

    /// The provider error this sync error originates from, if any
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            SyncError::CalendarList(err) => Some(err),
            SyncError::Calendar { source, .. } => Some(source),
            SyncError::TaskList { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
