//! Progress of a refresh, reported to logs and to an optional listener

use std::fmt::{Display, Error, Formatter};
use std::sync::Arc;

/// What a refresh is currently doing
#[derive(Clone, Debug, Default, PartialEq)]
pub enum SyncEvent {
    #[default]
    NotStarted,
    /// The cache has been copied, no source has been contacted yet
    Started,
    /// A calendar or a task list is being fetched
    InProgress{ source: String, details: String },
    /// `success` is `false` when the refresh failed, in which case nothing has been stored
    Finished{ success: bool },
}

impl Display for SyncEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            SyncEvent::NotStarted => write!(f, "Not started"),
            SyncEvent::Started => write!(f, "Refresh has started..."),
            SyncEvent::InProgress{source, details} => write!(f, "[{}] {}...", source, details),
            SyncEvent::Finished{ success: true } => write!(f, "Refresh successfully finished"),
            SyncEvent::Finished{ success: false } => write!(f, "Refresh failed, the cache is unchanged"),
        }
    }
}


/// See [`feedback_channel`]
pub type FeedbackSender = tokio::sync::watch::Sender<SyncEvent>;
/// See [`feedback_channel`]
pub type FeedbackReceiver = tokio::sync::watch::Receiver<SyncEvent>;

/// Create a feedback channel. Its receiver always holds the latest [`SyncEvent`] of a refresh.
pub fn feedback_channel() -> (FeedbackSender, FeedbackReceiver) {
    tokio::sync::watch::channel(SyncEvent::default())
}


/// Tracks the errors of a refresh, and forwards its steps to the feedback channel (if any)
#[derive(Default)]
pub struct SyncProgress {
    n_errors: u32,
    feedback_channel: Option<Arc<FeedbackSender>>
}
impl SyncProgress {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn new_with_feedback_channel(channel: FeedbackSender) -> Self {
        Self { n_errors: 0, feedback_channel: Some(Arc::new(channel)) }
    }

    /// A tracker for a part of the refresh that runs concurrently with others.
    ///
    /// It shares the feedback channel, its errors are counted back with [`Self::merge`]
    pub fn fork(&self) -> Self {
        Self { n_errors: 0, feedback_channel: self.feedback_channel.clone() }
    }

    pub fn merge(&mut self, other: Self) {
        self.n_errors += other.n_errors;
    }

    pub fn is_success(&self) -> bool {
        self.n_errors == 0
    }

    pub fn error(&mut self, text: &str) {
        log::error!("{}", text);
        self.n_errors += 1;
    }
    pub fn info(&mut self, text: &str) {
        log::info!("{}", text);
    }
    pub fn debug(&mut self, text: &str) {
        log::debug!("{}", text);
    }

    /// Tell the listener that `source` (a calendar or a task list) is being fetched
    pub fn step(&mut self, source: &str, details: &str) {
        log::debug!("[{}] {}", source, details);
        self.feedback(SyncEvent::InProgress{ source: source.to_string(), details: details.to_string() });
    }

    /// Send the final event, according to the errors seen so far
    pub fn finish(&mut self) {
        let success = self.is_success();
        self.feedback(SyncEvent::Finished{ success });
    }

    /// Send an event to the listener, if any
    pub fn feedback(&mut self, event: SyncEvent) {
        if let Some(sender) = &self.feedback_channel {
            // Nobody listening is fine
            let _ = sender.send(event);
        }
    }
}
