//! This module keeps the local cache in sync with the remote calendars and task lists
//!
//! It also serves week views, from the cache first, then from refreshed data.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::cache::Cache;
use crate::calendar::{CalendarStore, EventPage};
use crate::config::{Settings, ViewSettings};
use crate::error::{SyncError, SyncResult};
use crate::task_list::TaskStore;
use crate::traits::{CalendarProvider, TaskProvider};
use crate::week::WeekViewData;

pub mod report;
use report::{CalendarSyncReport, SyncOutcome, SyncSummary, TaskSyncReport};

pub mod sync_progress;
use sync_progress::SyncProgress;
use sync_progress::{FeedbackSender, SyncEvent};

/// Where the current time comes from. Tests can pin it with [`Provider::with_clock`]
pub type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;


/// Refresh the calendars `calendar_ids` of `store`.
///
/// Calendars that have a sync cursor only fetch what changed since. When the provider reports their cursor has
/// expired (and only then), every event is listed again, so that the result is the same as a sync from scratch.
/// Any other provider error is returned as is: the caller is expected to discard `store`.
pub async fn refresh_calendars<C>(store: &mut CalendarStore, calendar_ids: &[String], provider: &C, progress: &mut SyncProgress) -> SyncResult<CalendarSyncReport>
where
    C: CalendarProvider + ?Sized,
{
    let infos = provider.list_calendars().await.map_err(SyncError::CalendarList)?;
    store.replace_meta(&infos);
    for forgotten in store.retain_calendars(calendar_ids) {
        progress.info(&format!("Calendar {} is not shown anymore, dropping its events", forgotten));
    }

    let mut report = CalendarSyncReport::default();
    for calendar_id in calendar_ids {
        let name = store.name_of(calendar_id).to_string();
        let snapshot = store.calendars.entry(calendar_id.clone()).or_default();

        let (count, cursor, full) = if snapshot.needs_full_sync() {
            progress.step(&name, "listing every event");
            let page = list_all_events(provider, calendar_id).await?;
            (snapshot.replace_all(page.events), page.cursor, true)
        } else {
            progress.step(&name, "fetching changes");
            let changes = provider.list_events_since(calendar_id, snapshot.sync_cursor()).await;
            match changes {
                Ok(page) => (snapshot.apply_changes(page.events), page.cursor, false),
                Err(err) if err.is_cursor_expired() => {
                    progress.info(&format!("Sync cursor of calendar {} is not valid anymore ({}), listing every event", name, err));
                    snapshot.invalidate_cursor();
                    let page = list_all_events(provider, calendar_id).await?;
                    (snapshot.replace_all(page.events), page.cursor, true)
                },
                Err(err) => return Err(SyncError::Calendar{ calendar_id: calendar_id.clone(), source: err }),
            }
        };
        snapshot.adopt_cursor(&cursor);

        progress.debug(&format!("Calendar {}: {}", name, count));
        if full {
            report.full_resyncs.push(calendar_id.clone());
        }
        report.changes.insert(calendar_id.clone(), count);
    }
    Ok(report)
}

async fn list_all_events<C>(provider: &C, calendar_id: &str) -> SyncResult<EventPage>
where
    C: CalendarProvider + ?Sized,
{
    provider.list_all_events(calendar_id).await
        .map_err(|source| SyncError::Calendar{ calendar_id: calendar_id.to_string(), source })
}

/// Refresh the task lists `list_ids` of `store`.
///
/// Only tasks updated since the previous watermark are fetched. The new watermark is `now - skew`, so that
/// updates that happen while the request is in flight (or that are stamped by a clock that lags behind) are
/// fetched again next time.
pub async fn refresh_tasks<T>(store: &mut TaskStore, list_ids: &[String], provider: &T, now: DateTime<Utc>, skew: Duration, progress: &mut SyncProgress) -> SyncResult<TaskSyncReport>
where
    T: TaskProvider + ?Sized,
{
    let watermark = now.checked_sub_signed(skew).unwrap_or(now);

    for forgotten in store.retain_lists(list_ids) {
        progress.info(&format!("Task list {} is not configured anymore, dropping its tasks", forgotten));
    }

    let mut report = TaskSyncReport::default();
    for list_id in list_ids {
        let list = store.lists.entry(list_id.clone()).or_default();
        progress.step(list_id, "fetching tasks");

        let tasks = provider.list_tasks(list_id, list.updated_min()).await
            .map_err(|source| SyncError::TaskList{ list_id: list_id.clone(), source })?;
        let count = list.apply_changes(tasks);
        list.set_watermark(watermark);

        progress.debug(&format!("Task list {}: {}", list_id, count));
        report.changes.insert(list_id.clone(), count);
    }
    Ok(report)
}


/// Mirrors a calendar source and a task source into a local [`Cache`], and builds week views out of it.
///
/// Readers always get a consistent snapshot: a refresh works on a copy of the cache, stores it, and only then
/// swaps it with the current one. Only one refresh runs at a time.
pub struct Provider<C, T>
where
    C: CalendarProvider,
    T: TaskProvider,
{
    calendars: C,
    tasks: T,
    settings: Settings,
    view: ViewSettings,
    clock: NowProvider,

    cache: RwLock<Arc<Cache>>,
    refresh_lock: Mutex<()>,
}

impl<C, T> Provider<C, T>
where
    C: CalendarProvider,
    T: TaskProvider,
{
    /// Create a provider.
    ///
    /// `cache` is usually loaded with [`Cache::from_file`]. Settings are normalized and validated here.
    pub fn new(calendars: C, tasks: T, settings: Settings, cache: Cache) -> SyncResult<Self> {
        let mut settings = settings;
        settings.normalize();
        let view = settings.view()?;

        Ok(Self {
            calendars,
            tasks,
            settings,
            view,
            clock: Arc::new(Utc::now),
            cache: RwLock::new(Arc::new(cache)),
            refresh_lock: Mutex::new(()),
        })
    }

    pub fn with_clock(mut self, clock: NowProvider) -> Self {
        self.clock = clock;
        self
    }

    /// The calendar source. Apart from tests, there are very few reasons to access it directly.
    pub fn calendar_source(&self) -> &C { &self.calendars }
    /// The task source. Apart from tests, there are very few reasons to access it directly.
    pub fn task_source(&self) -> &T { &self.tasks }
    pub fn settings(&self) -> &Settings { &self.settings }
    pub fn view_settings(&self) -> &ViewSettings { &self.view }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// The current content of the cache
    pub fn snapshot(&self) -> Arc<Cache> {
        match self.cache.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    fn swap(&self, cache: Cache) {
        let cache = Arc::new(cache);
        match self.cache.write() {
            Ok(mut guard) => *guard = cache,
            Err(poisoned) => *poisoned.into_inner() = cache,
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.refresh_lock.try_lock().is_err()
    }

    /// Read the cache file again (e.g. because another process refreshed it)
    pub async fn reload_from_disk(&self) -> SyncResult<()> {
        let _guard = self.refresh_lock.lock().await;
        let path = self.snapshot().backing_file().to_path_buf();
        let cache = Cache::from_file(&path)?;
        self.swap(cache);
        Ok(())
    }

    /// The week containing `anchor`, built from cached data only.
    ///
    /// Returns `None` when the cache has never been synced.
    pub fn build_from_cache(&self, anchor: DateTime<Utc>) -> Option<WeekViewData> {
        self.snapshot().build_week(&self.view, anchor)
    }

    /// Refresh the cache, without giving any feedback.
    ///
    /// See [`Self::refresh_with_feedback`]
    pub async fn refresh(&self) -> SyncResult<SyncOutcome> {
        let mut progress = SyncProgress::new();
        self.run_refresh(&mut progress).await
    }

    /// Refresh every configured calendar and task list, then store the result, and provide feedback to the user
    /// about the progress.
    ///
    /// Either everything is refreshed and stored, or nothing is: in case of error, neither the cache file nor the
    /// in-memory cache are modified, and the error is returned. Simply run this function again later.
    ///
    /// If another refresh is running, this returns [`SyncOutcome::AlreadyInProgress`] right away.
    pub async fn refresh_with_feedback(&self, feedback_sender: FeedbackSender) -> SyncResult<SyncOutcome> {
        let mut progress = SyncProgress::new_with_feedback_channel(feedback_sender);
        self.run_refresh(&mut progress).await
    }

    async fn run_refresh(&self, progress: &mut SyncProgress) -> SyncResult<SyncOutcome> {
        let _guard = match self.refresh_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                progress.debug("A refresh is already running, not starting another one");
                return Ok(SyncOutcome::AlreadyInProgress);
            },
        };

        let result = self.run_refresh_inner(progress).await;
        if let Err(err) = &result {
            progress.error(&format!("Refresh terminated because of an error: {}", err));
        }
        progress.finish();
        result.map(SyncOutcome::Done)
    }

    async fn run_refresh_inner(&self, progress: &mut SyncProgress) -> SyncResult<SyncSummary> {
        progress.info("Starting a refresh.");
        progress.feedback(SyncEvent::Started);

        let now = self.now();
        let list_ids = self.settings.list_ids();
        let mut working = Cache::clone(&self.snapshot());
        let data = working.data_mut();

        let mut calendar_progress = progress.fork();
        let mut task_progress = progress.fork();
        let (calendars, tasks) = tokio::join!(
            refresh_calendars(&mut data.calendars, &self.view.calendars, &self.calendars, &mut calendar_progress),
            refresh_tasks(&mut data.tasks, &list_ids, &self.tasks, now, self.settings.watermark_skew(), &mut task_progress),
        );
        progress.merge(calendar_progress);
        progress.merge(task_progress);
        let calendars = calendars?;
        let tasks = tasks?;

        data.synced_at = Some(now);
        working.save_to_file()?;
        self.swap(working);

        let summary = SyncSummary { synced_at: now, calendars, tasks };
        progress.info(&format!("Refresh ended ({})", summary.total_changes()));
        Ok(summary)
    }

    /// Refresh the cache, then build the week containing `anchor`.
    ///
    /// If a refresh is already running, this waits for it and renders what it stored instead of starting another one.
    pub async fn refresh_week(&self, anchor: DateTime<Utc>) -> SyncResult<WeekViewData> {
        if let SyncOutcome::AlreadyInProgress = self.refresh().await? {
            let _guard = self.refresh_lock.lock().await;
        }
        self.build_from_cache(anchor).ok_or(SyncError::Unavailable)
    }
}

impl<C, T> Provider<C, T>
where
    C: CalendarProvider + 'static,
    T: TaskProvider + 'static,
{
    /// The week containing `anchor` as currently cached (if it has ever been synced), and a background task that
    /// resolves to the same week once refreshed.
    pub fn cache_then_refresh(self: &Arc<Self>, anchor: DateTime<Utc>) -> (Option<WeekViewData>, JoinHandle<SyncResult<WeekViewData>>) {
        let cached = self.build_from_cache(anchor);
        let provider = Arc::clone(self);
        let refreshed = tokio::spawn(async move {
            provider.refresh_week(anchor).await
        });
        (cached, refreshed)
    }
}
