//! Support for configuration options
//!
//! [`Settings`] is read from a JSON file. Missing fields get defaults, so that older or hand-written files keep working.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};
use crate::recurrence::Locale;
use crate::time::local_datetime;

/// Name of the directory (under the platform config and cache directories) this crate uses by default.
/// Feel free to override it when initing this library.
pub static APP_DIR_NAME: Lazy<Arc<Mutex<String>>> = Lazy::new(|| Arc::new(Mutex::new("week-fridge".to_string())));

/// Name of the cache file.
/// Feel free to override it when initing this library.
pub static CACHE_FILE_NAME: Lazy<Arc<Mutex<String>>> = Lazy::new(|| Arc::new(Mutex::new("cache.json".to_string())));

/// Name of the settings file.
/// Feel free to override it when initing this library.
pub static CONFIG_FILE_NAME: Lazy<Arc<Mutex<String>>> = Lazy::new(|| Arc::new(Mutex::new("config.json".to_string())));

const DEFAULT_CALENDAR_ID: &str = "primary";
const DEFAULT_WORKDAY_START: &str = "09:00";
const DEFAULT_WORKDAY_END: &str = "18:00";
const DEFAULT_TIMEZONE: &str = "local";
const DEFAULT_WATERMARK_SKEW_SECONDS: i64 = 60;
const MAX_WATERMARK_SKEW_SECONDS: i64 = 24 * 3600;

fn read_global(value: &Mutex<String>) -> String {
    match value.lock() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// Where the cache is stored by default (e.g. `~/.cache/week-fridge/cache.json`)
pub fn default_cache_path() -> SyncResult<PathBuf> {
    let base = dirs::cache_dir()
        .ok_or_else(|| SyncError::Config("unable to find a cache directory".to_string()))?;
    Ok(base.join(read_global(&APP_DIR_NAME)).join(read_global(&CACHE_FILE_NAME)))
}

/// Where the settings are stored by default (e.g. `~/.config/week-fridge/config.json`)
pub fn default_config_path() -> SyncResult<PathBuf> {
    let base = dirs::config_dir()
        .ok_or_else(|| SyncError::Config("unable to find a config directory".to_string()))?;
    Ok(base.join(read_global(&APP_DIR_NAME)).join(read_global(&CONFIG_FILE_NAME)))
}


#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// The calendar new events go to
    pub calendar_id: String,
    /// The calendars that are synced and shown in the week view. Defaults to `[calendar_id]`.
    pub view_calendars: Vec<String>,
    /// Task lists to sync, by display name
    pub lists: BTreeMap<String, String>,
    /// An IANA time zone name, or `local` to use the `TZ` environment variable
    pub timezone: String,
    /// `HH:MM`
    pub workday_start: String,
    /// `HH:MM`
    pub workday_end: String,
    /// The task watermark is set this long before the sync time, to absorb clock differences with the remote side
    pub watermark_skew_seconds: i64,
    /// Language of recurrence descriptions
    pub locale: Locale,
}

impl Default for Settings {
    fn default() -> Self {
        let mut settings = Self {
            calendar_id: DEFAULT_CALENDAR_ID.to_string(),
            view_calendars: Vec::new(),
            lists: BTreeMap::new(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            workday_start: DEFAULT_WORKDAY_START.to_string(),
            workday_end: DEFAULT_WORKDAY_END.to_string(),
            watermark_skew_seconds: DEFAULT_WATERMARK_SKEW_SECONDS,
            locale: Locale::default(),
        };
        settings.normalize();
        settings
    }
}

impl Settings {
    /// Read settings from a JSON file
    pub fn from_file(path: &Path) -> SyncResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|err| SyncError::io(path, err))?;
        let mut settings: Settings = serde_json::from_str(&content)?;
        settings.normalize();
        Ok(settings)
    }

    /// Read settings from a JSON file, or use the defaults if this file does not exist
    pub fn load_or_default(path: &Path) -> SyncResult<Self> {
        match Self::from_file(path) {
            Err(SyncError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No settings file at {:?}, using the defaults", path);
                Ok(Self::default())
            },
            other => other,
        }
    }

    pub fn save_to_file(&self, path: &Path) -> SyncResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| SyncError::io(parent, err))?;
        }
        let mut content = serde_json::to_string_pretty(self)?;
        content.push('\n');
        std::fs::write(path, content).map_err(|err| SyncError::io(path, err))
    }

    /// Fill empty fields with their defaults, and deduplicate `view_calendars`
    pub fn normalize(&mut self) {
        fn default_if_blank(value: &mut String, default: &str) {
            if value.trim().is_empty() {
                *value = default.to_string();
            }
        }
        default_if_blank(&mut self.calendar_id, DEFAULT_CALENDAR_ID);
        default_if_blank(&mut self.workday_start, DEFAULT_WORKDAY_START);
        default_if_blank(&mut self.workday_end, DEFAULT_WORKDAY_END);
        default_if_blank(&mut self.timezone, DEFAULT_TIMEZONE);
        if self.watermark_skew_seconds < 0 {
            self.watermark_skew_seconds = DEFAULT_WATERMARK_SKEW_SECONDS;
        }
        self.watermark_skew_seconds = self.watermark_skew_seconds.min(MAX_WATERMARK_SKEW_SECONDS);

        let mut seen = Vec::new();
        for id in self.view_calendars.iter().map(|id| id.trim()) {
            if id.is_empty() == false && seen.iter().any(|s: &String| s == id) == false {
                seen.push(id.to_string());
            }
        }
        if seen.is_empty() {
            seen.push(self.calendar_id.clone());
        }
        self.view_calendars = seen;
    }

    /// Ids of the task lists to sync
    pub fn list_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lists.values().cloned().collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Display name of a task list (its id when it is not configured)
    pub fn list_name<'a>(&'a self, list_id: &'a str) -> &'a str {
        self.lists.iter()
            .find(|(_, id)| id.as_str() == list_id)
            .map(|(name, _)| name.as_str())
            .unwrap_or(list_id)
    }

    /// How far back the task watermark is set. Out of range values fall back to the default.
    pub fn watermark_skew(&self) -> Duration {
        match self.watermark_skew_seconds {
            0..=MAX_WATERMARK_SKEW_SECONDS => Duration::seconds(self.watermark_skew_seconds),
            _ => Duration::seconds(DEFAULT_WATERMARK_SKEW_SECONDS),
        }
    }

    pub fn time_zone(&self) -> SyncResult<Tz> {
        let name = self.timezone.trim();
        if name.eq_ignore_ascii_case("local") {
            return Ok(local_time_zone());
        }
        name.parse::<Tz>()
            .map_err(|err| SyncError::Config(format!("invalid time zone {:?}: {}", name, err)))
    }

    /// Start and end of the working day
    pub fn workday(&self) -> SyncResult<(NaiveTime, NaiveTime)> {
        let start = parse_clock(&self.workday_start)?;
        let end = parse_clock(&self.workday_end)?;
        if end <= start {
            return Err(SyncError::Config(format!("workday ends ({}) before it starts ({})", self.workday_end, self.workday_start)));
        }
        Ok((start, end))
    }

    /// Resolve and validate everything the week view needs
    pub fn view(&self) -> SyncResult<ViewSettings> {
        let (workday_start, workday_end) = self.workday()?;
        Ok(ViewSettings {
            tz: self.time_zone()?,
            workday_start,
            workday_end,
            calendars: self.view_calendars.clone(),
            lists: self.lists.iter().map(|(name, id)| (name.clone(), id.clone())).collect(),
            locale: self.locale,
        })
    }
}

fn parse_clock(value: &str) -> SyncResult<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|err| SyncError::Config(format!("invalid time {:?}: {}", value, err)))
}

fn local_time_zone() -> Tz {
    match std::env::var("TZ") {
        Ok(name) => match name.trim_start_matches(':').parse::<Tz>() {
            Ok(tz) => tz,
            Err(_) => {
                log::warn!("Unknown time zone {:?} in $TZ, using UTC", name);
                Tz::UTC
            },
        },
        Err(_) => {
            log::debug!("$TZ is not set, using UTC as the local time zone");
            Tz::UTC
        },
    }
}

/// Validated settings, as used to build week views
#[derive(Clone, Debug, PartialEq)]
pub struct ViewSettings {
    pub tz: Tz,
    pub workday_start: NaiveTime,
    pub workday_end: NaiveTime,
    /// Calendars to show, in order
    pub calendars: Vec<String>,
    /// `(name, id)` of the task lists to show
    pub lists: Vec<(String, String)>,
    pub locale: Locale,
}

impl ViewSettings {
    /// The working hours of `day`
    pub fn workday_bounds(&self, day: NaiveDate) -> (DateTime<Tz>, DateTime<Tz>) {
        (
            local_datetime(day, self.workday_start, &self.tz),
            local_datetime(day, self.workday_end, &self.tz),
        )
    }
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            tz: Tz::UTC,
            workday_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            workday_end: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or(NaiveTime::MIN),
            calendars: vec![DEFAULT_CALENDAR_ID.to_string()],
            lists: Vec::new(),
            locale: Locale::default(),
        }
    }
}
