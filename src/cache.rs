//! This module provides a local, durable cache of calendars and task lists

use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::CalendarStore;
use crate::config::ViewSettings;
use crate::error::{SyncError, SyncResult};
use crate::task_list::TaskStore;
use crate::utils::keys_are_the_same;
use crate::week::{build_week, WeekViewData};

/// Version of the cache file layout
pub const CACHE_VERSION: u32 = 1;

fn default_version() -> u32 {
    CACHE_VERSION
}

/// The content of a cache file
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CachedData {
    #[serde(default = "default_version")]
    pub version: u32,
    /// `calendar_meta` and `calendars`
    #[serde(flatten)]
    pub calendars: CalendarStore,
    #[serde(default)]
    pub tasks: TaskStore,
    /// When the last complete refresh happened. `None` means this cache has never been synced.
    #[serde(default)]
    pub synced_at: Option<DateTime<Utc>>,
}

impl Default for CachedData {
    fn default() -> Self {
        Self {
            version: CACHE_VERSION,
            calendars: CalendarStore::default(),
            tasks: TaskStore::default(),
            synced_at: None,
        }
    }
}

/// A local mirror of remote calendars and task lists, stored in a JSON file
#[derive(Clone, Debug, PartialEq)]
pub struct Cache {
    backing_file: PathBuf,
    data: CachedData,
}

impl Cache {
    /// Initialize an empty cache, that will be stored in `path`
    pub fn new(path: &Path) -> Self {
        Self {
            backing_file: PathBuf::from(path),
            data: CachedData::default(),
        }
    }

    /// Initialize a cache from the content of its backing file.
    ///
    /// A missing file gives an empty cache, and so does a file that cannot be decoded (this is logged):
    /// the cache is rebuilt from scratch on the next refresh. Other I/O errors are returned.
    pub fn from_file(path: &Path) -> SyncResult<Self> {
        let file = match std::fs::File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No cache file at {:?}, starting from an empty cache", path);
                return Ok(Self::new(path));
            },
            Err(err) => return Err(SyncError::io(path, err)),
        };

        match serde_json::from_reader::<_, CachedData>(BufReader::new(file)) {
            Ok(data) => Ok(Self {
                backing_file: PathBuf::from(path),
                data,
            }),
            Err(err) => {
                log::warn!("Unable to decode cache file {:?} ({}). Starting from an empty cache", path, err);
                Ok(Self::new(path))
            },
        }
    }

    /// Store the current content to the backing file.
    ///
    /// The content is written to a temporary file in the same directory, which then replaces the backing file,
    /// so that readers never see a partially written cache.
    pub fn save_to_file(&self) -> SyncResult<()> {
        let path = &self.backing_file;
        let dir = match path.parent() {
            Some(parent) if parent.as_os_str().is_empty() == false => parent,
            _ => Path::new("."),
        };
        create_private_dir(dir).map_err(|err| SyncError::io(dir, err))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|err| SyncError::io(dir, err))?;
        serde_json::to_writer_pretty(&mut tmp, &self.data)?;
        tmp.write_all(b"\n").map_err(|err| SyncError::io(tmp.path(), err))?;
        tmp.as_file().sync_all().map_err(|err| SyncError::io(tmp.path(), err))?;
        tmp.persist(path).map_err(|err| SyncError::io(path, err.error))?;
        log::debug!("Cache saved to {:?}", path);
        Ok(())
    }

    pub fn backing_file(&self) -> &Path {
        &self.backing_file
    }

    pub fn data(&self) -> &CachedData {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut CachedData {
        &mut self.data
    }

    pub fn calendars(&self) -> &CalendarStore {
        &self.data.calendars
    }

    pub fn tasks(&self) -> &TaskStore {
        &self.data.tasks
    }

    pub fn synced_at(&self) -> Option<DateTime<Utc>> {
        self.data.synced_at
    }

    pub fn is_synced(&self) -> bool {
        self.data.synced_at.is_some()
    }

    /// Build the week containing `anchor` from the cached data.
    ///
    /// Returns `None` if this cache has never been synced.
    pub fn build_week(&self, view: &ViewSettings, anchor: DateTime<Utc>) -> Option<WeekViewData> {
        if self.is_synced() == false {
            return None;
        }
        Some(build_week(&self.data, view, anchor))
    }

    /// Compares two Caches to check they have the same current content
    ///
    /// This is not a complete equality test: sync cursors, watermarks and the sync date may differ
    pub fn has_same_contents_than(&self, other: &Self) -> bool {
        let cals_l = &self.data.calendars.calendars;
        let cals_r = &other.data.calendars.calendars;
        if keys_are_the_same(cals_l, cals_r) == false {
            return false;
        }
        for (id, cal_l) in cals_l {
            match cals_r.get(id) {
                Some(cal_r) if cal_l.events() == cal_r.events() => {},
                _ => return false,
            }
        }

        let lists_l = &self.data.tasks.lists;
        let lists_r = &other.data.tasks.lists;
        if keys_are_the_same(lists_l, lists_r) == false {
            return false;
        }
        for (id, list_l) in lists_l {
            match lists_r.get(id) {
                Some(list_r) if list_l.items() == list_r.items() => {},
                _ => return false,
            }
        }
        true
    }
}


/// Create `dir` and its missing parents. On Unix, created directories are only readable by their owner.
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(dir)
}
