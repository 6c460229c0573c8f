//! The local snapshot of remote task lists

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::provider::report::ChangeCount;
use crate::task::{RemoteTask, TaskEntry};

/// The local mirror of a single remote task list
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskListSnapshot {
    /// Only tasks updated at or after this instant are fetched on the next sync. `None` means "fetch everything".
    #[serde(default)]
    updated_min: Option<DateTime<Utc>>,
    #[serde(default)]
    items: HashMap<String, TaskEntry>,
}

impl TaskListSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updated_min(&self) -> Option<DateTime<Utc>> {
        self.updated_min
    }

    pub fn items(&self) -> &HashMap<String, TaskEntry> {
        &self.items
    }

    pub fn get(&self, task_id: &str) -> Option<&TaskEntry> {
        self.items.get(task_id)
    }

    /// Apply remote changes: deleted tasks are removed, others are inserted or replaced
    pub fn apply_changes(&mut self, tasks: Vec<RemoteTask>) -> ChangeCount {
        let mut count = ChangeCount::default();
        for task in tasks {
            if task.deleted {
                if self.items.remove(task.entry.id()).is_some() {
                    count.deleted += 1;
                }
                continue;
            }
            self.items.insert(task.entry.id().to_string(), task.entry);
            count.upserted += 1;
        }
        count
    }

    pub fn set_watermark(&mut self, updated_min: DateTime<Utc>) {
        self.updated_min = Some(updated_min);
    }

    /// Title of the section marker `task_id`, if it is one
    pub fn section_title(&self, task_id: &str) -> Option<&str> {
        self.items.get(task_id)
            .filter(|task| task.is_section_marker())
            .map(|task| task.title())
    }
}

/// Every task list the cache knows about
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskStore {
    #[serde(default)]
    pub lists: HashMap<String, TaskListSnapshot>,
}

impl TaskStore {
    pub fn get(&self, list_id: &str) -> Option<&TaskListSnapshot> {
        self.lists.get(list_id)
    }

    /// Drop every list that is not in `list_ids`, and return their ids
    pub fn retain_lists(&mut self, list_ids: &[String]) -> Vec<String> {
        let mut forgotten: Vec<String> = self.lists.keys()
            .filter(|id| list_ids.contains(id) == false)
            .cloned()
            .collect();
        forgotten.sort();
        for id in &forgotten {
            self.lists.remove(id);
        }
        forgotten
    }

    /// Find a task in any list
    pub fn find(&self, task_id: &str) -> Option<(&str, &TaskEntry)> {
        self.lists.iter()
            .find_map(|(list_id, list)| list.get(task_id).map(|task| (list_id.as_str(), task)))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crate::annotation::{Annotations, Key};

    #[test]
    fn deletions_and_upserts() {
        let mut list = TaskListSnapshot::new();
        list.apply_changes(vec![
            RemoteTask::live(TaskEntry::new("s1", "Work").with_notes(Annotations::new().with(Key::Section, "1"))),
            RemoteTask::live(TaskEntry::new("t1", "Write report").with_parent("s1")),
            RemoteTask::live(TaskEntry::new("t2", "Old")),
        ]);
        let count = list.apply_changes(vec![RemoteTask::deleted("t2"), RemoteTask::deleted("unknown")]);
        assert_eq!(count, ChangeCount { upserted: 0, deleted: 1 });
        assert_eq!(list.items().len(), 2);
        assert_eq!(list.section_title("s1"), Some("Work"));
        assert_eq!(list.section_title("t1"), None);

        let mut store = TaskStore::default();
        store.lists.insert("inbox".to_string(), list);
        assert_eq!(store.find("t1").map(|(list, task)| (list, task.title())), Some(("inbox", "Write report")));

        store.lists.insert("old".to_string(), TaskListSnapshot::new());
        assert_eq!(store.retain_lists(&["inbox".to_string()]), vec!["old".to_string()]);
        assert!(store.get("old").is_none());
        assert!(store.get("inbox").is_some());
    }

    #[test]
    fn watermark_serde() {
        let mut list = TaskListSnapshot::new();
        assert_eq!(list.updated_min(), None);
        list.set_watermark(Utc.with_ymd_and_hms(2026, 1, 5, 8, 59, 0).unwrap());

        let json = serde_json::to_string(&list).unwrap();
        let back: TaskListSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, list);
        let empty: TaskListSnapshot = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, TaskListSnapshot::new());
    }
}
