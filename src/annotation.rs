//! Machine-readable annotations stored in the free-text notes of events and tasks
//!
//! Remote services only give us a free-text field (an event description, task notes).
//! Links between an event and a task, the recurrence rule of a task and section markers are stored
//! there as `key=value` lines. This module gives them a typed API, and only deals with the text
//! encoding at the (de)serialization boundary.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The annotation keys this crate understands
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    /// Stored on events: the id of the task this event was scheduled for
    TaskId,
    /// Stored on tasks: the id of the event that schedules this task
    EventId,
    /// Stored on tasks: the recurrence rule (`RRULE:...`)
    Rrule,
    /// Stored on tasks: marks this task as a section header, not as actual work
    Section,
}

impl Key {
    pub const ALL: [Key; 4] = [Key::TaskId, Key::EventId, Key::Rrule, Key::Section];

    pub fn as_str(&self) -> &'static str {
        match self {
            Key::TaskId => "justdoit_task_id",
            Key::EventId => "justdoit_event_id",
            Key::Rrule => "justdoit_rrule",
            Key::Section => "justdoit_section",
        }
    }

    fn strip_from(&self, line: &str) -> Option<String> {
        line.strip_prefix(self.as_str())
            .and_then(|rest| rest.strip_prefix('='))
            .map(|value| value.trim().to_string())
    }
}

/// Free text plus a set of typed `key=value` annotations
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Annotations {
    text: String,
    entries: BTreeMap<Key, String>,
}

impl Annotations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build annotations that only contain free text
    pub fn from_text(text: &str) -> Self {
        Self { text: text.trim().to_string(), entries: BTreeMap::new() }
    }

    /// Decode a notes/description field.
    ///
    /// Lines that look like `key=value` for a known key become entries (the first occurrence wins),
    /// every other line is kept as free text.
    pub fn parse(raw: &str) -> Self {
        let mut entries = BTreeMap::new();
        let mut text_lines = Vec::new();

        'lines: for line in raw.split('\n') {
            let trimmed = line.trim();
            for key in Key::ALL.iter() {
                if let Some(value) = key.strip_from(trimmed) {
                    entries.entry(*key).or_insert(value);
                    continue 'lines;
                }
            }
            text_lines.push(line.trim_end_matches('\r'));
        }

        Self {
            text: text_lines.join("\n").trim().to_string(),
            entries,
        }
    }

    /// Encode back to the text form: free text first, then one line per entry
    pub fn encode(&self) -> String {
        let mut lines: Vec<String> = Vec::new();
        if self.text.is_empty() == false {
            lines.push(self.text.clone());
        }
        for (key, value) in &self.entries {
            lines.push(format!("{}={}", key.as_str(), value));
        }
        lines.join("\n")
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: &str) {
        self.text = text.trim().to_string();
    }

    pub fn get(&self, key: Key) -> Option<&str> {
        self.entries.get(&key).map(|s| s.as_str())
    }

    pub fn has(&self, key: Key) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn set(&mut self, key: Key, value: &str) {
        self.entries.insert(key, value.trim().to_string());
    }

    pub fn with(mut self, key: Key, value: &str) -> Self {
        self.set(key, value);
        self
    }

    pub fn remove(&mut self, key: Key) -> Option<String> {
        self.entries.remove(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.entries.is_empty()
    }

    /// Copy of these annotations with only the free text kept
    pub fn without_entries(&self) -> Self {
        Self::from_text(&self.text)
    }

    /// Returns a non-empty value for `key`
    fn non_empty(&self, key: Key) -> Option<&str> {
        self.get(key).filter(|value| value.is_empty() == false)
    }

    pub fn linked_task_id(&self) -> Option<&str> {
        self.non_empty(Key::TaskId)
    }

    pub fn linked_event_id(&self) -> Option<&str> {
        self.non_empty(Key::EventId)
    }

    pub fn rrule(&self) -> Option<&str> {
        self.non_empty(Key::Rrule)
    }

    pub fn is_section_marker(&self) -> bool {
        self.has(Key::Section)
    }
}

impl Display for Annotations {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.encode())
    }
}

impl From<&str> for Annotations {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

/// Used to support serde: annotations are stored in their text form
impl Serialize for Annotations {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.encode())
    }
}
/// Used to support serde
impl<'de> Deserialize<'de> for Annotations {
    fn deserialize<D>(deserializer: D) -> Result<Annotations, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(Annotations::parse(raw.as_deref().unwrap_or("")))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keeps_free_text() {
        let notes = Annotations::parse("Buy milk\n  justdoit_event_id=ev42 \nand bread\njustdoit_event_id=other");
        assert_eq!(notes.text(), "Buy milk\nand bread");
        assert_eq!(notes.linked_event_id(), Some("ev42"));
        assert_eq!(notes.linked_task_id(), None);
    }

    #[test]
    fn unknown_keys_are_text() {
        let notes = Annotations::parse("size=3\njustdoit_sectionX=1");
        assert_eq!(notes.text(), "size=3\njustdoit_sectionX=1");
        assert!(notes.is_section_marker() == false);
    }

    #[test]
    fn set_and_encode() {
        let mut notes = Annotations::from_text("Water the plants");
        notes.set(Key::Rrule, "RRULE:FREQ=DAILY");
        notes.set(Key::EventId, "abc");
        assert_eq!(notes.encode(), "Water the plants\njustdoit_event_id=abc\njustdoit_rrule=RRULE:FREQ=DAILY");

        notes.remove(Key::EventId);
        assert_eq!(notes.encode(), "Water the plants\njustdoit_rrule=RRULE:FREQ=DAILY");
        assert_eq!(Annotations::parse(&notes.encode()), notes);
    }

    #[test]
    fn empty_values_are_not_links() {
        let notes = Annotations::parse("justdoit_task_id=\njustdoit_section=1");
        assert!(notes.has(Key::TaskId));
        assert_eq!(notes.linked_task_id(), None);
        assert!(notes.is_section_marker());
    }

    #[test]
    fn serde_as_string() {
        let notes = Annotations::new().with(Key::TaskId, "t1");
        let json = serde_json::to_string(&notes).unwrap();
        assert_eq!(json, "\"justdoit_task_id=t1\"");

        let back: Annotations = serde_json::from_str(&json).unwrap();
        assert_eq!(back, notes);
        let null: Annotations = serde_json::from_str("null").unwrap();
        assert!(null.is_empty());
    }
}
