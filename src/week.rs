//! Week views: what a renderer needs to draw a Monday-to-Sunday grid from the cache

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;

use crate::cache::CachedData;
use crate::config::ViewSettings;
use crate::event::EventRecord;
use crate::recurrence::describe;
use crate::schedule::{assign_columns, free_slots, Slot, Span};
use crate::task::TaskEntry;
use crate::time::{local_datetime, week_start};

/// Prefix of the summary of events whose task is done
pub const DONE_MARK: &str = "✅";
/// Prefix of the title of recurring tasks
pub const RECURRING_MARK: &str = "🔁";
/// Section of tasks that are not under a section marker
pub const DEFAULT_SECTION: &str = "General";

/// An entry of the week grid: a calendar event, or a task that is due that day
#[derive(Clone, Debug, PartialEq)]
pub struct WeekEvent {
    pub summary: String,
    /// The calendar this event comes from (or the task list, for tasks)
    pub calendar_id: String,
    pub calendar_name: String,
    pub linked_task_id: Option<String>,
    /// `true` for the all-day entries made up for due tasks
    pub from_task: bool,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    /// First hour slot (0-23) of a timed event
    pub start_slot: u32,
    /// Hour slot after the last one (1-24) of a timed event
    pub end_slot: u32,
    pub all_day: bool,
    /// Column within its day, for timed events
    pub column: usize,
    /// How the linked task recurs, if it does
    pub recurrence: Option<String>,
}

impl Span for WeekEvent {
    type Point = DateTime<Tz>;

    fn start(&self) -> DateTime<Tz> { self.start }
    fn end(&self) -> DateTime<Tz> { self.end }
}

/// A task, as shown in the backlog or looked up from the grid
#[derive(Clone, Debug, PartialEq)]
pub struct TaskItem {
    pub id: String,
    pub title: String,
    pub list_id: String,
    pub list_name: String,
    pub section: String,
    pub due: Option<DateTime<Tz>>,
    pub due_date: Option<NaiveDate>,
    pub completed: bool,
    pub recurrence: Option<String>,
}

impl TaskItem {
    /// The title, marked when the task recurs
    pub fn display_title(&self) -> String {
        match self.recurrence {
            Some(_) if self.title.trim_start().starts_with(RECURRING_MARK) == false => format!("{} {}", RECURRING_MARK, self.title),
            _ => self.title.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DayView {
    pub date: NaiveDate,
    pub all_day: Vec<WeekEvent>,
    /// Sorted by `(start, column, end, summary)`
    pub timed: Vec<WeekEvent>,
    /// How many columns the timed events need
    pub columns: usize,
    /// Free time within the working hours
    pub free: Vec<Slot<DateTime<Tz>>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WeekViewData {
    /// Always a Monday
    pub week_start: NaiveDate,
    pub days: Vec<DayView>,
    /// Open tasks that are neither scheduled nor due this week, sorted by (has due date, due date, title)
    pub backlog: Vec<TaskItem>,
    pub tasks_by_id: HashMap<String, TaskItem>,
}

impl WeekViewData {
    /// The day after the last day of this week
    pub fn week_end(&self) -> NaiveDate {
        self.week_start + Duration::days(7)
    }

    pub fn day(&self, date: NaiveDate) -> Option<&DayView> {
        self.days.iter().find(|day| day.date == date)
    }

    /// Every entry of the grid (all-day and timed)
    pub fn events(&self) -> impl Iterator<Item = &WeekEvent> {
        self.days.iter().flat_map(|day| day.all_day.iter().chain(day.timed.iter()))
    }

    /// Optimistically show `task_id` as (un)completed, before the next refresh confirms it.
    ///
    /// Only this rendered copy changes, the cache is left untouched. Returns whether anything matched.
    pub fn apply_task_toggle(&mut self, task_id: &str, completed: bool) -> bool {
        let mut matched = false;
        for day in self.days.iter_mut() {
            for event in day.all_day.iter_mut().chain(day.timed.iter_mut()) {
                if event.linked_task_id.as_deref() != Some(task_id) {
                    continue;
                }
                event.summary = toggle_summary(&event.summary, completed);
                matched = true;
            }
        }
        if let Some(task) = self.tasks_by_id.get_mut(task_id) {
            task.completed = completed;
            matched = true;
        }
        for task in self.backlog.iter_mut().filter(|task| task.id == task_id) {
            task.completed = completed;
        }
        matched
    }
}

fn toggle_summary(summary: &str, completed: bool) -> String {
    let bare = summary.strip_prefix(DONE_MARK).map(str::trim_start).unwrap_or(summary);
    if completed {
        format!("{} {}", DONE_MARK, bare.trim())
    } else {
        bare.to_string()
    }
}

/// Hour slots covered by a timed event: from the hour it starts in, to the hour it ends in (rounded up).
/// Events running past midnight end at slot 24. Every event covers at least one slot.
pub fn slot_range(start: &DateTime<Tz>, end: &DateTime<Tz>) -> (u32, u32) {
    let start_slot = start.hour();
    let mut end_slot = if end.date_naive() > start.date_naive() {
        24
    } else {
        let partial_hour = end.minute() > 0 || end.second() > 0 || end.nanosecond() > 0;
        end.hour() + if partial_hour { 1 } else { 0 }
    };
    if end_slot <= start_slot {
        end_slot = start_slot + 1;
    }
    (start_slot, end_slot.min(24))
}

/// Build the view of the week containing `anchor`
pub fn build_week(data: &CachedData, view: &ViewSettings, anchor: DateTime<Utc>) -> WeekViewData {
    let tz = view.tz;
    let week_start = week_start(anchor.with_timezone(&tz).date_naive());
    let week_end = week_start + Duration::days(7);
    let window_start = local_datetime(week_start, NaiveTime::MIN, &tz);
    let window_end = local_datetime(week_end, NaiveTime::MIN, &tz);
    let dates: Vec<NaiveDate> = (0..7).map(|i| week_start + Duration::days(i)).collect();

    let tasks = collect_tasks(data, view);
    let tasks_by_id: HashMap<String, TaskItem> = tasks.iter()
        .map(|(task, _)| (task.id.clone(), task.clone()))
        .collect();

    // The link stored on the task wins over the one stored on the event
    let task_for_event: HashMap<&str, &str> = tasks.iter()
        .filter_map(|(task, event_id)| event_id.as_deref().map(|ev| (ev, task.id.as_str())))
        .collect();
    // Tasks that name their own event are only linked to that event
    let tasks_with_event: HashSet<&str> = task_for_event.values().copied().collect();

    let mut linked_tasks: HashSet<String> = HashSet::new();
    let mut all_day: Vec<Vec<WeekEvent>> = vec![Vec::new(); 7];
    let mut timed: Vec<Vec<WeekEvent>> = vec![Vec::new(); 7];

    for calendar_id in &view.calendars {
        let snapshot = match data.calendars.get(calendar_id) {
            Some(snapshot) => snapshot,
            None => continue,
        };
        let calendar_name = data.calendars.name_of(calendar_id);

        for event in snapshot.events().values() {
            if event.is_cancelled() {
                continue;
            }
            let linked_task_id = task_for_event.get(event.id())
                .map(|id| id.to_string())
                .or_else(|| event.linked_task_id()
                    .filter(|id| tasks_with_event.contains(id) == false)
                    .map(|id| id.to_string()));
            if let Some(task_id) = &linked_task_id {
                linked_tasks.insert(task_id.clone());
            }

            let (start, end) = match event.interval_in(&tz) {
                Some(interval) => interval,
                None => continue,
            };
            if end < window_start || start >= window_end {
                continue;
            }

            let week_event = to_week_event(event, calendar_id, calendar_name, linked_task_id, start, end, &tasks_by_id);
            if week_event.all_day {
                for (idx, date) in dates.iter().enumerate() {
                    let day_start = local_datetime(*date, NaiveTime::MIN, &tz);
                    if day_start >= start && day_start < end {
                        all_day[idx].push(week_event.clone());
                    }
                }
            } else if let Some(idx) = day_index(week_start, start.date_naive()) {
                timed[idx].push(week_event);
            }
        }
    }

    let mut backlog = Vec::new();
    for (task, _) in &tasks {
        if task.completed || linked_tasks.contains(&task.id) {
            continue;
        }
        match task.due_date.and_then(|due| day_index(week_start, due)) {
            Some(idx) => {
                let start = local_datetime(dates[idx], NaiveTime::MIN, &tz);
                all_day[idx].push(WeekEvent {
                    summary: task.title.clone(),
                    calendar_id: task.list_id.clone(),
                    calendar_name: task.list_name.clone(),
                    linked_task_id: Some(task.id.clone()),
                    from_task: true,
                    start,
                    end: local_datetime(dates[idx] + Duration::days(1), NaiveTime::MIN, &tz),
                    start_slot: 0,
                    end_slot: 24,
                    all_day: true,
                    column: 0,
                    recurrence: task.recurrence.clone(),
                });
            },
            None => backlog.push(task.clone()),
        }
    }
    backlog.sort_by(|l, r| {
        (l.due.is_none(), l.due, &l.title).cmp(&(r.due.is_none(), r.due, &r.title))
    });

    let days = dates.iter()
        .zip(all_day.into_iter().zip(timed.into_iter()))
        .map(|(date, (all_day, timed))| build_day(*date, all_day, timed, view))
        .collect();

    WeekViewData { week_start, days, backlog, tasks_by_id }
}

fn build_day(date: NaiveDate, mut all_day: Vec<WeekEvent>, timed: Vec<WeekEvent>, view: &ViewSettings) -> DayView {
    all_day.sort_by(|l, r| (l.from_task, &l.summary).cmp(&(r.from_task, &r.summary)));

    let layout = assign_columns(timed);
    let mut timed: Vec<WeekEvent> = layout.placed.into_iter()
        .map(|placed| WeekEvent { column: placed.column, ..placed.item })
        .collect();
    timed.sort_by(|l, r| (l.start, l.column, l.end, &l.summary).cmp(&(r.start, r.column, r.end, &r.summary)));

    let busy: Vec<Slot<DateTime<Tz>>> = timed.iter().map(|ev| Slot::new(ev.start, ev.end)).collect();
    let (day_start, day_end) = view.workday_bounds(date);
    let free = free_slots(&busy, day_start, day_end);

    DayView { date, all_day, timed, columns: layout.max_columns, free }
}

fn to_week_event(
    event: &EventRecord,
    calendar_id: &str,
    calendar_name: &str,
    linked_task_id: Option<String>,
    start: DateTime<Tz>,
    end: DateTime<Tz>,
    tasks_by_id: &HashMap<String, TaskItem>,
) -> WeekEvent {
    let all_day = event.is_all_day();
    let (start_slot, end_slot) = if all_day { (0, 24) } else { slot_range(&start, &end) };
    let recurrence = linked_task_id.as_ref()
        .and_then(|id| tasks_by_id.get(id))
        .and_then(|task| task.recurrence.clone());

    WeekEvent {
        summary: event.summary().to_string(),
        calendar_id: calendar_id.to_string(),
        calendar_name: calendar_name.to_string(),
        linked_task_id,
        from_task: false,
        start,
        end,
        start_slot,
        end_slot,
        all_day,
        column: 0,
        recurrence,
    }
}

fn day_index(week_start: NaiveDate, date: NaiveDate) -> Option<usize> {
    let offset = (date - week_start).num_days();
    if (0..7).contains(&offset) {
        Some(offset as usize)
    } else {
        None
    }
}

/// Every actual task of the configured lists (section markers excluded), with the event id stored in its notes
fn collect_tasks(data: &CachedData, view: &ViewSettings) -> Vec<(TaskItem, Option<String>)> {
    let mut result = Vec::new();
    for (list_name, list_id) in &view.lists {
        let list = match data.tasks.get(list_id) {
            Some(list) => list,
            None => continue,
        };
        for entry in list.items().values() {
            if entry.is_section_marker() {
                continue;
            }
            let section = entry.parent()
                .and_then(|parent| list.section_title(parent))
                .unwrap_or(DEFAULT_SECTION);
            let item = task_item(entry, list_id, list_name, section, view);
            result.push((item, entry.linked_event_id().map(|id| id.to_string())));
        }
    }
    result
}

fn task_item(entry: &TaskEntry, list_id: &str, list_name: &str, section: &str, view: &ViewSettings) -> TaskItem {
    TaskItem {
        id: entry.id().to_string(),
        title: entry.title().to_string(),
        list_id: list_id.to_string(),
        list_name: list_name.to_string(),
        section: section.to_string(),
        due: entry.due().map(|due| due.instant_in(&view.tz)),
        due_date: entry.due_date_in(&view.tz),
        completed: entry.is_completed(),
        recurrence: entry.recurrence().map(|rule| describe(&rule, view.locale)),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    use crate::annotation::{Annotations, Key};
    use crate::calendar::{CalendarInfo, CalendarSnapshot};
    use crate::task::{RemoteTask, TaskStatus};
    use crate::task_list::TaskListSnapshot;
    use crate::time::DateOrTime;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(d: u32, h: u32, min: u32) -> DateOrTime {
        Utc.with_ymd_and_hms(2026, 1, d, h, min, 0).unwrap().into()
    }

    fn view() -> ViewSettings {
        ViewSettings {
            tz: Tz::UTC,
            calendars: vec!["primary".to_string()],
            lists: vec![("Inbox".to_string(), "inbox".to_string())],
            ..ViewSettings::default()
        }
    }

    fn data(events: Vec<EventRecord>, tasks: Vec<TaskEntry>) -> CachedData {
        let mut data = CachedData::default();
        data.calendars.replace_meta(&[CalendarInfo::new("primary", "Personal", true)]);
        let mut calendar = CalendarSnapshot::new();
        calendar.apply_changes(events);
        data.calendars.calendars.insert("primary".to_string(), calendar);
        let mut list = TaskListSnapshot::new();
        list.apply_changes(tasks.into_iter().map(RemoteTask::live).collect());
        data.tasks.lists.insert("inbox".to_string(), list);
        data.synced_at = Some(Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap());
        data
    }

    fn anchor() -> DateTime<Utc> {
        // A Wednesday
        Utc.with_ymd_and_hms(2026, 1, 7, 12, 0, 0).unwrap()
    }

    #[test]
    fn slots() {
        let tz = Tz::UTC;
        let t = |d: u32, h: u32, m: u32| tz.with_ymd_and_hms(2026, 1, d, h, m, 0).unwrap();
        assert_eq!(slot_range(&t(5, 9, 0), &t(5, 10, 0)), (9, 10));
        assert_eq!(slot_range(&t(5, 9, 30), &t(5, 10, 15)), (9, 11));
        assert_eq!(slot_range(&t(5, 9, 0), &t(5, 9, 0)), (9, 10));
        assert_eq!(slot_range(&t(5, 23, 0), &t(6, 1, 0)), (23, 24));
    }

    #[test]
    fn days_lanes_and_columns() {
        let events = vec![
            EventRecord::new("a", "A", at(5, 9, 0), at(5, 10, 0)),
            EventRecord::new("b", "B", at(5, 9, 0), at(5, 11, 0)),
            EventRecord::new("c", "C", at(5, 10, 0), at(5, 11, 0)),
            EventRecord::new("trip", "Trip", ymd(2026, 1, 6).into(), ymd(2026, 1, 8).into()),
            EventRecord::new("gone", "Gone", at(5, 9, 0), at(5, 10, 0)).with_status(crate::event::EventStatus::Cancelled),
            EventRecord::new("next", "Next week", at(12, 9, 0), at(12, 10, 0)),
        ];
        let week = build_week(&data(events, vec![]), &view(), anchor());

        assert_eq!(week.week_start, ymd(2026, 1, 5));
        assert_eq!(week.days.len(), 7);

        let monday = &week.days[0];
        let layout: Vec<(&str, usize)> = monday.timed.iter().map(|e| (e.summary.as_str(), e.column)).collect();
        assert_eq!(layout, vec![("A", 0), ("B", 1), ("C", 0)]);
        assert_eq!(monday.columns, 2);
        assert_eq!(monday.timed[0].calendar_name, "Personal");
        let free: Vec<(u32, u32)> = monday.free.iter().map(|s| (s.start.hour(), s.end.hour())).collect();
        assert_eq!(free, vec![(11, 18)]);

        // Inclusive start, exclusive end
        assert!(week.days[0].all_day.is_empty());
        assert_eq!(week.days[1].all_day.len(), 1);
        assert_eq!(week.days[2].all_day.len(), 1);
        assert!(week.days[3].all_day.is_empty());

        assert!(week.events().all(|e| e.summary != "Gone" && e.summary != "Next week"));
    }

    #[test]
    fn tasks_on_the_grid_and_in_the_backlog() {
        let section = TaskEntry::new("s1", "Work").with_notes(Annotations::new().with(Key::Section, "1"));
        let tasks = vec![
            section.with_due(ymd(2026, 1, 6).into()),
            TaskEntry::new("due-in-week", "Call plumber").with_due(ymd(2026, 1, 8).into()).with_parent("s1"),
            TaskEntry::new("due-before", "Pay rent").with_due(at(3, 23, 59)),
            TaskEntry::new("undated-b", "Buy milk"),
            TaskEntry::new("undated-a", "Answer mail"),
            TaskEntry::new("done", "Done already").with_due(ymd(2026, 1, 6).into()).with_status(TaskStatus::Completed),
            TaskEntry::new("scheduled", "Write report")
                .with_notes(Annotations::new().with(Key::EventId, "ev-report").with(Key::Rrule, "RRULE:FREQ=WEEKLY"))
                .with_due(ymd(2026, 1, 9).into()),
            TaskEntry::new("back-linked", "Gym").with_due(ymd(2026, 1, 9).into()),
        ];
        let events = vec![
            EventRecord::new("ev-report", "Report time", at(6, 14, 0), at(6, 15, 30)),
            EventRecord::new("ev-gym", "Gym", at(30, 18, 0), at(30, 19, 0))
                .with_description(Annotations::new().with(Key::TaskId, "back-linked")),
        ];
        let week = build_week(&data(events, tasks), &view(), anchor());

        let thursday = &week.days[3];
        assert_eq!(thursday.all_day.len(), 1);
        let pseudo = &thursday.all_day[0];
        assert!(pseudo.from_task && pseudo.all_day);
        assert_eq!(pseudo.linked_task_id.as_deref(), Some("due-in-week"));
        assert_eq!(pseudo.calendar_name, "Inbox");

        let report = &week.days[1].timed[0];
        assert_eq!(report.linked_task_id.as_deref(), Some("scheduled"));
        assert_eq!(report.recurrence.as_deref(), Some("every week"));
        assert_eq!((report.start_slot, report.end_slot), (14, 16));

        let backlog: Vec<&str> = week.backlog.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(backlog, vec!["due-before", "undated-a", "undated-b"]);

        assert_eq!(week.tasks_by_id["due-in-week"].section, "Work");
        assert_eq!(week.tasks_by_id["undated-a"].section, DEFAULT_SECTION);
        assert!(week.tasks_by_id.contains_key("s1") == false);
        assert!(week.tasks_by_id["done"].completed);
        assert_eq!(week.tasks_by_id["scheduled"].display_title(), "🔁 Write report");
    }

    #[test]
    fn toggling_only_changes_the_rendered_copy() {
        let tasks = vec![TaskEntry::new("t1", "Call plumber").with_due(ymd(2026, 1, 8).into())];
        let cached = data(vec![], tasks);
        let mut week = build_week(&cached, &view(), anchor());

        assert!(week.apply_task_toggle("t1", true));
        assert_eq!(week.days[3].all_day[0].summary, "✅ Call plumber");
        assert!(week.tasks_by_id["t1"].completed);
        week.apply_task_toggle("t1", true);
        assert_eq!(week.days[3].all_day[0].summary, "✅ Call plumber");

        week.apply_task_toggle("t1", false);
        assert_eq!(week.days[3].all_day[0].summary, "Call plumber");
        assert!(week.apply_task_toggle("unknown", true) == false);

        let fresh = build_week(&cached, &view(), anchor());
        assert!(fresh.tasks_by_id["t1"].completed == false);
    }
}
