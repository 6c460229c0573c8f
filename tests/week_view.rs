//! Week views built from cached data

use chrono::{NaiveDate, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

use week_fridge::annotation::{Annotations, Key};
use week_fridge::cache::CachedData;
use week_fridge::calendar::{CalendarInfo, CalendarSnapshot};
use week_fridge::config::ViewSettings;
use week_fridge::recurrence::Locale;
use week_fridge::task::{RemoteTask, TaskStatus};
use week_fridge::task_list::TaskListSnapshot;
use week_fridge::time::DateOrTime;
use week_fridge::week::build_week;
use week_fridge::{EventRecord, TaskEntry};

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn view(tz: Tz) -> ViewSettings {
    ViewSettings {
        tz,
        calendars: vec!["primary".to_string()],
        lists: vec![("Casa".to_string(), "home".to_string())],
        ..ViewSettings::default()
    }
}

fn cached(events: Vec<EventRecord>, tasks: Vec<TaskEntry>) -> CachedData {
    let mut data = CachedData::default();
    data.calendars.replace_meta(&[CalendarInfo::new("primary", "Personal", true), CalendarInfo::new("hidden", "Hidden", false)]);

    let mut calendar = CalendarSnapshot::new();
    calendar.apply_changes(events);
    data.calendars.calendars.insert("primary".to_string(), calendar);

    let mut hidden = CalendarSnapshot::new();
    let start = Utc.with_ymd_and_hms(2026, 1, 6, 9, 0, 0).unwrap();
    hidden.apply_changes(vec![EventRecord::new("h", "Not shown", start.into(), (start + chrono::Duration::hours(1)).into())]);
    data.calendars.calendars.insert("hidden".to_string(), hidden);

    let mut list = TaskListSnapshot::new();
    list.apply_changes(tasks.into_iter().map(RemoteTask::live).collect());
    data.tasks.lists.insert("home".to_string(), list);
    data.synced_at = Some(Utc.with_ymd_and_hms(2026, 1, 5, 7, 0, 0).unwrap());
    data
}

#[test]
fn backlog_boundaries() {
    // A Saturday
    let before: DateOrTime = ymd(2026, 1, 3).into();
    let tasks = vec![
        TaskEntry::new("sat", "Due last Saturday").with_due(before),
        TaskEntry::new("mon", "Due on Monday").with_due(ymd(2026, 1, 5).into()),
        TaskEntry::new("sun", "Due on Sunday").with_due(ymd(2026, 1, 11).into()),
        TaskEntry::new("next", "Due next Monday").with_due(ymd(2026, 1, 12).into()),
    ];
    let anchor = Utc.with_ymd_and_hms(2026, 1, 11, 22, 0, 0).unwrap();
    let week = build_week(&cached(vec![], tasks), &view(Tz::UTC), anchor);

    assert_eq!(week.week_start, ymd(2026, 1, 5));
    assert_eq!(week.week_end(), ymd(2026, 1, 12));
    let backlog: Vec<&str> = week.backlog.iter().map(|task| task.id.as_str()).collect();
    assert_eq!(backlog, vec!["sat", "next"]);
    assert_eq!(week.days[0].all_day[0].linked_task_id.as_deref(), Some("mon"));
    assert_eq!(week.days[6].all_day[0].linked_task_id.as_deref(), Some("sun"));
}

#[test]
fn anchors_follow_the_local_date() {
    let madrid: Tz = "Europe/Madrid".parse().unwrap();
    // Still Sunday in UTC, already Monday in Madrid
    let anchor = Utc.with_ymd_and_hms(2026, 1, 11, 23, 30, 0).unwrap();

    let week = build_week(&cached(vec![], vec![]), &view(Tz::UTC), anchor);
    assert_eq!(week.week_start, ymd(2026, 1, 5));
    let week = build_week(&cached(vec![], vec![]), &view(madrid), anchor);
    assert_eq!(week.week_start, ymd(2026, 1, 12));
}

#[test]
fn timed_events_in_local_time() {
    let madrid: Tz = "Europe/Madrid".parse().unwrap();
    // 29 March 2026 is the switch to summer time in Madrid: this week has a 23 hours Sunday
    let start = Utc.with_ymd_and_hms(2026, 3, 29, 8, 0, 0).unwrap();
    let late = Utc.with_ymd_and_hms(2026, 3, 27, 22, 30, 0).unwrap();
    let events = vec![
        EventRecord::new("brunch", "Brunch", start.into(), (start + chrono::Duration::minutes(90)).into()),
        EventRecord::new("party", "Party", late.into(), (late + chrono::Duration::hours(3)).into()),
    ];
    let anchor = Utc.with_ymd_and_hms(2026, 3, 25, 12, 0, 0).unwrap();
    let week = build_week(&cached(events, vec![]), &view(madrid), anchor);

    assert_eq!(week.week_start, ymd(2026, 3, 23));
    let sunday = &week.days[6];
    let brunch = &sunday.timed[0];
    // 08:00 UTC is 10:00 in summer time
    assert_eq!(brunch.start.hour(), 10);
    assert_eq!((brunch.start_slot, brunch.end_slot), (10, 12));
    assert_eq!(sunday.free.len(), 2);

    // Events past midnight stay on the day they start, until the end of the grid
    let party = &week.days[4].timed[0];
    assert_eq!((party.start_slot, party.end_slot), (23, 24));
    assert!(week.days[5].timed.is_empty());
    assert!(week.events().all(|event| event.summary != "Not shown"));
}

#[test]
fn multi_day_all_day_events() {
    let events = vec![
        EventRecord::new("trip", "Trip", ymd(2026, 1, 3).into(), ymd(2026, 1, 7).into()),
        EventRecord::new("holiday", "Holiday", ymd(2026, 1, 9).into(), ymd(2026, 1, 9).into()),
    ];
    let anchor = Utc.with_ymd_and_hms(2026, 1, 7, 12, 0, 0).unwrap();
    let week = build_week(&cached(events, vec![]), &view(Tz::UTC), anchor);

    let with_trip: Vec<bool> = week.days.iter()
        .map(|day| day.all_day.iter().any(|event| event.summary == "Trip"))
        .collect();
    assert_eq!(with_trip, vec![true, true, false, false, false, false, false]);
    // Empty all-day ranges cover no day
    assert!(week.events().all(|event| event.summary != "Holiday"));
    assert!(week.days.iter().all(|day| day.columns == 0));
    assert_eq!(week.days[0].free.len(), 1);
}

#[test]
fn sections_recurrences_and_completion() {
    let section = TaskEntry::new("sec", "Cocina").with_notes(Annotations::new().with(Key::Section, "1"));
    let tasks = vec![
        section,
        TaskEntry::new("dishes", "Lavar platos")
            .with_parent("sec")
            .with_notes(Annotations::from_text("con jabón").with(Key::Rrule, "RRULE:FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,WE"))
            .with_due(ymd(2026, 1, 7).into()),
        TaskEntry::new("done", "Hecho").with_status(TaskStatus::Completed).with_due(ymd(2026, 1, 8).into()),
        TaskEntry::new("later", "Sin fecha"),
    ];
    let mut view = view(Tz::UTC);
    view.locale = Locale::Spanish;
    let anchor = Utc.with_ymd_and_hms(2026, 1, 7, 12, 0, 0).unwrap();
    let mut week = build_week(&cached(vec![], tasks), &view, anchor);

    let dishes = &week.days[2].all_day[0];
    assert_eq!(dishes.summary, "Lavar platos");
    assert_eq!(dishes.calendar_name, "Casa");
    assert_eq!(dishes.recurrence.as_deref(), Some("cada 2 semanas (lun, mie)"));

    let item = &week.tasks_by_id["dishes"];
    assert_eq!(item.section, "Cocina");
    assert_eq!(item.display_title(), "🔁 Lavar platos");
    assert_eq!(week.tasks_by_id["later"].section, "General");
    assert!(week.events().all(|event| event.linked_task_id.as_deref() != Some("done")));
    assert!(week.backlog.iter().all(|task| task.id != "done"));

    week.apply_task_toggle("dishes", true);
    assert_eq!(week.days[2].all_day[0].summary, "✅ Lavar platos");
    assert!(week.tasks_by_id["dishes"].completed);
}

#[test]
fn events_linked_from_either_side() {
    let start = Utc.with_ymd_and_hms(2026, 1, 6, 14, 0, 0).unwrap();
    let end = start + chrono::Duration::hours(2);
    let events = vec![
        EventRecord::new("block", "Focus", start.into(), end.into()),
        EventRecord::new("other", "Other", start.into(), end.into())
            .with_description(Annotations::new().with(Key::TaskId, "report")),
        EventRecord::new("stale", "Stale", start.into(), end.into())
            .with_description(Annotations::new().with(Key::TaskId, "deleted-task")),
    ];
    let tasks = vec![
        // The task side wins
        TaskEntry::new("report", "Write report")
            .with_notes(Annotations::new().with(Key::EventId, "block"))
            .with_due(ymd(2026, 1, 6).into()),
        // Links to events that do not exist are ignored
        TaskEntry::new("orphan", "Orphan")
            .with_notes(Annotations::new().with(Key::EventId, "missing"))
            .with_due(ymd(2026, 1, 7).into()),
    ];
    let anchor = Utc.with_ymd_and_hms(2026, 1, 7, 12, 0, 0).unwrap();
    let week = build_week(&cached(events, tasks), &view(Tz::UTC), anchor);

    let tuesday = &week.days[1];
    assert_eq!(tuesday.columns, 3);
    let block = tuesday.timed.iter().find(|event| event.summary == "Focus").unwrap();
    assert_eq!(block.linked_task_id.as_deref(), Some("report"));
    // The task names another event, so this one stays unlinked
    let other = tuesday.timed.iter().find(|event| event.summary == "Other").unwrap();
    assert_eq!(other.linked_task_id, None);
    let stale = tuesday.timed.iter().find(|event| event.summary == "Stale").unwrap();
    assert_eq!(stale.linked_task_id.as_deref(), Some("deleted-task"));
    // Scheduled tasks are not repeated as all-day entries
    assert!(tuesday.all_day.is_empty());

    let orphan = &week.days[2].all_day[0];
    assert!(orphan.from_task);
    assert_eq!(orphan.linked_task_id.as_deref(), Some("orphan"));
}
