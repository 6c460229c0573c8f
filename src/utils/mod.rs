///! Some utility functions

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::week::{DayView, WeekEvent, WeekViewData};

/// A debug utility that pretty-prints a week
pub fn print_week(week: &WeekViewData) {
    println!("Week of {}", week.week_start);
    for day in &week.days {
        print_day(day);
    }
    if week.backlog.is_empty() == false {
        println!("Backlog");
        for task in &week.backlog {
            let due = task.due_date.map(|d| d.to_string()).unwrap_or_default();
            println!("    [{}] {}\t{}\t{}", task.section, task.display_title(), due, task.list_name);
        }
    }
}

fn print_day(day: &DayView) {
    println!("{} ({})", day.date.format("%a %Y-%m-%d"), day.columns);
    for event in &day.all_day {
        println!("    {}", describe_event(event));
    }
    for event in &day.timed {
        println!("    {:02}-{:02} {}{}", event.start_slot, event.end_slot, " ".repeat(event.column * 2), describe_event(event));
    }
    for slot in &day.free {
        println!("    free {} - {}", slot.start.format("%H:%M"), slot.end.format("%H:%M"));
    }
}

fn describe_event(event: &WeekEvent) -> String {
    let time = if event.all_day {
        "all day".to_string()
    } else {
        format!("{}-{}", event.start.format("%H:%M"), event.end.format("%H:%M"))
    };
    match &event.recurrence {
        Some(rule) => format!("{}\t{}\t{} ({})", time, event.summary, event.calendar_name, rule),
        None => format!("{}\t{}\t{}", time, event.summary, event.calendar_name),
    }
}


/// Compare keys of two hashmaps for equality
pub fn keys_are_the_same<T, U, V>(left: &HashMap<T, U>, right: &HashMap<T, V>) -> bool
where
    T: Hash + Eq + Clone + std::fmt::Display,
{
    if left.len() != right.len() {
        log::debug!("Count of keys mismatch: {} and {}", left.len(), right.len());
        return false;
    }

    let keys_l: HashSet<T> = left.keys().cloned().collect();
    let keys_r: HashSet<T> = right.keys().cloned().collect();
    let result = keys_l == keys_r;
    if result == false {
        log::debug!("Keys of a map mismatch");
        for key in keys_l {
            log::debug!("   left: {}", key);
        }
        log::debug!("RIGHT:");
        for key in keys_r {
            log::debug!("  right: {}", key);
        }
    }
    result
}
