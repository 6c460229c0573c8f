//! Interval algorithms used to lay out a day: free slots, and side-by-side columns for concurrent events
//!
//! Every interval is half-open (`[start, end)`). These functions are generic over the time point,
//! so that they work with any `Ord` type (instants, slot numbers, minutes...).

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap};

/// A half-open interval `[start, end)`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Slot<T> {
    pub start: T,
    pub end: T,
}

impl<T: Ord> Slot<T> {
    pub fn new(start: T, end: T) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Something that spans a half-open interval of time
pub trait Span {
    type Point: Ord + Clone;

    fn start(&self) -> Self::Point;
    fn end(&self) -> Self::Point;
}

impl<T: Ord + Clone> Span for Slot<T> {
    type Point = T;

    fn start(&self) -> T { self.start.clone() }
    fn end(&self) -> T { self.end.clone() }
}

/// The complement of `busy` within `[day_start, day_end)`.
///
/// Busy intervals may overlap or touch each other; they are merged first. Intervals that fall outside
/// the window are ignored, and partially overlapping ones are clipped. Empty free slots are never returned.
pub fn free_slots<T: Ord + Clone>(busy: &[Slot<T>], day_start: T, day_end: T) -> Vec<Slot<T>> {
    if day_end <= day_start {
        return Vec::new();
    }

    let clipped: Vec<Slot<T>> = busy.iter()
        .map(|slot| Slot::new(
            slot.start.clone().max(day_start.clone()),
            slot.end.clone().min(day_end.clone()),
        ))
        .filter(|slot| slot.is_empty() == false)
        .collect();

    let mut slots = Vec::new();
    let mut cursor = day_start;
    for interval in merge(clipped) {
        if interval.start > cursor {
            slots.push(Slot::new(cursor.clone(), interval.start.clone()));
        }
        if interval.end > cursor {
            cursor = interval.end;
        }
    }
    if cursor < day_end {
        slots.push(Slot::new(cursor, day_end));
    }
    slots
}

/// Merge overlapping or touching intervals. The result is sorted.
pub fn merge<T: Ord + Clone>(mut intervals: Vec<Slot<T>>) -> Vec<Slot<T>> {
    intervals.sort_by(|l, r| l.start.cmp(&r.start));

    let mut merged: Vec<Slot<T>> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        match merged.last_mut() {
            Some(last) if interval.start <= last.end => {
                if interval.end > last.end {
                    last.end = interval.end;
                }
            },
            _ => merged.push(interval),
        }
    }
    merged
}

/// An item together with the column it has been assigned
#[derive(Clone, Debug, PartialEq)]
pub struct Placed<E> {
    pub column: usize,
    pub item: E,
}

/// The result of [`assign_columns`]
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnLayout<E> {
    /// How many columns are needed. This equals the largest number of items that overlap at a single point.
    pub max_columns: usize,
    /// Every item, sorted by `(start, end)`
    pub placed: Vec<Placed<E>>,
}

impl<E> Default for ColumnLayout<E> {
    fn default() -> Self {
        Self { max_columns: 0, placed: Vec::new() }
    }
}

/// Give every item a column so that overlapping items never share one.
///
/// This is the greedy colouring of an interval graph: items are handled by ascending start, and each
/// takes the lowest column that has been released by an item ending at or before its start.
/// It is optimal: the number of columns equals the size of the largest clique.
pub fn assign_columns<E: Span>(mut items: Vec<E>) -> ColumnLayout<E> {
    items.sort_by(|l, r| (l.start(), l.end()).cmp(&(r.start(), r.end())));

    let mut active: BinaryHeap<Reverse<(E::Point, usize)>> = BinaryHeap::new();
    let mut released = BTreeSet::new();
    let mut max_columns = 0;
    let mut placed = Vec::with_capacity(items.len());

    for item in items {
        let start = item.start();
        while let Some(Reverse((end, column))) = active.peek() {
            if *end > start {
                break;
            }
            released.insert(*column);
            active.pop();
        }

        let column = match released.iter().next().copied() {
            Some(column) => {
                released.remove(&column);
                column
            },
            None => {
                max_columns += 1;
                max_columns - 1
            },
        };
        active.push(Reverse((item.end(), column)));
        placed.push(Placed { column, item });
    }

    ColumnLayout { max_columns, placed }
}
