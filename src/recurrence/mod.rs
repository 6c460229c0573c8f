//! Recurrence rules: a small subset of RFC 5545 `RRULE`s
//!
//! Only `FREQ` (daily, weekly, monthly, yearly), `INTERVAL`, `BYDAY` and `BYMONTHDAY` are supported.
//! Rules can be written in the structured `RRULE:` syntax or as short English or Spanish phrases
//! (see [`parse_expression`]), can be described back as text (see [`describe()`]),
//! and can tell their next occurrence after a given instant (see [`next_occurrence`]).

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use bitflags::bitflags;
use chrono::Weekday;
use serde::{Deserialize, Serialize};

mod parse;
pub use parse::{extract_from_text, parse_expression};
mod describe;
pub use describe::{describe, Locale};
mod next;
pub use next::next_occurrence;

/// How often a rule repeats
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Yearly => "YEARLY",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_uppercase().as_str() {
            "DAILY" => Some(Frequency::Daily),
            "WEEKLY" => Some(Frequency::Weekly),
            "MONTHLY" => Some(Frequency::Monthly),
            "YEARLY" => Some(Frequency::Yearly),
            _ => None,
        }
    }
}

bitflags! {
    /// A set of days of the week
    #[derive(Default, Serialize, Deserialize)]
    pub struct Weekdays: u8 {
        const MO = 1;
        const TU = 2;
        const WE = 4;
        const TH = 8;
        const FR = 16;
        const SA = 32;
        const SU = 64;
        /// Monday to Friday
        const WORKWEEK = Self::MO.bits | Self::TU.bits | Self::WE.bits | Self::TH.bits | Self::FR.bits;
    }
}

const WEEK: [Weekday; 7] = [
    Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri, Weekday::Sat, Weekday::Sun,
];

impl Weekdays {
    pub fn from_weekday(day: Weekday) -> Self {
        match day {
            Weekday::Mon => Self::MO,
            Weekday::Tue => Self::TU,
            Weekday::Wed => Self::WE,
            Weekday::Thu => Self::TH,
            Weekday::Fri => Self::FR,
            Weekday::Sat => Self::SA,
            Weekday::Sun => Self::SU,
        }
    }

    /// Parse a two-letter `BYDAY` code
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "MO" => Some(Self::MO),
            "TU" => Some(Self::TU),
            "WE" => Some(Self::WE),
            "TH" => Some(Self::TH),
            "FR" => Some(Self::FR),
            "SA" => Some(Self::SA),
            "SU" => Some(Self::SU),
            _ => None,
        }
    }

    pub fn has(&self, day: Weekday) -> bool {
        self.contains(Self::from_weekday(day))
    }

    /// The days in this set, Monday first
    pub fn days(&self) -> Vec<Weekday> {
        WEEK.iter().copied().filter(|day| self.has(*day)).collect()
    }
}

pub(crate) fn weekday_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

/// A normalized recurrence rule.
///
/// `interval` is always at least 1, and month days are always in `1..=31` or `-31..=-1`
/// (negative days count from the end of the month).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Rule {
    frequency: Frequency,
    interval: u32,
    by_weekday: Weekdays,
    by_month_day: BTreeSet<i32>,
}

impl Rule {
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: 1,
            by_weekday: Weekdays::empty(),
            by_month_day: BTreeSet::new(),
        }
    }

    pub fn daily() -> Self { Self::new(Frequency::Daily) }
    pub fn weekly() -> Self { Self::new(Frequency::Weekly) }
    pub fn monthly() -> Self { Self::new(Frequency::Monthly) }
    pub fn yearly() -> Self { Self::new(Frequency::Yearly) }

    /// Repeat every `interval` periods. `0` is treated as `1`.
    pub fn every(mut self, interval: u32) -> Self {
        self.interval = interval.max(1);
        self
    }

    pub fn on_weekdays(mut self, days: Weekdays) -> Self {
        self.by_weekday = days;
        self
    }

    /// Restrict to these days of the month. Out-of-range values are ignored.
    pub fn on_month_days<I: IntoIterator<Item = i32>>(mut self, days: I) -> Self {
        self.by_month_day = days.into_iter().filter(|d| is_valid_month_day(*d)).collect();
        self
    }

    pub fn frequency(&self) -> Frequency { self.frequency }
    pub fn interval(&self) -> u32 { self.interval }
    pub fn by_weekday(&self) -> Weekdays { self.by_weekday }
    pub fn by_month_day(&self) -> &BTreeSet<i32> { &self.by_month_day }

    /// The structured `RRULE:` form of this rule
    pub fn to_rrule(&self) -> String {
        self.to_string()
    }
}

pub(crate) fn is_valid_month_day(day: i32) -> bool {
    day != 0 && day >= -31 && day <= 31
}

impl Display for Rule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "RRULE:FREQ={}", self.frequency.as_str())?;
        if self.interval > 1 {
            write!(f, ";INTERVAL={}", self.interval)?;
        }
        if self.by_weekday.is_empty() == false {
            let codes: Vec<&str> = self.by_weekday.days().into_iter().map(weekday_code).collect();
            write!(f, ";BYDAY={}", codes.join(","))?;
        }
        if self.by_month_day.is_empty() == false {
            let days: Vec<String> = self.by_month_day.iter().map(|d| d.to_string()).collect();
            write!(f, ";BYMONTHDAY={}", days.join(","))?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Rule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_expression(s).ok_or_else(|| format!("Unsupported recurrence: {}", s))
    }
}
