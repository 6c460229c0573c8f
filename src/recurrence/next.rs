//! Finding the next occurrence of a rule

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Tz;

use super::{parse_expression, Frequency, Rule};
use crate::time::{local_datetime, week_start};

/// How many periods (days, weeks, months or years) are tried before giving up.
/// Periods before the reference instant are skipped arithmetically and do not count.
const MAX_PERIODS: i64 = 4000;

/// Parse `expression`, then find its first occurrence strictly after `after`.
///
/// The series starts at `anchor`, or at `after` when no anchor is known.
/// Returns `None` for empty or unsupported expressions, and for rules that never match again.
pub fn next_occurrence(expression: &str, anchor: Option<DateTime<Utc>>, after: DateTime<Utc>, tz: &Tz) -> Option<DateTime<Tz>> {
    let rule = parse_expression(expression)?;
    let anchor = anchor.unwrap_or(after).with_timezone(tz);
    rule.next_after(&anchor, &after.with_timezone(tz))
}

impl Rule {
    /// The first occurrence of the series anchored at `anchor` that is strictly later than `after`.
    ///
    /// Occurrences happen at the wall-clock time of `anchor`, in the time zone of `anchor`.
    /// The anchor itself only counts if it matches the rule, and weeks start on Monday.
    /// Local times that do not exist (daylight-saving gaps) are moved one hour later, the occurrence is kept.
    pub fn next_after(&self, anchor: &DateTime<Tz>, after: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        let tz = anchor.timezone();
        let time = anchor.time();
        let anchor_date = anchor.date_naive();
        let from_date = after.with_timezone(&tz).date_naive().max(anchor_date);

        let first = self.period_index(anchor_date, from_date);
        for k in first..first + MAX_PERIODS {
            for date in self.period_dates(anchor_date, k)? {
                let candidate = local_datetime(date, time, &tz);
                if candidate < *anchor || candidate <= *after {
                    continue;
                }
                return Some(candidate);
            }
        }
        log::debug!("No occurrence of {} found after {}", self, after);
        None
    }

    /// Index of the period that contains `date`, counted from the period that contains `anchor_date`
    fn period_index(&self, anchor_date: NaiveDate, date: NaiveDate) -> i64 {
        let interval = self.interval as i64;
        let elapsed = match self.frequency {
            Frequency::Daily => (date - anchor_date).num_days(),
            Frequency::Weekly => (week_start(date) - week_start(anchor_date)).num_days() / 7,
            Frequency::Monthly => month_index(date) - month_index(anchor_date),
            Frequency::Yearly => (date.year() - anchor_date.year()) as i64,
        };
        elapsed.max(0) / interval
    }

    /// Every date of the `k`-th period that matches the rule, in chronological order.
    ///
    /// Returns `None` when the period is out of the supported date range.
    fn period_dates(&self, anchor_date: NaiveDate, k: i64) -> Option<Vec<NaiveDate>> {
        let step = k.checked_mul(self.interval as i64)?;

        let mut dates = match self.frequency {
            Frequency::Daily => {
                let date = anchor_date.checked_add_signed(Duration::try_days(step)?)?;
                vec![date]
            },
            Frequency::Weekly => {
                let monday = week_start(anchor_date).checked_add_signed(Duration::try_weeks(step)?)?;
                let days = if self.by_weekday.is_empty() {
                    vec![anchor_date.weekday()]
                } else {
                    self.by_weekday.days()
                };
                days.into_iter()
                    .filter_map(|day| monday.checked_add_signed(Duration::days(day.num_days_from_monday() as i64)))
                    .collect()
            },
            Frequency::Monthly => {
                let (year, month) = month_from_index(month_index(anchor_date) + step);
                self.month_dates(year, month, anchor_date.day())
            },
            Frequency::Yearly => {
                let year = i32::try_from(anchor_date.year() as i64 + step).ok()?;
                if self.by_month_day.is_empty() && self.by_weekday.is_empty() {
                    NaiveDate::from_ymd_opt(year, anchor_date.month(), anchor_date.day())
                        .into_iter()
                        .collect()
                } else {
                    (1..=12).flat_map(|month| self.month_dates(year, month, anchor_date.day())).collect()
                }
            },
        };

        dates.retain(|date| self.matches_filters(date));
        dates.sort();
        dates.dedup();
        Some(dates)
    }

    /// Candidate dates within a month, before the generic filters apply
    fn month_dates(&self, year: i32, month: u32, anchor_day: u32) -> Vec<NaiveDate> {
        let length = days_in_month(year, month);
        if self.by_month_day.is_empty() == false {
            self.by_month_day.iter()
                .filter_map(|day| resolve_month_day(*day, length))
                .filter_map(|day| NaiveDate::from_ymd_opt(year, month, day))
                .collect()
        } else if self.by_weekday.is_empty() == false {
            (1..=length)
                .filter_map(|day| NaiveDate::from_ymd_opt(year, month, day))
                .collect()
        } else {
            NaiveDate::from_ymd_opt(year, month, anchor_day).into_iter().collect()
        }
    }

    fn matches_filters(&self, date: &NaiveDate) -> bool {
        if self.by_weekday.is_empty() == false && self.by_weekday.has(date.weekday()) == false {
            return false;
        }
        if self.by_month_day.is_empty() == false {
            let length = days_in_month(date.year(), date.month());
            let matches = self.by_month_day.iter()
                .any(|day| resolve_month_day(*day, length) == Some(date.day()));
            if matches == false {
                return false;
            }
        }
        true
    }
}

fn month_index(date: NaiveDate) -> i64 {
    date.year() as i64 * 12 + date.month0() as i64
}

fn month_from_index(index: i64) -> (i32, u32) {
    (index.div_euclid(12) as i32, index.rem_euclid(12) as u32 + 1)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    (28..=31).rev()
        .find(|day| NaiveDate::from_ymd_opt(year, month, *day).is_some())
        .unwrap_or(28)
}

/// Turn a possibly negative month day into a day number, if the month is long enough
fn resolve_month_day(day: i32, length: u32) -> Option<u32> {
    let length = length as i32;
    let resolved = if day > 0 { day } else { length + day + 1 };
    if resolved >= 1 && resolved <= length && day.abs() <= length {
        Some(resolved as u32)
    } else {
        None
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};
    use crate::recurrence::Weekdays;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn date_of(dt: Option<DateTime<Tz>>) -> Option<NaiveDate> {
        dt.map(|dt| dt.date_naive())
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn weekly_mon_wed_fri() {
        let tz = Tz::UTC;
        let rule = "RRULE:FREQ=WEEKLY;BYDAY=MO,WE,FR";
        let anchor = Some(utc(2026, 1, 5, 9, 0));

        let next = next_occurrence(rule, anchor, utc(2026, 1, 5, 10, 0), &tz);
        assert_eq!(date_of(next), Some(ymd(2026, 1, 7)));
        assert_eq!(next.unwrap().hour(), 9);

        let next = next_occurrence(rule, anchor, utc(2026, 1, 9, 23, 59), &tz);
        assert_eq!(date_of(next), Some(ymd(2026, 1, 12)));
    }

    #[test]
    fn strictly_after() {
        let tz = Tz::UTC;
        let anchor = Some(utc(2026, 1, 5, 9, 0));
        let next = next_occurrence("RRULE:FREQ=DAILY", anchor, utc(2026, 1, 5, 9, 0), &tz);
        assert_eq!(next.map(|n| n.with_timezone(&Utc)), Some(utc(2026, 1, 6, 9, 0)));
    }

    #[test]
    fn no_anchor_starts_at_after() {
        let tz = Tz::UTC;
        let next = next_occurrence("every week", None, utc(2026, 1, 7, 8, 30), &tz);
        assert_eq!(next.map(|n| n.with_timezone(&Utc)), Some(utc(2026, 1, 14, 8, 30)));
    }

    #[test]
    fn anchor_must_match_the_rule() {
        let tz = Tz::UTC;
        // 2026-01-05 is a Monday
        let rule = Rule::weekly().on_weekdays(Weekdays::TU);
        let anchor = utc(2026, 1, 5, 9, 0).with_timezone(&tz);
        let before = utc(2026, 1, 1, 0, 0).with_timezone(&tz);
        assert_eq!(date_of(rule.next_after(&anchor, &before)), Some(ymd(2026, 1, 6)));
    }

    #[test]
    fn intervals_are_anchored() {
        let tz = Tz::UTC;
        let anchor = Some(utc(2026, 1, 5, 9, 0));
        let next = next_occurrence("RRULE:FREQ=WEEKLY;INTERVAL=2;BYDAY=MO", anchor, utc(2026, 1, 6, 0, 0), &tz);
        assert_eq!(date_of(next), Some(ymd(2026, 1, 19)));

        // Far in the future: periods are skipped, not enumerated
        let next = next_occurrence("RRULE:FREQ=DAILY;INTERVAL=3", anchor, utc(2126, 1, 1, 0, 0), &tz);
        let days = (next.unwrap().date_naive() - ymd(2026, 1, 5)).num_days();
        assert_eq!(days % 3, 0);
        assert!(next.unwrap().date_naive() >= ymd(2126, 1, 1));
        assert!(next.unwrap().date_naive() < ymd(2126, 1, 4));
    }

    #[test]
    fn month_days() {
        let tz = Tz::UTC;
        let anchor = Some(utc(2026, 1, 31, 12, 0));
        // February has no 31st
        let next = next_occurrence("RRULE:FREQ=MONTHLY", anchor, utc(2026, 1, 31, 13, 0), &tz);
        assert_eq!(date_of(next), Some(ymd(2026, 3, 31)));

        let next = next_occurrence("RRULE:FREQ=MONTHLY;BYMONTHDAY=-1", anchor, utc(2026, 2, 1, 0, 0), &tz);
        assert_eq!(date_of(next), Some(ymd(2026, 2, 28)));

        let next = next_occurrence("cada mes el dia 1, 15", anchor, utc(2026, 2, 3, 0, 0), &tz);
        assert_eq!(date_of(next), Some(ymd(2026, 2, 15)));
    }

    #[test]
    fn leap_days() {
        let tz = Tz::UTC;
        let anchor = Some(utc(2024, 2, 29, 7, 0));
        let next = next_occurrence("yearly", anchor, utc(2024, 3, 1, 0, 0), &tz);
        assert_eq!(date_of(next), Some(ymd(2028, 2, 29)));
    }

    #[test]
    fn daylight_saving_gaps_move_forward() {
        let tz: Tz = "Europe/Paris".parse().unwrap();
        // 02:30 local does not exist on 2026-03-29
        let anchor = tz.with_ymd_and_hms(2026, 3, 27, 2, 30, 0).unwrap();
        let after = tz.with_ymd_and_hms(2026, 3, 28, 3, 0, 0).unwrap();
        let next = Rule::daily().next_after(&anchor, &after).unwrap();
        assert_eq!(next.date_naive(), ymd(2026, 3, 29));
        assert_eq!((next.hour(), next.minute()), (3, 30));
        assert_eq!(next.with_timezone(&Utc), utc(2026, 3, 29, 1, 30));

        // The day after is back to the usual time
        let next = Rule::daily().next_after(&anchor, &next).unwrap();
        assert_eq!(next.date_naive(), ymd(2026, 3, 30));
        assert_eq!((next.hour(), next.minute()), (2, 30));
    }

    #[test]
    fn unsupported_rules() {
        let tz = Tz::UTC;
        assert_eq!(next_occurrence("", None, utc(2026, 1, 1, 0, 0), &tz), None);
        assert_eq!(next_occurrence("whenever", None, utc(2026, 1, 1, 0, 0), &tz), None);
    }
}
