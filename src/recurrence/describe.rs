//! Human-readable descriptions of recurrence rules

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use super::{Frequency, Rule};

/// The language used to describe rules
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    English,
    Spanish,
}

impl Default for Locale {
    fn default() -> Self {
        Locale::English
    }
}

/// Describe a rule in a short phrase, e.g. `every 2 weeks (Mon, Wed)` or `cada mes el dia 1, 15`.
///
/// The phrase can be parsed back with [`parse_expression`](super::parse_expression).
pub fn describe(rule: &Rule, locale: Locale) -> String {
    let interval = rule.interval();
    let (singular, plural) = unit_words(rule.frequency(), locale);
    let every = match locale {
        Locale::English => "every",
        Locale::Spanish => "cada",
    };

    let mut text = if interval == 1 {
        format!("{} {}", every, singular)
    } else {
        format!("{} {} {}", every, interval, plural)
    };

    if rule.by_month_day().is_empty() == false {
        let days: Vec<String> = rule.by_month_day().iter().map(|d| d.to_string()).collect();
        let marker = match locale {
            Locale::English => "on day",
            Locale::Spanish => "el dia",
        };
        text.push_str(&format!(" {} {}", marker, days.join(", ")));
    }

    let days = rule.by_weekday().days();
    if days.is_empty() == false {
        let labels: Vec<&str> = days.into_iter().map(|d| weekday_label(d, locale)).collect();
        text.push_str(&format!(" ({})", labels.join(", ")));
    }

    text
}

fn unit_words(frequency: Frequency, locale: Locale) -> (&'static str, &'static str) {
    match (frequency, locale) {
        (Frequency::Daily, Locale::English) => ("day", "days"),
        (Frequency::Weekly, Locale::English) => ("week", "weeks"),
        (Frequency::Monthly, Locale::English) => ("month", "months"),
        (Frequency::Yearly, Locale::English) => ("year", "years"),
        (Frequency::Daily, Locale::Spanish) => ("dia", "dias"),
        (Frequency::Weekly, Locale::Spanish) => ("semana", "semanas"),
        (Frequency::Monthly, Locale::Spanish) => ("mes", "meses"),
        (Frequency::Yearly, Locale::Spanish) => ("ano", "anos"),
    }
}

fn weekday_label(day: Weekday, locale: Locale) -> &'static str {
    match locale {
        Locale::English => match day {
            Weekday::Mon => "Mon",
            Weekday::Tue => "Tue",
            Weekday::Wed => "Wed",
            Weekday::Thu => "Thu",
            Weekday::Fri => "Fri",
            Weekday::Sat => "Sat",
            Weekday::Sun => "Sun",
        },
        Locale::Spanish => match day {
            Weekday::Mon => "lun",
            Weekday::Tue => "mar",
            Weekday::Wed => "mie",
            Weekday::Thu => "jue",
            Weekday::Fri => "vie",
            Weekday::Sat => "sab",
            Weekday::Sun => "dom",
        },
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::recurrence::{parse_expression, Weekdays};
    use proptest::prelude::*;

    #[test]
    fn english() {
        assert_eq!(describe(&Rule::daily(), Locale::English), "every day");
        assert_eq!(
            describe(&Rule::weekly().every(2).on_weekdays(Weekdays::MO | Weekdays::WE), Locale::English),
            "every 2 weeks (Mon, Wed)"
        );
        assert_eq!(
            describe(&Rule::monthly().on_month_days(vec![15, 1]), Locale::English),
            "every month on day 1, 15"
        );
    }

    #[test]
    fn spanish() {
        assert_eq!(describe(&Rule::daily().every(3), Locale::Spanish), "cada 3 dias");
        assert_eq!(
            describe(&Rule::weekly().on_weekdays(Weekdays::MO | Weekdays::WE), Locale::Spanish),
            "cada semana (lun, mie)"
        );
        assert_eq!(describe(&Rule::yearly(), Locale::Spanish), "cada ano");
    }

    fn any_rule() -> impl Strategy<Value = Rule> {
        let frequency = prop_oneof![
            Just(Frequency::Daily),
            Just(Frequency::Weekly),
            Just(Frequency::Monthly),
            Just(Frequency::Yearly),
        ];
        let month_day = prop_oneof![1i32..=31, -31i32..=-1];
        (
            frequency,
            1u32..12,
            0u8..128,
            proptest::collection::btree_set(month_day, 0..4),
        ).prop_map(|(frequency, interval, days, month_days)| {
            Rule::new(frequency)
                .every(interval)
                .on_weekdays(Weekdays::from_bits_truncate(days))
                .on_month_days(month_days)
        })
    }

    proptest! {
        #[test]
        fn descriptions_parse_back(rule in any_rule()) {
            for locale in [Locale::English, Locale::Spanish] {
                let text = describe(&rule, locale);
                prop_assert_eq!(parse_expression(&text), Some(rule.clone()), "{}", text);
            }
        }
    }
}
