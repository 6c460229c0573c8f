//! Parsing of recurrence expressions, either structured (`RRULE:FREQ=...`) or written in English or Spanish

use std::collections::BTreeSet;

use super::{is_valid_month_day, Frequency, Rule, Weekdays};

/// Parse a recurrence expression.
///
/// Accepted forms:
/// * structured rules, e.g. `RRULE:FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,WE` (the `RRULE:` prefix is optional)
/// * short English or Spanish phrases, e.g. `every day`, `every other week`, `every 2 weeks (Mon, Wed)`,
///   `weekdays`, `every month on day 1, 15`, `cada semana`, `todos los lunes y jueves`, `cada mes el dia 15`
///
/// Returns `None` when the expression is empty or not supported.
pub fn parse_expression(text: &str) -> Option<Rule> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if is_structured(trimmed) {
        return parse_rrule(trimmed);
    }
    scan(&tokenize(trimmed), Mode::Expression).map(|scan| scan.rule)
}

/// Look for a recurrence phrase inside a task title.
///
/// Returns the title with the phrase removed, and the rule it describes. \
/// Unlike [`parse_expression`], a bare weekday name is not enough here ("Call Bob monday" is not a
/// recurring task): the phrase must contain a word such as `every`, `cada` or `todos`, or an adverb
/// such as `daily` or `semanal`.
pub fn extract_from_text(title: &str) -> Option<(String, Rule)> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return None;
    }
    let tokens = tokenize(trimmed);
    let scan = scan(&tokens, Mode::Title)?;

    let mut consumed_words = vec![true; trimmed.split_whitespace().count()];
    let mut seen_words = vec![false; consumed_words.len()];
    for (token, consumed) in tokens.iter().zip(scan.consumed.iter()) {
        seen_words[token.word] = true;
        if *consumed == false {
            consumed_words[token.word] = false;
        }
    }

    let kept: Vec<&str> = trimmed.split_whitespace()
        .enumerate()
        .filter(|(idx, _)| seen_words[*idx] == false || consumed_words[*idx] == false)
        .map(|(_, word)| word)
        .collect();
    let clean = trim_punctuation_words(&kept).join(" ");

    if clean.is_empty() {
        Some((trimmed.to_string(), scan.rule))
    } else {
        Some((clean, scan.rule))
    }
}

fn is_structured(text: &str) -> bool {
    let upper = text.to_ascii_uppercase();
    upper.starts_with("RRULE:") || upper.starts_with("FREQ=")
}

fn parse_rrule(text: &str) -> Option<Rule> {
    let upper = text.trim().to_ascii_uppercase();
    let body = upper.strip_prefix("RRULE:").unwrap_or(&upper);

    let mut frequency = None;
    let mut interval = 1;
    let mut weekdays = Weekdays::empty();
    let mut month_days = BTreeSet::new();

    for part in body.split(';').map(str::trim).filter(|p| p.is_empty() == false) {
        let (key, value) = part.split_once('=')?;
        match key.trim() {
            "FREQ" => frequency = Some(Frequency::from_code(value.trim())?),
            "INTERVAL" => {
                interval = value.trim().parse::<u32>().ok()?;
                if interval == 0 {
                    return None;
                }
            },
            "BYDAY" => {
                for code in value.split(',') {
                    weekdays |= Weekdays::from_code(code)?;
                }
            },
            "BYMONTHDAY" => {
                for day in value.split(',') {
                    let day = day.trim().parse::<i32>().ok()?;
                    if is_valid_month_day(day) == false {
                        return None;
                    }
                    month_days.insert(day);
                }
            },
            "WKST" => {},
            _ => {
                log::debug!("Unsupported recurrence part {:?} in {:?}", part, text);
                return None;
            },
        }
    }

    Some(Rule::new(frequency?)
        .every(interval)
        .on_weekdays(weekdays)
        .on_month_days(month_days))
}



#[derive(Clone, Copy, Debug, PartialEq)]
enum Mode {
    /// A whole expression: bare weekday names are enough
    Expression,
    /// A phrase inside a longer title
    Title,
}

#[derive(Debug)]
struct Token {
    /// Index of the whitespace-separated word this token comes from
    word: usize,
    text: String,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Class {
    Prefix,
    Connector,
    Other2,
    Unit { frequency: Frequency, adverb: bool },
    Day(Weekdays),
    Workweek,
    Number(i32),
    Plain,
}

struct Scan {
    rule: Rule,
    consumed: Vec<bool>,
}

fn scan(tokens: &[Token], mode: Mode) -> Option<Scan> {
    let classes: Vec<Class> = tokens.iter().map(|t| classify(&t.text)).collect();
    let mut consumed = vec![false; tokens.len()];

    let has_prefix = classes.iter().any(|c| *c == Class::Prefix);
    let has_workweek = classes.iter().any(|c| *c == Class::Workweek);
    let days_allowed = mode == Mode::Expression || has_prefix;

    // Frequency: the first unit introduced by a prefix or written as an adverb wins
    let introduced = |idx: usize| -> bool {
        match classes[idx] {
            Class::Unit { adverb: true, .. } => true,
            Class::Unit { adverb: false, .. } => {
                let before = idx.checked_sub(1).map(|i| classes[i]);
                let before2 = idx.checked_sub(2).map(|i| classes[i]);
                match (before2, before) {
                    (_, Some(Class::Prefix)) => true,
                    (Some(Class::Prefix), Some(Class::Number(_))) | (Some(Class::Prefix), Some(Class::Other2)) => true,
                    _ => false,
                }
            },
            _ => false,
        }
    };
    let units: Vec<usize> = (0..classes.len())
        .filter(|idx| matches!(classes[*idx], Class::Unit{..}))
        .collect();
    let unit_idx = match units.iter().copied().find(|idx| introduced(*idx)) {
        Some(idx) => Some(idx),
        None if mode == Mode::Expression => units.first().copied(),
        None => None,
    };

    let mut interval = 1;
    let mut month_days = BTreeSet::new();
    let mut frequency = None;

    if let Some(unit_idx) = unit_idx {
        if let Class::Unit { frequency: f, .. } = classes[unit_idx] {
            frequency = Some(f);
        }
        consumed[unit_idx] = true;

        if unit_idx > 0 {
            match classes[unit_idx - 1] {
                Class::Number(n) if n > 0 => {
                    interval = n as u32;
                    consumed[unit_idx - 1] = true;
                },
                Class::Other2 => {
                    interval = 2;
                    consumed[unit_idx - 1] = true;
                },
                _ => {},
            }
        }

        // Month days: "day 1, 15", "el dia 15", "on the 1st and 15th"
        let mut idx = unit_idx + 1;
        while idx < tokens.len() {
            if is_month_day_marker(&tokens[idx].text) == false {
                idx += 1;
                continue;
            }
            let mut found = Vec::new();
            let mut next = idx + 1;
            while next < tokens.len() {
                match classes[next] {
                    Class::Number(n) => {
                        if is_valid_month_day(n) == false {
                            return None;
                        }
                        month_days.insert(n);
                        found.push(next);
                    },
                    Class::Connector if tokens[next].text != "the" => {},
                    _ => break,
                }
                next += 1;
            }
            if found.is_empty() == false {
                consumed[idx] = true;
                for i in found {
                    consumed[i] = true;
                }
            }
            idx = next.max(idx + 1);
        }
    }

    let mut weekdays = Weekdays::empty();
    for (idx, class) in classes.iter().enumerate() {
        match class {
            Class::Day(day) if days_allowed => {
                weekdays |= *day;
                consumed[idx] = true;
            },
            Class::Workweek => {
                weekdays |= Weekdays::WORKWEEK;
                consumed[idx] = true;
            },
            _ => {},
        }
    }

    let frequency = match frequency {
        Some(f) => f,
        None if weekdays.is_empty() == false => Frequency::Weekly,
        None => return None,
    };
    if mode == Mode::Title && unit_idx.is_none() && has_prefix == false && has_workweek == false {
        return None;
    }

    // Glue words belong to the phrase when they sit right before a consumed token
    for idx in (0..tokens.len()).rev() {
        let glue = match classes[idx] {
            Class::Prefix => true,
            Class::Connector => idx > 0 && consumed[idx - 1],
            _ => false,
        };
        if glue && idx + 1 < tokens.len() && consumed[idx + 1] {
            consumed[idx] = true;
        }
    }

    let rule = Rule::new(frequency)
        .every(interval)
        .on_weekdays(weekdays)
        .on_month_days(month_days);
    Some(Scan { rule, consumed })
}

fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    for (word, raw) in text.split_whitespace().enumerate() {
        let mut current = String::new();
        for c in normalize(raw).chars() {
            if c.is_alphanumeric() || (c == '-' && current.is_empty()) {
                current.push(c);
            } else if current.is_empty() == false {
                push_token(&mut tokens, word, std::mem::take(&mut current));
            }
        }
        if current.is_empty() == false {
            push_token(&mut tokens, word, current);
        }
    }
    tokens
}

fn push_token(tokens: &mut Vec<Token>, word: usize, text: String) {
    if text != "-" {
        tokens.push(Token { word, text });
    }
}

fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

fn classify(token: &str) -> Class {
    if let Some(n) = parse_number(token) {
        return Class::Number(n);
    }
    if let Some(day) = weekday(token) {
        return Class::Day(day);
    }
    let unit = |frequency, adverb| Class::Unit { frequency, adverb };
    match token {
        "every" | "each" | "cada" | "todos" | "todas" | "los" | "las" => Class::Prefix,
        "and" | "y" | "e" | "on" | "the" | "el" | "of" | "de" | "del" => Class::Connector,
        "other" | "otro" | "otra" => Class::Other2,

        "day" | "days" | "dia" | "dias" => unit(Frequency::Daily, false),
        "daily" | "diario" | "diaria" | "diariamente" => unit(Frequency::Daily, true),
        "week" | "weeks" | "semana" | "semanas" => unit(Frequency::Weekly, false),
        "weekly" | "semanal" | "semanalmente" => unit(Frequency::Weekly, true),
        "month" | "months" | "mes" | "meses" => unit(Frequency::Monthly, false),
        "monthly" | "mensual" | "mensualmente" => unit(Frequency::Monthly, true),
        "year" | "years" | "ano" | "anos" => unit(Frequency::Yearly, false),
        "yearly" | "annually" | "anual" | "anualmente" => unit(Frequency::Yearly, true),

        "weekday" | "weekdays" | "laborable" | "laborables" => Class::Workweek,
        _ => Class::Plain,
    }
}

fn is_month_day_marker(token: &str) -> bool {
    matches!(token, "day" | "days" | "dia" | "dias" | "the" | "el")
}

fn parse_number(token: &str) -> Option<i32> {
    let number_words = [("two", 2), ("dos", 2), ("three", 3), ("tres", 3), ("four", 4), ("cuatro", 4)];
    if let Some((_, n)) = number_words.iter().find(|(w, _)| *w == token) {
        return Some(*n);
    }
    let digits = ["st", "nd", "rd", "th"].iter()
        .find_map(|suffix| token.strip_suffix(suffix))
        .unwrap_or(token);
    digits.parse::<i32>().ok()
}

fn weekday(token: &str) -> Option<Weekdays> {
    let day = match token {
        "monday" | "mondays" | "mon" | "lunes" | "lun" => Weekdays::MO,
        "tuesday" | "tuesdays" | "tue" | "tues" | "martes" | "mar" => Weekdays::TU,
        "wednesday" | "wednesdays" | "wed" | "miercoles" | "mie" | "mier" => Weekdays::WE,
        "thursday" | "thursdays" | "thu" | "thur" | "thurs" | "jueves" | "jue" => Weekdays::TH,
        "friday" | "fridays" | "fri" | "viernes" | "vie" => Weekdays::FR,
        "saturday" | "saturdays" | "sat" | "sabado" | "sabados" | "sab" => Weekdays::SA,
        "sunday" | "sundays" | "sun" | "domingo" | "domingos" | "dom" => Weekdays::SU,
        _ => return None,
    };
    Some(day)
}

/// Drop leading and trailing words that only contain punctuation
fn trim_punctuation_words<'a>(words: &[&'a str]) -> Vec<&'a str> {
    let has_text = |w: &&str| w.chars().any(|c| c.is_alphanumeric());
    let start = words.iter().position(has_text);
    let end = words.iter().rposition(has_text);
    match (start, end) {
        (Some(s), Some(e)) => words[s..=e].to_vec(),
        _ => Vec::new(),
    }
}
