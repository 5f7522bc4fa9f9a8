//! Line-grammar parser for the calendar source format (spec §6). The core
//! only consumes already-parsed entries; this module exists because
//! [`crate::sync`]-adjacent consumers (`zortex-notify`'s `CalendarSync`)
//! need a concrete producer even though calendar file storage and editing
//! UI are out of scope.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};
use tracing::warn;

use crate::entry::{AttributeValue, CalendarEntry};
use crate::error::{CalendarError, CalendarResult};

/// Parses a full calendar source document into its entries. Lines preceding
/// the first date header are skipped with a warning rather than failing the
/// whole parse, matching the tolerant-reader posture used throughout this
/// system (spec §7: readers recover rather than abort).
pub fn parse(source: &str) -> CalendarResult<Vec<CalendarEntry>> {
    let mut entries = Vec::new();
    let mut current_date: Option<NaiveDate> = None;

    for (idx, raw_line) in source.lines().enumerate() {
        let line_number = idx + 1;
        let trimmed_end = raw_line.trim_end();
        if trimmed_end.trim().is_empty() {
            continue;
        }

        if let Some(date_text) = trimmed_end.trim().strip_suffix(':') {
            if let Ok(date) = NaiveDate::parse_from_str(date_text, "%Y-%m-%d") {
                current_date = Some(date);
                continue;
            }
            if looks_like_date_header(trimmed_end.trim()) {
                return Err(CalendarError::BadDateHeader { line: line_number, text: trimmed_end.to_string() });
            }
        }

        let Some(date) = current_date else {
            warn!(line = line_number, "calendar entry before any date section, skipping");
            continue;
        };

        let body = strip_entry_prefix(trimmed_end.trim());
        if let Some(entry) = parse_entry_line(date, body) {
            entries.push(entry);
        }
    }

    Ok(entries)
}

fn looks_like_date_header(candidate: &str) -> bool {
    let digits_and_dashes = candidate.trim_end_matches(':');
    digits_and_dashes.len() == 10
        && digits_and_dashes.as_bytes()[4] == b'-'
        && digits_and_dashes.as_bytes()[7] == b'-'
        && digits_and_dashes.chars().enumerate().all(|(i, c)| {
            if i == 4 || i == 7 {
                c == '-'
            } else {
                c.is_ascii_digit()
            }
        })
}

fn strip_entry_prefix(line: &str) -> &str {
    line.strip_prefix('-').map(str::trim_start).unwrap_or(line)
}

fn parse_entry_line(date: NaiveDate, body: &str) -> Option<CalendarEntry> {
    if body.is_empty() {
        return None;
    }
    let (without_attrs, attributes) = extract_attributes(body);
    let tokens: Vec<&str> = without_attrs.split_whitespace().collect();

    let (from, to, at, text_tokens): (Option<NaiveTime>, Option<NaiveTime>, Option<NaiveTime>, &[&str]) =
        match tokens.first().and_then(|t| parse_time(t)) {
            Some(start) if tokens.get(1) == Some(&"-") && tokens.get(2).and_then(|t| parse_time(t)).is_some() => {
                let end = parse_time(tokens[2]).expect("checked above");
                (Some(start), Some(end), None, &tokens[3..])
            }
            Some(start) => (None, None, Some(start), &tokens[1..]),
            None => (None, None, None, &tokens[..]),
        };

    Some(CalendarEntry { date, text: text_tokens.join(" "), from, to, at, attributes })
}

fn parse_time(token: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(token, "%H:%M").ok()
}

fn extract_attributes(line: &str) -> (String, BTreeMap<String, AttributeValue>) {
    let mut attrs = BTreeMap::new();
    let mut remainder = String::new();
    let mut cursor = line;

    loop {
        match cursor.find('@') {
            None => {
                remainder.push_str(cursor);
                break;
            }
            Some(at_pos) => {
                let (before, after_at_inclusive) = cursor.split_at(at_pos);
                let after_at = &after_at_inclusive[1..];

                if let Some(open_idx) = after_at.find('(') {
                    let name = &after_at[..open_idx];
                    let valid_name = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
                    if valid_name {
                        if let Some(close_rel) = after_at[open_idx..].find(')') {
                            let value_str = &after_at[open_idx + 1..open_idx + close_rel];
                            remainder.push_str(before);
                            attrs.insert(name.to_string(), parse_attribute_value(value_str));
                            cursor = &after_at[open_idx + close_rel + 1..];
                            continue;
                        }
                    }
                }

                remainder.push_str(before);
                remainder.push('@');
                cursor = after_at;
            }
        }
    }

    (remainder.trim().to_string(), attrs)
}

fn parse_attribute_value(raw: &str) -> AttributeValue {
    let trimmed = raw.trim();
    if let Some(inner) = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        AttributeValue::List(
            inner
                .split(',')
                .map(|s| s.trim().trim_matches('"').to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        )
    } else {
        AttributeValue::Scalar(trimmed.trim_matches('"').to_string())
    }
}
