use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};

/// The value carried by an `@name(value)` attribute (spec §6): either a
/// bare scalar (`@notify(no)`) or a bracketed list (`@notify([15, 30])`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    Scalar(String),
    List(Vec<String>),
}

/// One parsed calendar entry: a date-stamped line of text, optionally timed
/// and optionally carrying `@name(value)` attributes (spec §6 "Calendar
/// source format").
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEntry {
    pub date: NaiveDate,
    pub text: String,
    pub from: Option<NaiveTime>,
    pub to: Option<NaiveTime>,
    pub at: Option<NaiveTime>,
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl CalendarEntry {
    /// A stable slug of this entry's text, used to build dedup keys (spec
    /// §4.6 `cal_<date>_<text-slug>_<start|end>_<advance>`).
    pub fn text_slug(&self) -> String {
        let mut slug = String::with_capacity(self.text.len());
        let mut last_was_sep = false;
        for c in self.text.chars() {
            if c.is_ascii_alphanumeric() {
                slug.push(c);
                last_was_sep = false;
            } else if !last_was_sep {
                slug.push('_');
                last_was_sep = true;
            }
        }
        slug.trim_matches('_').to_string()
    }

    /// Resolves the `notify` attribute into a list of advance-minute
    /// offsets (spec §4.6 Calendar-derived scheduling). `@notify(no)`
    /// suppresses notifications; an empty list falls back to
    /// `default_advance_minutes`; absence of the attribute means no
    /// notifications are derived for this entry.
    pub fn notify_advances(&self, default_advance_minutes: i64) -> Vec<i64> {
        match self.attributes.get("notify") {
            None => Vec::new(),
            Some(AttributeValue::Scalar(s)) if s.eq_ignore_ascii_case("no") => Vec::new(),
            Some(AttributeValue::Scalar(s)) => s.parse::<i64>().ok().into_iter().collect(),
            Some(AttributeValue::List(items)) if items.is_empty() => vec![default_advance_minutes],
            Some(AttributeValue::List(items)) => items.iter().filter_map(|s| s.parse::<i64>().ok()).collect(),
        }
    }
}
