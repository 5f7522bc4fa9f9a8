//! Month/year-aware recurrence math (spec §4.6).

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc, Weekday};

use crate::model::Recurrence;

fn days_in_month(year: i32, month: u32) -> u32 {
    let this_month_first = NaiveDate::from_ymd_opt(year, month, 1).expect("valid calendar date");
    let next_month_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .expect("valid calendar date");
    (next_month_first - this_month_first).num_days() as u32
}

/// Adds `months` to `date`, clamping the day to the target month's maximum
/// (Jan 31 + 1 month → Feb 28/29; Feb 29 + 12 months on a non-leap year →
/// Feb 28).
fn add_months_clamped(date: NaiveDate, months: i32) -> NaiveDate {
    let total = date.year() * 12 + date.month0() as i32 + months;
    let year = total.div_euclid(12);
    let month = total.rem_euclid(12) as u32 + 1;
    let day = date.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).expect("clamped day is valid")
}

fn next_matching_weekday(from: NaiveDate, matches: impl Fn(Weekday) -> bool) -> NaiveDate {
    let mut day = from.succ_opt().expect("date within chrono's representable range");
    loop {
        if matches(day.weekday()) {
            return day;
        }
        day = day.succ_opt().expect("date within chrono's representable range");
    }
}

/// Computes the next occurrence after `current` fires, per `rule` (spec
/// §4.6 Recurrence rules).
pub fn next_occurrence(current: DateTime<Utc>, rule: &Recurrence) -> DateTime<Utc> {
    let date = current.date_naive();
    let time = current.time();

    let next_date = match rule {
        Recurrence::Daily => date.succ_opt().expect("date within chrono's representable range"),
        Recurrence::Weekly => date + chrono::Duration::days(7),
        Recurrence::Monthly => add_months_clamped(date, 1),
        Recurrence::Yearly => add_months_clamped(date, 12),
        Recurrence::Weekdays => next_matching_weekday(date, |w| !matches!(w, Weekday::Sat | Weekday::Sun)),
        Recurrence::Weekends => next_matching_weekday(date, |w| matches!(w, Weekday::Sat | Weekday::Sun)),
        Recurrence::DaysOfWeek(set) => {
            next_matching_weekday(date, |w| set.iter().any(|d| d.to_weekday() == w))
        }
    };

    Utc.from_utc_datetime(&NaiveDateTime::new(next_date, time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WeekdaySerde;
    use chrono::NaiveTime;
    use std::collections::BTreeSet;

    fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.from_utc_datetime(&NaiveDateTime::new(
            NaiveDate::from_ymd_opt(year, month, day).unwrap(),
            NaiveTime::from_hms_opt(hour, minute, 0).unwrap(),
        ))
    }

    #[test]
    fn daily_advances_one_day() {
        let next = next_occurrence(at(2026, 1, 1, 9, 0), &Recurrence::Daily);
        assert_eq!(next, at(2026, 1, 2, 9, 0));
    }

    #[test]
    fn monthly_clamps_to_month_end() {
        let next = next_occurrence(at(2026, 1, 31, 9, 0), &Recurrence::Monthly);
        assert_eq!(next, at(2026, 2, 28, 9, 0));
    }

    #[test]
    fn yearly_from_leap_day_collapses_to_feb_28() {
        let next = next_occurrence(at(2024, 2, 29, 9, 0), &Recurrence::Yearly);
        assert_eq!(next, at(2025, 2, 28, 9, 0));
    }

    #[test]
    fn weekdays_skip_the_weekend() {
        // 2026-01-02 is a Friday.
        let next = next_occurrence(at(2026, 1, 2, 9, 0), &Recurrence::Weekdays);
        assert_eq!(next.weekday(), Weekday::Mon);
    }

    #[test]
    fn weekends_skip_weekdays() {
        let next = next_occurrence(at(2026, 1, 2, 9, 0), &Recurrence::Weekends);
        assert_eq!(next.weekday(), Weekday::Sat);
    }

    #[test]
    fn custom_day_of_week_set_picks_next_match() {
        let mut set = BTreeSet::new();
        set.insert(WeekdaySerde::from(Weekday::Wed));
        let next = next_occurrence(at(2026, 1, 2, 9, 0), &Recurrence::DaysOfWeek(set));
        assert_eq!(next.weekday(), Weekday::Wed);
    }
}
