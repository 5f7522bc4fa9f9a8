use std::collections::BTreeSet;

use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Calendar,
    Pomodoro,
    Alarm,
}

/// Recurrence rules a [`Notification`] reschedules itself under after a
/// successful delivery (spec §4.6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recurrence {
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Weekdays,
    Weekends,
    DaysOfWeek(BTreeSet<WeekdaySerde>),
}

/// `chrono::Weekday` doesn't implement `Serialize`/`Deserialize`/`Ord`
/// directly in all versions this workspace targets; wrap it so a custom
/// day-of-week recurrence set can be persisted and ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WeekdaySerde(pub u8);

impl From<Weekday> for WeekdaySerde {
    fn from(w: Weekday) -> Self {
        WeekdaySerde(w.num_days_from_monday())
    }
}

impl WeekdaySerde {
    pub fn to_weekday(self) -> Weekday {
        match self.0 % 7 {
            0 => Weekday::Mon,
            1 => Weekday::Tue,
            2 => Weekday::Wed,
            3 => Weekday::Thu,
            4 => Weekday::Fri,
            5 => Weekday::Sat,
            _ => Weekday::Sun,
        }
    }
}

/// A scheduled notification (spec §3 "Scheduled Notification").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub trigger_time: DateTime<Utc>,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub dedup_key: Option<String>,
    pub channels: Vec<String>,
    pub recurrence: Option<Recurrence>,
}

/// Fields needed to schedule a new notification; `id` is assigned by
/// [`crate::manager::NotificationManager::schedule`].
pub struct NewNotification {
    pub trigger_time: DateTime<Utc>,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub dedup_key: Option<String>,
    pub channels: Vec<String>,
    pub recurrence: Option<Recurrence>,
}
