//! Converts parsed calendar entries into scheduled notifications (spec
//! §4.6 calendar sync).

use chrono::{NaiveDateTime, NaiveTime, TimeZone, Utc};
use zortex_calendar::CalendarEntry;

use crate::manager::NotificationManager;
use crate::model::{NewNotification, NotificationKind};

/// Default hour:minute used for an all-day entry's synthetic trigger time,
/// chosen to land before most people's workday starts.
const ALL_DAY_DEFAULT_TIME: (u32, u32) = (8, 0);

fn entry_time(entry: &CalendarEntry) -> NaiveTime {
    entry
        .from
        .or(entry.at)
        .unwrap_or_else(|| NaiveTime::from_hms_opt(ALL_DAY_DEFAULT_TIME.0, ALL_DAY_DEFAULT_TIME.1, 0).unwrap())
}

fn dedup_key(entry: &CalendarEntry, boundary: &str, advance_minutes: i64) -> String {
    format!(
        "cal_{}_{}_{}_{}",
        entry.date.format("%Y-%m-%d"),
        entry.text_slug(),
        boundary,
        advance_minutes
    )
}

/// Schedules a notification for one (entry, boundary, advance) combination
/// unless a matching dedup key has already fired or is pending. Returns
/// `true` if a new notification was scheduled.
fn sync_one(
    manager: &NotificationManager,
    entry: &CalendarEntry,
    anchor: NaiveTime,
    boundary: &str,
    advance_minutes: i64,
) -> bool {
    let key = dedup_key(entry, boundary, advance_minutes);
    if manager.has_been_sent(&key) || manager.has_pending_dedup(&key) {
        return false;
    }

    let trigger_naive = NaiveDateTime::new(entry.date, anchor) - chrono::Duration::minutes(advance_minutes);
    let trigger_time = Utc.from_utc_datetime(&trigger_naive);

    let scheduled = manager.schedule(NewNotification {
        trigger_time,
        title: entry.text.clone(),
        message: format!("{} ({boundary})", entry.text),
        kind: NotificationKind::Calendar,
        dedup_key: Some(key),
        channels: vec!["log".to_string()],
        recurrence: None,
    });
    scheduled.is_some()
}

/// Converts every parsed [`CalendarEntry`] into scheduled notifications,
/// one per entry per configured advance window, skipping any combination
/// already sent or pending. Safe to call repeatedly over the same entries
/// (spec §8 scenario 4 idempotent resync): already-scheduled or
/// already-fired reminders are never duplicated.
pub fn sync(manager: &NotificationManager, entries: &[CalendarEntry], default_advance_minutes: i64) -> usize {
    let mut scheduled_count = 0;

    for entry in entries {
        let start_anchor = entry_time(entry);
        for advance in entry.notify_advances(default_advance_minutes) {
            if sync_one(manager, entry, start_anchor, "start", advance) {
                scheduled_count += 1;
            }
        }

        if let Some(end) = entry.to {
            for advance in entry.notify_advances(default_advance_minutes) {
                if sync_one(manager, entry, end, "end", advance) {
                    scheduled_count += 1;
                }
            }
        }
    }

    scheduled_count
}
