//! `NotificationManager`: schedules, dedups, and delivers notifications
//! (spec §4.6).

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use zortex_store::{DirtyStore, PersistentStore, StoreResult};

use crate::channel::Channel;
use crate::error::{NotifyError, NotifyResult};
use crate::model::{NewNotification, Notification};
use crate::recurrence::next_occurrence;

/// The persisted shape from spec §4.6. `pomodoro` and `digest` are opaque
/// passthrough blobs: their internal shape belongs to modules this crate
/// doesn't implement, but the state file keeps a slot for them so a future
/// module can use the same file without a migration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationState {
    pub scheduled: BTreeMap<String, Notification>,
    pub sent: BTreeMap<String, i64>,
    #[serde(default)]
    pub pomodoro: serde_json::Value,
    #[serde(default)]
    pub digest: serde_json::Value,
}

/// Outcome of a single [`NotificationManager::tick`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub delivered: Vec<String>,
    pub rescheduled: Vec<String>,
    pub failed: Vec<(String, String)>,
}

/// Owns the scheduled/sent notification ledger (spec §4.6). Delivery
/// channels are supplied per-tick rather than stored, so callers can swap
/// them (tests use no channels at all; a CLI wires in [`crate::channel::LogChannel`]
/// plus whatever else it registers).
pub struct NotificationManager {
    persistent: Arc<PersistentStore<NotificationState>>,
}

impl NotificationManager {
    pub fn open(path: impl Into<std::path::PathBuf>) -> NotifyResult<Self> {
        let persistent = Arc::new(PersistentStore::open(path)?);
        Ok(Self { persistent })
    }

    pub fn persistence_handle(&self) -> Arc<dyn DirtyStore> {
        self.persistent.clone()
    }

    pub fn save(&self) -> StoreResult<()> {
        self.persistent.save()
    }

    pub fn snapshot(&self) -> NotificationState {
        self.persistent.snapshot()
    }

    /// True if `dedup_key` has already fired (spec §4.6 dedup rule).
    pub fn has_been_sent(&self, dedup_key: &str) -> bool {
        self.persistent.with(|s| s.sent.contains_key(dedup_key))
    }

    /// True if a notification carrying `dedup_key` is already scheduled
    /// (covers the idempotent-resync case where the dedup key hasn't fired
    /// yet but would otherwise be duplicated).
    pub fn has_pending_dedup(&self, dedup_key: &str) -> bool {
        self.persistent.with(|s| {
            s.scheduled
                .values()
                .any(|n| n.dedup_key.as_deref() == Some(dedup_key))
        })
    }

    /// Schedules a new notification, skipping it if its dedup key has
    /// already fired or is already pending (spec §4.6, spec §8 scenario 4
    /// idempotent resync). Returns the assigned id, or `None` if skipped.
    pub fn schedule(&self, new: NewNotification) -> Option<String> {
        if let Some(key) = &new.dedup_key {
            if self.has_been_sent(key) || self.has_pending_dedup(key) {
                debug!(dedup_key = %key, "skipping duplicate notification");
                return None;
            }
        }

        let id = uuid::Uuid::new_v4().to_string();
        let notification = Notification {
            id: id.clone(),
            trigger_time: new.trigger_time,
            title: new.title,
            message: new.message,
            kind: new.kind,
            dedup_key: new.dedup_key,
            channels: new.channels,
            recurrence: new.recurrence,
        };
        self.persistent.with_mut(|state| {
            state.scheduled.insert(id.clone(), notification);
        });
        Some(id)
    }

    pub fn cancel(&self, id: &str) -> NotifyResult<()> {
        self.persistent.with_mut(|state| state.scheduled.remove(id));
        Ok(())
    }

    /// Pushes `id`'s trigger time forward by `minutes`, leaving everything
    /// else (including dedup key) unchanged.
    pub fn snooze(&self, id: &str, minutes: i64) -> NotifyResult<()> {
        let found = self.persistent.with_mut(|state| {
            if let Some(n) = state.scheduled.get_mut(id) {
                n.trigger_time += chrono::Duration::minutes(minutes);
                true
            } else {
                false
            }
        });
        if found {
            Ok(())
        } else {
            Err(NotifyError::NotFound(id.to_string()))
        }
    }

    /// Delivers every notification due at or before `now`. A notification
    /// whose `dedup_key` already fired is dropped without sending (spec
    /// §4.6 step 2). Otherwise it is sent through each of its channels; only
    /// on full success (every channel ok, at least one channel) is the
    /// dedup key recorded as sent, any recurrence rescheduled, and the
    /// notification removed from `scheduled` (spec §4.6 step 4). A
    /// notification with any channel failure, an unknown channel, or an
    /// empty channel set is left in `scheduled` untouched, to be retried on
    /// the next tick — the dedup key is not consumed, so no delivery is
    /// silently dropped.
    pub fn tick(&self, now: DateTime<Utc>, channels: &HashMap<String, Arc<dyn Channel>>) -> TickReport {
        let due: Vec<Notification> = self.persistent.with(|state| {
            state
                .scheduled
                .values()
                .filter(|n| n.trigger_time <= now)
                .cloned()
                .collect()
        });

        let mut report = TickReport::default();

        for notification in due {
            if let Some(key) = &notification.dedup_key {
                if self.has_been_sent(key) {
                    debug!(id = %notification.id, dedup_key = %key, "dropping already-sent notification without resending");
                    self.persistent.with_mut(|state| {
                        state.scheduled.remove(&notification.id);
                    });
                    continue;
                }
            }

            let mut all_ok = true;
            for channel_name in &notification.channels {
                match channels.get(channel_name) {
                    Some(channel) => {
                        if let Err(err) = channel.send(&notification) {
                            warn!(id = %notification.id, channel = %channel_name, error = %err, "delivery failed");
                            report.failed.push((notification.id.clone(), err.to_string()));
                            all_ok = false;
                        }
                    }
                    None => {
                        warn!(id = %notification.id, channel = %channel_name, "unknown channel");
                        report.failed.push((notification.id.clone(), format!("unknown channel {channel_name}")));
                        all_ok = false;
                    }
                }
            }

            let delivered = all_ok && !notification.channels.is_empty();
            if !delivered {
                continue;
            }

            report.delivered.push(notification.id.clone());

            self.persistent.with_mut(|state| {
                state.scheduled.remove(&notification.id);

                if let Some(key) = &notification.dedup_key {
                    state.sent.insert(key.clone(), now.timestamp());
                }

                if let Some(rule) = &notification.recurrence {
                    let next_time = next_occurrence(notification.trigger_time, rule);
                    let next_id = uuid::Uuid::new_v4().to_string();
                    state.scheduled.insert(
                        next_id.clone(),
                        Notification {
                            id: next_id,
                            trigger_time: next_time,
                            dedup_key: None,
                            ..notification.clone()
                        },
                    );
                }
            });

            if notification.recurrence.is_some() {
                report.rescheduled.push(notification.id.clone());
            }
        }

        report
    }

    /// Drives the tick loop on a fixed interval until `shutdown` fires,
    /// mirroring [`zortex_store::PersistenceManager::run`]'s shape.
    pub async fn run(
        self: Arc<Self>,
        interval: Duration,
        channels: Arc<HashMap<String, Arc<dyn Channel>>>,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.tick(Utc::now(), &channels);
                    if !report.delivered.is_empty() || !report.failed.is_empty() {
                        debug!(delivered = report.delivered.len(), failed = report.failed.len(), "notification tick");
                    }
                }
                _ = shutdown.changed() => {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::LogChannel;
    use crate::model::{NotificationKind, Recurrence};

    fn channels() -> HashMap<String, Arc<dyn Channel>> {
        let mut map: HashMap<String, Arc<dyn Channel>> = HashMap::new();
        map.insert("log".to_string(), Arc::new(LogChannel::default()));
        map
    }

    fn new_notification(trigger_time: DateTime<Utc>, dedup_key: Option<&str>) -> NewNotification {
        NewNotification {
            trigger_time,
            title: "Standup".to_string(),
            message: "Standup starts soon".to_string(),
            kind: NotificationKind::Calendar,
            dedup_key: dedup_key.map(|s| s.to_string()),
            channels: vec!["log".to_string()],
            recurrence: None,
        }
    }

    #[test]
    fn schedule_then_tick_delivers_and_removes() {
        let dir = tempfile::tempdir().unwrap();
        let manager = NotificationManager::open(dir.path().join("notify.json")).unwrap();
        let now = Utc::now();
        let id = manager.schedule(new_notification(now, None)).unwrap();

        let report = manager.tick(now, &channels());
        assert_eq!(report.delivered, vec![id]);
        assert!(manager.snapshot().scheduled.is_empty());
    }

    #[test]
    fn future_notifications_are_not_delivered_yet() {
        let dir = tempfile::tempdir().unwrap();
        let manager = NotificationManager::open(dir.path().join("notify.json")).unwrap();
        let now = Utc::now();
        manager.schedule(new_notification(now + chrono::Duration::hours(1), None));

        let report = manager.tick(now, &channels());
        assert!(report.delivered.is_empty());
        assert_eq!(manager.snapshot().scheduled.len(), 1);
    }

    #[test]
    fn duplicate_dedup_key_is_skipped_while_pending() {
        let dir = tempfile::tempdir().unwrap();
        let manager = NotificationManager::open(dir.path().join("notify.json")).unwrap();
        let now = Utc::now();
        let first = manager.schedule(new_notification(now, Some("cal_x")));
        let second = manager.schedule(new_notification(now, Some("cal_x")));
        assert!(first.is_some());
        assert!(second.is_none());
    }

    #[test]
    fn duplicate_dedup_key_is_skipped_after_sent() {
        let dir = tempfile::tempdir().unwrap();
        let manager = NotificationManager::open(dir.path().join("notify.json")).unwrap();
        let now = Utc::now();
        manager.schedule(new_notification(now, Some("cal_x")));
        manager.tick(now, &channels());
        assert!(manager.has_been_sent("cal_x"));

        let third = manager.schedule(new_notification(now, Some("cal_x")));
        assert!(third.is_none());
    }

    #[test]
    fn recurring_notification_reschedules_after_delivery() {
        let dir = tempfile::tempdir().unwrap();
        let manager = NotificationManager::open(dir.path().join("notify.json")).unwrap();
        let now = Utc::now();
        let mut new = new_notification(now, None);
        new.recurrence = Some(Recurrence::Daily);
        manager.schedule(new);

        let report = manager.tick(now, &channels());
        assert_eq!(report.delivered.len(), 1);
        assert_eq!(report.rescheduled.len(), 1);

        let snap = manager.snapshot();
        assert_eq!(snap.scheduled.len(), 1);
        let rescheduled = snap.scheduled.values().next().unwrap();
        assert_eq!(rescheduled.trigger_time.date_naive(), (now + chrono::Duration::days(1)).date_naive());
    }

    #[test]
    fn cancel_removes_a_pending_notification() {
        let dir = tempfile::tempdir().unwrap();
        let manager = NotificationManager::open(dir.path().join("notify.json")).unwrap();
        let now = Utc::now();
        let id = manager.schedule(new_notification(now + chrono::Duration::hours(1), None)).unwrap();
        manager.cancel(&id).unwrap();
        assert!(manager.snapshot().scheduled.is_empty());
    }

    #[test]
    fn snooze_pushes_trigger_time_forward() {
        let dir = tempfile::tempdir().unwrap();
        let manager = NotificationManager::open(dir.path().join("notify.json")).unwrap();
        let now = Utc::now();
        let id = manager.schedule(new_notification(now, None)).unwrap();
        manager.snooze(&id, 10).unwrap();

        let report = manager.tick(now, &channels());
        assert!(report.delivered.is_empty());

        let report = manager.tick(now + chrono::Duration::minutes(10), &channels());
        assert_eq!(report.delivered, vec![id]);
    }

    #[test]
    fn snooze_unknown_id_errors() {
        let dir = tempfile::tempdir().unwrap();
        let manager = NotificationManager::open(dir.path().join("notify.json")).unwrap();
        assert!(matches!(manager.snooze("missing", 5), Err(NotifyError::NotFound(_))));
    }

    #[test]
    fn unknown_channel_retains_notification_and_does_not_consume_dedup_key() {
        let dir = tempfile::tempdir().unwrap();
        let manager = NotificationManager::open(dir.path().join("notify.json")).unwrap();
        let now = Utc::now();
        let mut new = new_notification(now, Some("cal_x"));
        new.channels = vec!["missing".to_string()];
        let id = manager.schedule(new).unwrap();

        let report = manager.tick(now, &channels());
        assert!(report.delivered.is_empty());
        assert_eq!(report.failed.len(), 1);
        assert!(!manager.has_been_sent("cal_x"));
        assert_eq!(manager.snapshot().scheduled.len(), 1);
        assert!(manager.snapshot().scheduled.contains_key(&id));
    }

    #[test]
    fn empty_channel_set_retains_notification_until_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let manager = NotificationManager::open(dir.path().join("notify.json")).unwrap();
        let now = Utc::now();
        let mut new = new_notification(now, None);
        new.channels = vec![];
        manager.schedule(new);

        let report = manager.tick(now, &channels());
        assert!(report.delivered.is_empty());
        assert!(report.failed.is_empty());
        assert_eq!(manager.snapshot().scheduled.len(), 1);
    }

    #[test]
    fn already_sent_dedup_key_is_dropped_without_resending() {
        let dir = tempfile::tempdir().unwrap();
        let manager = NotificationManager::open(dir.path().join("notify.json")).unwrap();
        let now = Utc::now();
        manager.persistent.with_mut(|state| {
            state.sent.insert("cal_x".to_string(), now.timestamp());
            state.scheduled.insert(
                "stray".to_string(),
                Notification {
                    id: "stray".to_string(),
                    trigger_time: now,
                    title: "Standup".to_string(),
                    message: "Standup starts soon".to_string(),
                    kind: NotificationKind::Calendar,
                    dedup_key: Some("cal_x".to_string()),
                    channels: vec!["log".to_string()],
                    recurrence: None,
                },
            );
        });

        let report = manager.tick(now, &channels());
        assert!(report.delivered.is_empty());
        assert!(report.failed.is_empty());
        assert!(manager.snapshot().scheduled.is_empty());
    }
}
