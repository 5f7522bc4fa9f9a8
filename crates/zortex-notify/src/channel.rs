//! Delivery channels (spec §4.6 "send via each channel").

use crate::error::NotifyResult;
use crate::model::Notification;

/// A destination a [`Notification`] can be delivered through. Implementors
/// are registered by name with the manager's `channels` map and selected by
/// [`Notification::channels`].
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;
    fn send(&self, notification: &Notification) -> NotifyResult<()>;
}

/// Delivers notifications through the tracing log at info level. The
/// default and only channel this crate ships; desktop/OS-level delivery is
/// left to a downstream consumer implementing [`Channel`] itself.
pub struct LogChannel {
    name: String,
}

impl LogChannel {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for LogChannel {
    fn default() -> Self {
        Self::new("log")
    }
}

impl Channel for LogChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, notification: &Notification) -> NotifyResult<()> {
        tracing::info!(
            id = %notification.id,
            kind = ?notification.kind,
            title = %notification.title,
            message = %notification.message,
            "notification delivered"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NotificationKind;
    use chrono::Utc;

    #[test]
    fn log_channel_always_succeeds() {
        let channel = LogChannel::default();
        let notification = Notification {
            id: "n1".to_string(),
            trigger_time: Utc::now(),
            title: "Standup".to_string(),
            message: "Standup starts in 10 minutes".to_string(),
            kind: NotificationKind::Calendar,
            dedup_key: None,
            channels: vec!["log".to_string()],
            recurrence: None,
        };
        assert!(channel.send(&notification).is_ok());
        assert_eq!(channel.name(), "log");
    }
}
