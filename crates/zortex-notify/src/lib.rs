//! Scheduled notification delivery: persistence, recurrence, delivery
//! channels, and calendar-derived scheduling (spec §4.6).

pub mod channel;
pub mod error;
pub mod manager;
pub mod model;
pub mod recurrence;
pub mod sync;

pub use channel::{Channel, LogChannel};
pub use error::{NotifyError, NotifyResult};
pub use manager::{NotificationManager, NotificationState, TickReport};
pub use model::{NewNotification, Notification, NotificationKind, Recurrence, WeekdaySerde};
pub use recurrence::next_occurrence;
pub use sync::sync;
