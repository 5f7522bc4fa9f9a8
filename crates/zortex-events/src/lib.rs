//! Priority-ordered in-process publish/subscribe bus (spec §4.5).

pub mod bus;
pub mod error;

pub use bus::{EventBus, EventKindOf};
pub use error::EventError;
