//! Application wiring shared by the `zortex` binary's subcommands: load
//! configuration, open the XP and notification stores, and hook the XP
//! service onto the event bus.

pub mod app;
pub mod error;

pub use app::App;
pub use error::{AppError, AppResult};
