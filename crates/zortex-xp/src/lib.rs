//! The XP data model, calculator, ledger store, and orchestrating service
//! (spec §3, §4.2–§4.4).

pub mod calculator;
pub mod error;
pub mod event;
pub mod model;
pub mod service;
pub mod store;

pub use error::{XpError, XpResult};
pub use event::{DocContext, Event};
pub use model::*;
pub use service::{build_context, XpContext, XpService};
pub use store::{RecordOutcome, XpState, XpStore};
