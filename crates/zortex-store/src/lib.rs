//! Durable JSON-encoded key/value persistence with atomic writes.
//!
//! [`PersistentStore`] owns a single logical state file; [`PersistenceManager`]
//! coalesces dirty marks across many stores into batched flushes.

pub mod error;
pub mod manager;
pub mod persistent_store;

pub use error::{StoreError, StoreResult};
pub use manager::{PersistenceManager, DEFAULT_BATCH_WINDOW};
pub use persistent_store::{DirtyStore, PersistentStore};
