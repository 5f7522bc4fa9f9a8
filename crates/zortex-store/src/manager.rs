use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, error};

use crate::error::StoreResult;
use crate::persistent_store::DirtyStore;

/// Default batching window for coalesced flushes (spec §4.1).
pub const DEFAULT_BATCH_WINDOW: Duration = Duration::from_millis(500);

/// Coalesces dirty marks across every registered store and emits one
/// `save()` per store per batching window, plus a final flush that callers
/// should trigger from their own shutdown path (spec §4.1's
/// `VimLeavePre`-equivalent).
pub struct PersistenceManager {
    stores: Mutex<Vec<Arc<dyn DirtyStore>>>,
    on_saved: Mutex<Option<Box<dyn Fn(&str) + Send + Sync>>>,
}

impl Default for PersistenceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PersistenceManager {
    pub fn new() -> Self {
        Self {
            stores: Mutex::new(Vec::new()),
            on_saved: Mutex::new(None),
        }
    }

    pub fn register(&self, store: Arc<dyn DirtyStore>) {
        self.stores
            .lock()
            .expect("persistence manager lock poisoned")
            .push(store);
    }

    /// Registers a callback invoked with a store's name each time
    /// `flush_all` actually writes it (spec §6 `store:saved`). Replaces any
    /// previously registered callback.
    pub fn on_saved(&self, callback: impl Fn(&str) + Send + Sync + 'static) {
        *self.on_saved.lock().expect("persistence manager lock poisoned") = Some(Box::new(callback));
    }

    /// Flush every registered store that is currently dirty. Continues past
    /// individual failures so one stuck store cannot starve the others;
    /// returns the last error encountered, if any.
    pub fn flush_all(&self) -> StoreResult<()> {
        let stores = self
            .stores
            .lock()
            .expect("persistence manager lock poisoned");

        let mut last_err = None;
        for store in stores.iter() {
            match store.save_if_dirty() {
                Ok(true) => {
                    debug!(store = store.name(), "flushed dirty store");
                    if let Some(callback) = &*self.on_saved.lock().expect("persistence manager lock poisoned") {
                        callback(store.name());
                    }
                }
                Ok(false) => {}
                Err(err) => {
                    error!(store = store.name(), error = %err, "failed to flush store");
                    last_err = Some(err);
                }
            }
        }

        match last_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Drive the batching loop: flush on every tick until `shutdown` fires,
    /// then perform one final flush before returning.
    pub async fn run(
        self: Arc<Self>,
        interval: Duration,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let _ = self.flush_all();
                }
                _ = shutdown.changed() => {
                    let _ = self.flush_all();
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistent_store::PersistentStore;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    struct Fixture {
        value: u32,
    }

    #[tokio::test]
    async fn flush_all_saves_only_dirty_stores() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(PersistentStore::<Fixture>::open(dir.path().join("a.json")).unwrap());
        let manager = PersistenceManager::new();
        manager.register(store.clone());

        manager.flush_all().unwrap();
        assert!(!store.is_dirty());

        store.with_mut(|f| f.value += 1);
        assert!(store.is_dirty());
        manager.flush_all().unwrap();
        assert!(!store.is_dirty());
    }

    #[tokio::test]
    async fn on_saved_fires_only_for_actually_flushed_stores() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(PersistentStore::<Fixture>::open(dir.path().join("a.json")).unwrap());
        let manager = PersistenceManager::new();
        manager.register(store.clone());

        let saved = Arc::new(Mutex::new(Vec::new()));
        let saved_for_callback = saved.clone();
        manager.on_saved(move |name| saved_for_callback.lock().unwrap().push(name.to_string()));

        manager.flush_all().unwrap();
        assert!(saved.lock().unwrap().is_empty());

        store.with_mut(|f| f.value += 1);
        manager.flush_all().unwrap();
        assert_eq!(saved.lock().unwrap().len(), 1);
    }
}
