use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};

/// Non-generic interface the [`crate::manager::PersistenceManager`] uses to
/// batch-flush heterogeneous stores without knowing their state type.
pub trait DirtyStore: Send + Sync {
    /// Save if dirty; returns whether a save actually happened.
    fn save_if_dirty(&self) -> StoreResult<bool>;

    /// Human-readable identifier for logging (the store's file path).
    fn name(&self) -> &str;
}

/// Durable JSON-encoded state for one logical file (spec §4.1).
///
/// `load` is idempotent: a missing file is initialized from `T::default()`
/// and written back; a corrupt file is backed up aside and reinitialized.
/// `save` always goes through a temp-file-then-rename, so a crash between
/// writing the temp file and the rename never leaves a partially written
/// target visible.
pub struct PersistentStore<T> {
    path: PathBuf,
    state: RwLock<T>,
    dirty: AtomicBool,
}

impl<T> PersistentStore<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    /// Load (or initialize) the store backing the given path.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let state = Self::load_or_init(&path)?;
        Ok(Self {
            path,
            state: RwLock::new(state),
            dirty: AtomicBool::new(false),
        })
    }

    fn load_or_init(path: &Path) -> StoreResult<T> {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<T>(&contents) {
                Ok(value) => Ok(value),
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "corrupt state file, backing up and reinitializing"
                    );
                    Self::backup_corrupt_file(path)?;
                    let default = T::default();
                    Self::write_atomic(path, &default)?;
                    Ok(default)
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no existing state file, initializing defaults");
                let default = T::default();
                Self::write_atomic(path, &default)?;
                Ok(default)
            }
            Err(source) => Err(StoreError::io(path.display().to_string(), source)),
        }
    }

    fn backup_corrupt_file(path: &Path) -> StoreResult<()> {
        let epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let backup_path = PathBuf::from(format!("{}.backup.{epoch}", path.display()));
        std::fs::rename(path, &backup_path)
            .map_err(|source| StoreError::io(path.display().to_string(), source))
    }

    fn write_atomic(path: &Path, value: &T) -> StoreResult<()> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)
            .map_err(|source| StoreError::io(parent.display().to_string(), source))?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .map_err(|source| StoreError::io(parent.display().to_string(), source))?;

        let contents = serde_json::to_vec_pretty(value)?;
        tmp.write_all(&contents)
            .map_err(|source| StoreError::io(path.display().to_string(), source))?;
        tmp.flush()
            .map_err(|source| StoreError::io(path.display().to_string(), source))?;

        tmp.persist(path).map_err(|err| {
            let _ = std::fs::remove_file(err.file.path());
            StoreError::io(path.display().to_string(), err.error)
        })?;

        Ok(())
    }

    /// Encode current in-memory state and atomically replace the target
    /// file. On failure, in-memory state (and the dirty flag) are left
    /// untouched so the next flush can retry.
    pub fn save(&self) -> StoreResult<()> {
        let contents = {
            let guard = self.state.read().expect("zortex-store lock poisoned");
            Self::write_atomic(&self.path, &*guard)
        };
        contents?;
        self.dirty.store(false, Ordering::SeqCst);
        debug!(path = %self.path.display(), "store saved");
        Ok(())
    }

    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::SeqCst);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Save only if dirty; returns whether a save happened.
    pub fn save_if_dirty(&self) -> StoreResult<bool> {
        if self.is_dirty() {
            self.save()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Read-only access to the in-memory state.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.state.read().expect("zortex-store lock poisoned");
        f(&guard)
    }

    /// Mutable access; any call marks the store dirty regardless of whether
    /// the closure actually changed anything (matching the spec's
    /// coarse-grained `mark_dirty()` hook).
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let result = {
            let mut guard = self.state.write().expect("zortex-store lock poisoned");
            f(&mut guard)
        };
        self.mark_dirty();
        result
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T> PersistentStore<T>
where
    T: Serialize + DeserializeOwned + Default + Clone,
{
    /// A cloned snapshot of the current state, for read-only consumers
    /// (e.g. the `zortex xp show` CLI command) that shouldn't hold a lock.
    pub fn snapshot(&self) -> T {
        self.state.read().expect("zortex-store lock poisoned").clone()
    }
}

impl<T> DirtyStore for PersistentStore<T>
where
    T: Serialize + DeserializeOwned + Default + Send + Sync,
{
    fn save_if_dirty(&self) -> StoreResult<bool> {
        PersistentStore::save_if_dirty(self)
    }

    fn name(&self) -> &str {
        self.path.to_str().unwrap_or("<store>")
    }
}
