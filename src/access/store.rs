use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

use crate::access::record::{AccessMap, SubjectKey};
use crate::fsutil;

/// Durable store for the subject-to-GrantRecord mapping
///
/// Every operation is an independent load-modify-save cycle against the
/// backing file; there is no in-memory cache, so the file is the sole
/// source of truth between calls. A store-scoped mutex serializes the
/// cycles so concurrent writers cannot clobber each other with stale
/// snapshots.
pub struct AccessStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl AccessStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read the full mapping
    ///
    /// A missing file yields an empty mapping. An unreadable or
    /// malformed file also yields an empty mapping: availability is
    /// preferred over failing the caller, at the documented cost of
    /// resetting every subject to bootstrap state.
    pub fn load(&self) -> AccessMap {
        let _guard = self.guard();
        self.load_unlocked()
    }

    fn load_unlocked(&self) -> AccessMap {
        if !self.path.exists() {
            return AccessMap::new();
        }

        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                warn!(
                    "Failed to read access store {}: {e}; treating as empty",
                    self.path.display()
                );
                return AccessMap::new();
            }
        };

        match serde_json::from_str(&content) {
            Ok(map) => map,
            Err(e) => {
                warn!(
                    "Access store {} is malformed: {e}; treating as empty",
                    self.path.display()
                );
                AccessMap::new()
            }
        }
    }

    /// Atomically replace the backing file with the serialized mapping
    pub fn save(&self, map: &AccessMap) -> Result<()> {
        let _guard = self.guard();
        self.save_unlocked(map)
    }

    fn save_unlocked(&self, map: &AccessMap) -> Result<()> {
        let content =
            serde_json::to_string_pretty(map).context("Failed to serialize access store")?;

        fsutil::atomic_write(&self.path, content.as_bytes())
            .with_context(|| format!("Failed to write access store: {}", self.path.display()))?;

        Ok(())
    }

    /// Run one exclusive load-modify-save cycle
    ///
    /// The mapping passed to `mutate` is freshly loaded from disk, so
    /// updates other writers made to unrelated subjects are preserved.
    pub fn update<T>(&self, mutate: impl FnOnce(&mut AccessMap) -> T) -> Result<T> {
        let _guard = self.guard();
        let mut map = self.load_unlocked();
        let out = mutate(&mut map);
        self.save_unlocked(&map)?;
        Ok(out)
    }

    /// Remove one subject's record; absent keys are a no-op
    pub fn delete(&self, key: &SubjectKey) -> Result<bool> {
        let storage_key = key.storage_key();
        let removed = self.update(|map| map.remove(&storage_key).is_some())?;
        if removed {
            debug!("Deleted access record for {key}");
        }
        Ok(removed)
    }
}
