//! Lazily constructed shared managers.
//!
//! # Responsibility
//! - Hold one manager instance per repository and hand out shared handles.
//! - Serve level definitions from a versioned cache collection.
//!
//! # Invariants
//! - The holder lock covers check-and-construct only; it is never held while
//!   callers use the manager.
//! - Every level mutation sweeps the whole level cache namespace.

use crate::cache::{get_typed, set_typed};
use crate::model::{EntityKind, Level};
use crate::repo::cache_layer::CacheLayer;
use crate::repo::clock::unix_now;
use crate::repo::RepoResult;
use crate::store::{MemberStore, SelectQuery, Store};
use log::{info, warn};
use std::sync::{Arc, Mutex, PoisonError};

/// Single-instance holder owned by its composition root.
pub struct SharedManager<T> {
    slot: Mutex<Option<Arc<T>>>,
}

impl<T> Default for SharedManager<T> {
    fn default() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }
}

impl<T> SharedManager<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the shared instance, constructing it with `init` on first use.
    ///
    /// Concurrent first callers block on the holder lock; exactly one runs
    /// `init` and all of them receive the same `Arc`.
    pub fn get_or_init(&self, init: impl FnOnce() -> T) -> Arc<T> {
        // The slot is either empty or fully set, so a poisoned lock is still usable.
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = slot.as_ref() {
            return Arc::clone(existing);
        }
        let created = Arc::new(init());
        *slot = Some(Arc::clone(&created));
        info!(
            "event=manager_init module=manager status=ok manager={}",
            std::any::type_name::<T>()
        );
        created
    }

    /// The instance if it was already constructed.
    pub fn get(&self) -> Option<Arc<T>> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(Arc::clone)
    }
}

/// Level definitions with collection caching.
pub struct LevelManager {
    store: Arc<dyn MemberStore>,
    layer: CacheLayer,
}

impl LevelManager {
    pub(crate) fn new(store: Arc<dyn MemberStore>, layer: CacheLayer) -> Self {
        Self { store, layer }
    }

    /// Every level ordered by id.
    pub fn levels(&self) -> RepoResult<Vec<Level>> {
        if let Some(levels) = self.cached_levels() {
            return Ok(levels);
        }
        let levels = Store::<Level>::select(self.store.as_ref(), &SelectQuery::all())?;
        self.cache_levels(&levels);
        Ok(levels)
    }

    pub fn level_by_id(&self, level_id: i32) -> RepoResult<Option<Level>> {
        Ok(self.levels()?.into_iter().find(|level| level.id == level_id))
    }

    /// Highest enabled level whose requirement `exp` meets.
    pub fn level_for_exp(&self, exp: i64) -> RepoResult<Option<Level>> {
        Ok(self
            .levels()?
            .into_iter()
            .filter(|level| level.enabled && level.require_exp <= exp)
            .max_by_key(|level| (level.require_exp, level.id)))
    }

    /// First enabled level after `level_id` in id order.
    pub fn next_level(&self, level_id: i32) -> RepoResult<Option<Level>> {
        Ok(self
            .levels()?
            .into_iter()
            .find(|level| level.enabled && level.id > level_id))
    }

    pub fn save_level(&self, level: &mut Level) -> RepoResult<i32> {
        level.validate()?;
        let id = Store::<Level>::save(self.store.as_ref(), level)?;
        self.sweep();
        info!("event=level_save module=manager status=ok level_id={id}");
        Ok(id)
    }

    pub fn delete_level(&self, level_id: i32) -> RepoResult<usize> {
        let result = Store::<Level>::delete(self.store.as_ref(), level_id);
        self.sweep();
        let rows = result?;
        info!("event=level_delete module=manager status=ok level_id={level_id} rows={rows}");
        Ok(rows)
    }

    fn cached_levels(&self) -> Option<Vec<Level>> {
        let keys = self.layer.keys();
        let cache = self.layer.cache();
        match cache.get_int(&keys.level_marker()) {
            Ok(Some(_)) => {}
            Ok(None) => return None,
            Err(err) => {
                warn!("event=level_cache_read module=manager status=error error={err}");
                return None;
            }
        }
        match get_typed::<Vec<Level>>(cache, &keys.level_set()) {
            Ok(levels) => levels,
            Err(err) => {
                warn!("event=level_cache_read module=manager status=error error={err}");
                None
            }
        }
    }

    /// Writes the collection before its marker so a visible marker always
    /// guards a complete set.
    fn cache_levels(&self, levels: &[Level]) {
        let keys = self.layer.keys();
        let cache = self.layer.cache();
        let written = set_typed(cache, &keys.level_set(), &levels, None)
            .and_then(|_| cache.set(&keys.level_marker(), &unix_now().to_string(), None));
        if let Err(err) = written {
            warn!("event=level_cache_write module=manager status=error error={err}");
            self.sweep();
        }
    }

    fn sweep(&self) {
        self.layer
            .sweep(&self.layer.keys().kind_prefix(EntityKind::Level));
    }
}
