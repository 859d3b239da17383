//! Generic read-through / write-through composition of store and cache.
//!
//! # Invariants
//! - The store is consulted on every cache miss, decode failure or cache
//!   error; cache problems never fail a read.
//! - Cache projection happens only after the store write succeeded.
//! - Eviction and sweeps are best effort and logged.

use crate::cache::{get_typed, set_typed, Cache, CacheKeys};
use crate::model::Record;
use crate::repo::RepoResult;
use crate::store::Store;
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;

/// Cache port bundled with its key scheme and entry TTL.
#[derive(Clone)]
pub(crate) struct CacheLayer {
    cache: Arc<dyn Cache>,
    keys: CacheKeys,
    ttl: Option<Duration>,
}

impl CacheLayer {
    pub(crate) fn new(cache: Arc<dyn Cache>, keys: CacheKeys, ttl: Option<Duration>) -> Self {
        Self { cache, keys, ttl }
    }

    pub(crate) fn keys(&self) -> &CacheKeys {
        &self.keys
    }

    pub(crate) fn cache(&self) -> &dyn Cache {
        self.cache.as_ref()
    }

    /// Cached value of `E`, or `None` on miss, decode failure or cache error.
    pub(crate) fn lookup<E: Record>(&self, cache_key: &str) -> Option<E> {
        match get_typed::<E>(self.cache(), cache_key) {
            Ok(Some(value)) => {
                debug!(
                    "event=cache_read module=repo status=hit kind={} key={cache_key}",
                    E::KIND
                );
                Some(value)
            }
            Ok(None) => None,
            Err(err) => {
                warn!(
                    "event=cache_read module=repo status=error kind={} key={cache_key} error={err}",
                    E::KIND
                );
                self.evict(cache_key);
                None
            }
        }
    }

    /// Stores the full value; on failure the key is evicted so no stale
    /// projection survives.
    pub(crate) fn project<E: Record>(&self, cache_key: &str, value: &E) {
        if let Err(err) = set_typed(self.cache(), cache_key, value, self.ttl) {
            warn!(
                "event=cache_write module=repo status=error kind={} key={cache_key} error={err}",
                E::KIND
            );
            self.evict(cache_key);
        }
    }

    pub(crate) fn evict(&self, cache_key: &str) {
        if let Err(err) = self.cache.del(cache_key) {
            warn!("event=cache_evict module=repo status=error key={cache_key} error={err}");
        }
    }

    pub(crate) fn sweep(&self, prefix: &str) {
        match self.cache.delete_prefix(prefix) {
            Ok(removed) => {
                debug!("event=cache_sweep module=repo status=ok prefix={prefix} removed={removed}")
            }
            Err(err) => {
                warn!("event=cache_sweep module=repo status=error prefix={prefix} error={err}")
            }
        }
    }

    /// Cache first, then store; a store hit populates the cache.
    pub(crate) fn read_through<E, S>(
        &self,
        store: &S,
        key: E::Key,
        cache_key: &str,
    ) -> RepoResult<Option<E>>
    where
        E: Record,
        S: Store<E> + ?Sized,
    {
        if let Some(value) = self.lookup::<E>(cache_key) {
            return Ok(Some(value));
        }
        debug!(
            "event=cache_read module=repo status=miss kind={} key={cache_key}",
            E::KIND
        );

        let loaded = store.get(key)?;
        if let Some(value) = &loaded {
            self.project(cache_key, value);
        }
        Ok(loaded)
    }

    /// Store first; the cache is only touched after the store accepted the
    /// write. `cache_key` is derived after the key has been back-filled.
    pub(crate) fn write_through<E, S>(
        &self,
        store: &S,
        entity: &mut E,
        cache_key: impl FnOnce(&E) -> String,
    ) -> RepoResult<E::Key>
    where
        E: Record,
        S: Store<E> + ?Sized,
    {
        let key = store.save(entity)?;
        self.project(&cache_key(entity), entity);
        Ok(key)
    }

    /// Store delete, then unconditional eviction.
    pub(crate) fn delete_through<E, S>(
        &self,
        store: &S,
        key: E::Key,
        cache_key: &str,
    ) -> RepoResult<usize>
    where
        E: Record,
        S: Store<E> + ?Sized,
    {
        let result = store.delete(key);
        self.evict(cache_key);
        Ok(result?)
    }
}
