//! Cache backends for derived per-run data.
//!
//! Engines never hold a global cache client: a `CacheStore` is built once
//! per process and lent to each component. Payloads are JSON strings.
//! A failing backend must never fail a caller: reads fall back to
//! recomputation, failed writes are logged and dropped.

use crate::{
    clock::Clock,
    error::{RegError, RegResult},
    store::RegStore,
    types::{AssocId, RunId},
};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> RegResult<Option<String>>;
    fn set(&self, key: &str, value: &str, ttl: Duration) -> RegResult<()>;
    fn delete(&self, key: &str) -> RegResult<()>;
}

// ── Keys ───────────────────────────────────────────────────────────
// These strings are shared with existing deployments; keep them exact.

pub fn registration_accounting_key(run_id: RunId) -> String {
    format!("registration_accounting_{run_id}")
}

pub fn reg_counts_key(run_id: RunId) -> String {
    format!("reg_counts{run_id}")
}

pub fn leaderboard_key(assoc_id: AssocId) -> String {
    format!("leaderboard_{assoc_id}")
}

// ── In-process backend ─────────────────────────────────────────────

pub struct MemoryCache {
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, (String, DateTime<Utc>)>>,
}

impl MemoryCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.entries
            .lock()
            .map(|entries| entries.values().filter(|(_, exp)| *exp > now).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(
        &self,
    ) -> RegResult<std::sync::MutexGuard<'_, HashMap<String, (String, DateTime<Utc>)>>> {
        self.entries
            .lock()
            .map_err(|_| RegError::Cache("memory cache lock poisoned".into()))
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> RegResult<Option<String>> {
        let now = self.clock.now();
        let mut entries = self.lock()?;
        match entries.get(key) {
            Some((value, expires_at)) if *expires_at > now => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> RegResult<()> {
        let expires_at = self.clock.now() + ttl;
        self.lock()?
            .insert(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }

    fn delete(&self, key: &str) -> RegResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

// ── SQLite backend ─────────────────────────────────────────────────

/// Cache persisted in a `cache_entry` table, for one-shot processes
/// (the runner) that still want hits across invocations.
pub struct SqliteCache {
    clock: Arc<dyn Clock>,
    store: Mutex<RegStore>,
}

impl SqliteCache {
    /// Wrap a dedicated, migrated store connection.
    pub fn new(store: RegStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            store: Mutex::new(store),
        }
    }

    /// Drop expired rows. Returns how many were removed.
    pub fn purge_expired(&self) -> RegResult<usize> {
        let now = self.clock.now();
        self.lock()?.cache_entry_purge(now)
    }

    fn lock(&self) -> RegResult<std::sync::MutexGuard<'_, RegStore>> {
        self.store
            .lock()
            .map_err(|_| RegError::Cache("sqlite cache lock poisoned".into()))
    }
}

impl CacheStore for SqliteCache {
    fn get(&self, key: &str) -> RegResult<Option<String>> {
        let now = self.clock.now();
        self.lock()?
            .cache_entry_get(key, now)
            .map_err(|e| RegError::Cache(e.to_string()))
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> RegResult<()> {
        let expires_at = self.clock.now() + ttl;
        self.lock()?
            .cache_entry_set(key, value, expires_at)
            .map_err(|e| RegError::Cache(e.to_string()))
    }

    fn delete(&self, key: &str) -> RegResult<()> {
        self.lock()?
            .cache_entry_delete(key)
            .map_err(|e| RegError::Cache(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::TimeZone;

    fn clock() -> Arc<FixedClock> {
        Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()))
    }

    #[test]
    fn keys_match_deployed_format() {
        assert_eq!(registration_accounting_key(12), "registration_accounting_12");
        assert_eq!(reg_counts_key(12), "reg_counts12");
        assert_eq!(leaderboard_key(3), "leaderboard_3");
    }

    #[test]
    fn memory_cache_entries_expire_after_ttl() {
        let clock = clock();
        let cache = MemoryCache::new(clock.clone());
        cache.set("k", "v", Duration::days(1)).unwrap();
        assert_eq!(cache.get("k").unwrap().as_deref(), Some("v"));

        clock.advance(Duration::hours(23));
        assert_eq!(cache.get("k").unwrap().as_deref(), Some("v"));

        clock.advance(Duration::hours(2));
        assert_eq!(cache.get("k").unwrap(), None);
    }

    #[test]
    fn sqlite_cache_round_trips_and_expires() {
        let clock = clock();
        let store = RegStore::in_memory().unwrap();
        store.migrate().unwrap();
        let cache = SqliteCache::new(store, clock.clone());

        cache.set("k", "first", Duration::days(1)).unwrap();
        cache.set("k", "second", Duration::days(1)).unwrap();
        assert_eq!(cache.get("k").unwrap().as_deref(), Some("second"));

        cache.delete("k").unwrap();
        assert_eq!(cache.get("k").unwrap(), None);

        cache.set("k", "again", Duration::hours(1)).unwrap();
        clock.advance(Duration::hours(2));
        assert_eq!(cache.get("k").unwrap(), None);
        assert_eq!(cache.purge_expired().unwrap(), 1);
    }
}
