//! Two-tier (memory, then persisted store) cache with a fixed time-to-live.

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

use super::store::KeyValueStore;

/// Wall-clock milliseconds. Persisted timestamps must survive restarts, so
/// this is epoch time rather than a monotonic instant.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as u64)
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock(AtomicU64);

impl ManualClock {
    pub fn new(start_millis: u64) -> Self {
        ManualClock(AtomicU64::new(start_millis))
    }

    pub fn advance(&self, by: Duration) {
        self.0.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    pub value: V,
    pub timestamp: u64, // epoch millis of the write
}

/// Where a lookup was answered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
    Memory,
    Persisted,
    Network,
    /// Every tier missed and the fetch failed.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lookup<V> {
    pub value: Option<V>,
    pub source: CacheSource,
}

/// One cache with one TTL. An entry is fresh while its age is below the TTL.
///
/// Both tiers are written together. A failed fetch is not cached, so the
/// next lookup tries the network again.
pub struct TtlCache<K, V> {
    namespace: &'static str,
    ttl: Duration,
    memory: Mutex<HashMap<K, CacheEntry<V>>>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + Display,
    V: Clone + Serialize + DeserializeOwned,
{
    pub fn new(namespace: &'static str, ttl: Duration, store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        TtlCache { namespace, ttl, memory: Mutex::new(HashMap::new()), store, clock }
    }

    fn store_key(&self, key: &K) -> String {
        format!("{}:{}", self.namespace, key)
    }

    fn is_fresh(&self, entry: &CacheEntry<V>, now: u64) -> bool {
        now.saturating_sub(entry.timestamp) < self.ttl.as_millis() as u64
    }

    /// Fresh value from memory or the persisted tier, without fetching.
    pub fn get(&self, key: &K) -> Option<V> {
        self.lookup_cached(key).map(|(value, _)| value)
    }

    fn lookup_cached(&self, key: &K) -> Option<(V, CacheSource)> {
        let now = self.clock.now_millis();
        if let Some(entry) = self.memory.lock().get(key) {
            if self.is_fresh(entry, now) {
                return Some((entry.value.clone(), CacheSource::Memory));
            }
        }

        let raw = self.store.get(&self.store_key(key))?;
        let entry: CacheEntry<V> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(cache = self.namespace, %key, error = %e, "unreadable persisted entry ignored");
                return None;
            }
        };
        if !self.is_fresh(&entry, now) {
            return None;
        }
        let value = entry.value.clone();
        self.memory.lock().insert(key.clone(), entry);
        Some((value, CacheSource::Persisted))
    }

    /// Writes `value` to both tiers, stamped with the current time.
    pub fn put(&self, key: K, value: V) {
        let entry = CacheEntry { value, timestamp: self.clock.now_millis() };
        match serde_json::to_string(&entry) {
            Ok(raw) => {
                if let Err(e) = self.store.put(&self.store_key(&key), raw) {
                    warn!(cache = self.namespace, %key, error = %e, "persisting cache entry failed");
                }
            }
            Err(e) => warn!(cache = self.namespace, %key, error = %e, "serializing cache entry failed"),
        }
        self.memory.lock().insert(key, entry);
    }

    /// Memory, then the persisted store, then `fetch`. Never fails: a fetch
    /// error is logged and reported as `CacheSource::Unavailable`.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: &K, fetch: F) -> Lookup<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
        E: Display,
    {
        if let Some((value, source)) = self.lookup_cached(key) {
            debug!(cache = self.namespace, %key, ?source, "cache hit");
            return Lookup { value: Some(value), source };
        }

        debug!(cache = self.namespace, %key, "cache miss; fetching");
        match fetch().await {
            Ok(value) => {
                self.put(key.clone(), value.clone());
                Lookup { value: Some(value), source: CacheSource::Network }
            }
            Err(e) => {
                warn!(cache = self.namespace, %key, error = %e, "fetch failed; value unknown");
                Lookup { value: None, source: CacheSource::Unavailable }
            }
        }
    }
}
