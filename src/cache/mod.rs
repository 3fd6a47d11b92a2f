//! Time-expiring key/value cache shared by the upstream clients.
//!
//! Each upstream client owns one or more [`TtlCache`] handles, constructed
//! once at startup and cloned into the client. Entries expire after a fixed
//! TTL and are lazily evicted on read; the map is additionally bounded, with
//! least-recently-used eviction when an insert would exceed capacity.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// Default entry lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Default capacity bound per cache instance.
pub const DEFAULT_CAPACITY: usize = 1024;

struct Entry<V> {
    value: V,
    stored_at: Instant,
    last_used: Instant,
}

struct Inner<V> {
    map: HashMap<String, Entry<V>>,
    ttl: Duration,
    capacity: usize,
}

/// A bounded, TTL-expiring cache keyed by string.
///
/// Cheap to clone; clones share the same underlying map. Keys are expected
/// to encode the upstream name, operation, and identifier, e.g.
/// `"tmdb:detail:27205"`, so one logical request shape maps to one key.
pub struct TtlCache<V> {
    inner: Arc<Mutex<Inner<V>>>,
}

impl<V> Clone for TtlCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: Clone> TtlCache<V> {
    /// Create a cache with the given TTL and capacity bound.
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                map: HashMap::new(),
                ttl,
                capacity: capacity.max(1),
            })),
        }
    }

    /// Look up `key`, returning a clone of the stored value when present and
    /// not older than the TTL. An expired entry is evicted as a side effect
    /// of the read.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut inner = self.inner.lock();
        let ttl = inner.ttl;
        let now = Instant::now();

        let expired = match inner.map.get_mut(key) {
            Some(entry) if now.duration_since(entry.stored_at) <= ttl => {
                entry.last_used = now;
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            inner.map.remove(key);
        }
        None
    }

    /// Store `value` under `key`, replacing any previous entry. When the map
    /// is full the least-recently-used live entry is evicted first.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        let mut inner = self.inner.lock();
        let now = Instant::now();

        if !inner.map.contains_key(&key) && inner.map.len() >= inner.capacity {
            // Drop expired entries before sacrificing a live one.
            let ttl = inner.ttl;
            inner
                .map
                .retain(|_, e| now.duration_since(e.stored_at) <= ttl);

            if inner.map.len() >= inner.capacity {
                if let Some(oldest) = inner
                    .map
                    .iter()
                    .min_by_key(|(_, e)| e.last_used)
                    .map(|(k, _)| k.clone())
                {
                    inner.map.remove(&oldest);
                }
            }
        }

        inner.map.insert(
            key,
            Entry {
                value,
                stored_at: now,
                last_used: now,
            },
        );
    }

    /// Number of entries currently held, including not-yet-evicted expired ones.
    pub fn len(&self) -> usize {
        self.inner.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_CAPACITY)
    }
}
