// # TTL Caches
//
// Process-lifetime, in-memory caches with lazy expiry.
//
// Entries are never evicted in the background: validity is checked when an
// entry is read, and a stale entry simply reads as a miss until it is
// overwritten. Nothing here persists across restarts.
//
// Caches are plain values owned by whoever needs them (e.g. one nameserver
// cache per authoritative strategy). Owners that share a cache across tasks
// wrap it in their own lock.

use chrono::{DateTime, Utc};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::net::Ipv4Addr;

/// Lifetime of cached authoritative nameserver addresses (one hour)
pub const NAMESERVER_CACHE_TTL_SECS: u64 = 3600;

/// A cached value with its creation time and time-to-live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry<T> {
    value: T,
    created_at: DateTime<Utc>,
    ttl_secs: u64,
}

impl<T> CacheEntry<T> {
    /// Create an entry stamped with the current time
    pub fn new(value: T, ttl_secs: u64) -> Self {
        Self::with_created_at(value, Utc::now(), ttl_secs)
    }

    /// Create an entry with an explicit creation time
    pub fn with_created_at(value: T, created_at: DateTime<Utc>, ttl_secs: u64) -> Self {
        Self {
            value,
            created_at,
            ttl_secs,
        }
    }

    /// Whether the entry is still valid now
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// Whether the entry is valid at `now`: holds exactly while `now - created_at < ttl`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        let elapsed = now.signed_duration_since(self.created_at);
        elapsed.num_milliseconds() < self.ttl_millis()
    }

    fn ttl_millis(&self) -> i64 {
        i64::try_from(self.ttl_secs.saturating_mul(1000)).unwrap_or(i64::MAX)
    }
}

/// Key/value cache with per-entry TTL and lazy expiry
#[derive(Debug, Clone)]
pub struct TtlCache<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    ttl_secs: u64,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    /// Create an empty cache whose entries live `ttl_secs`
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            entries: HashMap::new(),
            ttl_secs,
        }
    }

    /// Get a valid cached value
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_at(key, Utc::now())
    }

    /// Get a cached value if it is valid at `now`
    pub fn get_at<Q>(&self, key: &Q, now: DateTime<Utc>) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries
            .get(key)
            .filter(|entry| entry.is_valid_at(now))
            .map(|entry| entry.value.clone())
    }

    /// Store a value, stamping it with the cache TTL
    pub fn insert(&mut self, key: K, value: V) {
        self.entries.insert(key, CacheEntry::new(value, self.ttl_secs));
    }

    /// Number of stored entries, including stale ones
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Second-level domain → resolved authoritative nameserver addresses
pub type NameserverCache = TtlCache<String, Vec<Ipv4Addr>>;
