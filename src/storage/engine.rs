//! Single-Threaded Cache Store with Expiry Support
//!
//! This module implements the key space of sweepkv: a plain `HashMap`
//! from key to [`Entry`], where each entry may carry an absolute expiry
//! instant.
//!
//! ## Design Decisions
//!
//! 1. **No Locks**: The store is owned by the event loop and every method
//!    takes `&mut self`. Commands and sweeps are serialized by the loop, so
//!    there is nothing to synchronize.
//! 2. **Lazy Expiry**: `get`, `has` and `delete` treat an expired entry as
//!    absent and evict it on the spot.
//! 3. **Active Expiry**: [`CacheStore::sweep_expired`] scans the whole map
//!    and evicts everything that has expired. The event loop calls it on a
//!    fixed interval.
//!
//! An entry is expired iff `now >= expires_at`. A TTL of zero therefore makes
//! the key invisible immediately, before any sweep runs.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors returned by cache operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The key is absent or has expired
    #[error("key {0} not found")]
    NotFound(String),

    /// An argument was out of range (e.g. a negative TTL)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Represents a stored value with optional expiry time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// The actual value stored
    pub value: String,
    /// When this entry expires (None = never expires)
    pub expires_at: Option<Instant>,
    /// When this entry was last written
    pub updated_at: Instant,
}

impl Entry {
    /// Creates a new entry without expiry.
    pub fn new(value: String) -> Self {
        Self {
            value,
            expires_at: None,
            updated_at: Instant::now(),
        }
    }

    /// Creates a new entry that expires `ttl` after `now`.
    ///
    /// A TTL too large to represent as an instant never expires.
    pub fn with_ttl(value: String, ttl: Duration, now: Instant) -> Self {
        Self {
            value,
            expires_at: now.checked_add(ttl),
            updated_at: now,
        }
    }

    /// Checks if this entry has expired relative to `now`.
    #[inline]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.map(|exp| now >= exp).unwrap_or(false)
    }

    /// Returns the remaining TTL, or None if the entry never expires.
    pub fn ttl(&self) -> Option<Duration> {
        self.expires_at
            .map(|exp| exp.saturating_duration_since(Instant::now()))
    }
}

/// Snapshot of store counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Keys currently held (including expired keys not yet evicted)
    pub keys: u64,
    /// Total GET/HAS lookups
    pub get_ops: u64,
    /// Total SET operations
    pub set_ops: u64,
    /// Total DEL operations
    pub del_ops: u64,
    /// Keys evicted because they expired (lazily or by a sweep)
    pub expired: u64,
    /// Number of sweeps performed
    pub sweeps: u64,
}

/// The in-memory key space.
///
/// The event loop owns exactly one `CacheStore`; nothing else mutates it.
///
/// # Example
///
/// ```
/// use sweepkv::storage::CacheStore;
///
/// let mut cache = CacheStore::new();
///
/// cache.set("name", "sweepkv");
/// assert_eq!(cache.get("name").unwrap(), "sweepkv");
///
/// cache.set_with_ttl("session", "abc123", 60).unwrap();
/// assert!(cache.has("session"));
///
/// cache.delete("name").unwrap();
/// assert!(cache.get("name").is_err());
/// ```
#[derive(Debug, Default)]
pub struct CacheStore {
    data: HashMap<String, Entry>,
    get_count: u64,
    set_count: u64,
    del_count: u64,
    expired_count: u64,
    sweep_count: u64,
}

impl CacheStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store with room for `capacity` keys.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: HashMap::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Sets a key-value pair without expiry.
    ///
    /// Any previous value and expiry for the key are discarded.
    ///
    /// # Returns
    ///
    /// Returns `true` if a new key was created, `false` if an existing key was updated.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        self.set_count += 1;
        self.data
            .insert(key.into(), Entry::new(value.into()))
            .is_none()
    }

    /// Sets a key-value pair that expires after `ttl_seconds`.
    ///
    /// Fails with [`CacheError::InvalidArgument`] if the TTL is negative.
    /// A TTL of zero stores an entry that is already expired; one too far
    /// out for the clock to represent never expires.
    pub fn set_with_ttl(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
        ttl_seconds: i64,
    ) -> Result<bool, CacheError> {
        let secs = u64::try_from(ttl_seconds).map_err(|_| {
            CacheError::InvalidArgument(format!("TTL must be non-negative, got {}", ttl_seconds))
        })?;
        Ok(self.set_with_duration(key, value, Duration::from_secs(secs)))
    }

    /// Sets a key-value pair that expires after `ttl`.
    pub fn set_with_duration(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
        ttl: Duration,
    ) -> bool {
        self.set_count += 1;
        let entry = Entry::with_ttl(value.into(), ttl, Instant::now());
        self.data.insert(key.into(), entry).is_none()
    }

    /// Gets the value for a key.
    ///
    /// An expired entry is evicted and reported as [`CacheError::NotFound`].
    pub fn get(&mut self, key: &str) -> Result<&str, CacheError> {
        self.get_count += 1;

        if !self.evict_if_expired(key, Instant::now()) {
            if let Some(entry) = self.data.get(key) {
                return Ok(entry.value.as_str());
            }
        }

        Err(CacheError::NotFound(key.to_string()))
    }

    /// Gets the full entry for a key (including metadata), honoring expiry.
    pub fn get_entry(&mut self, key: &str) -> Option<&Entry> {
        if self.evict_if_expired(key, Instant::now()) {
            return None;
        }
        self.data.get(key)
    }

    /// Deletes a key.
    ///
    /// Fails with [`CacheError::NotFound`] if the key is absent or expired.
    pub fn delete(&mut self, key: &str) -> Result<(), CacheError> {
        self.del_count += 1;

        if self.evict_if_expired(key, Instant::now()) {
            return Err(CacheError::NotFound(key.to_string()));
        }

        self.data
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    /// Checks if a key exists and is not expired.
    ///
    /// An expired entry is evicted as a side effect.
    pub fn has(&mut self, key: &str) -> bool {
        self.get_count += 1;

        if self.evict_if_expired(key, Instant::now()) {
            return false;
        }
        self.data.contains_key(key)
    }

    /// Evicts every entry that has expired as of now.
    ///
    /// # Returns
    ///
    /// Returns the number of keys evicted.
    pub fn sweep_expired(&mut self) -> u64 {
        self.sweep_expired_at(Instant::now())
    }

    /// Evicts every entry whose expiry is at or before `now`.
    pub fn sweep_expired_at(&mut self, now: Instant) -> u64 {
        let before = self.data.len();
        self.data.retain(|_, entry| !entry.is_expired_at(now));

        let evicted = (before - self.data.len()) as u64;
        self.expired_count += evicted;
        self.sweep_count += 1;
        evicted
    }

    /// Returns the number of keys held, including expired keys that have
    /// not been evicted yet.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns store statistics.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            keys: self.data.len() as u64,
            get_ops: self.get_count,
            set_ops: self.set_count,
            del_ops: self.del_count,
            expired: self.expired_count,
            sweeps: self.sweep_count,
        }
    }

    /// Removes `key` if it has expired as of `now`. Returns true if it was evicted.
    fn evict_if_expired(&mut self, key: &str, now: Instant) -> bool {
        let expired = self
            .data
            .get(key)
            .map(|entry| entry.is_expired_at(now))
            .unwrap_or(false);

        if expired {
            self.data.remove(key);
            self.expired_count += 1;
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut cache = CacheStore::new();

        assert!(cache.set("key", "value"));
        assert_eq!(cache.get("key"), Ok("value"));
    }

    #[test]
    fn test_set_overwrites() {
        let mut cache = CacheStore::new();

        assert!(cache.set("key", "one"));
        assert!(!cache.set("key", "two"));
        assert_eq!(cache.get("key"), Ok("two"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_get_nonexistent() {
        let mut cache = CacheStore::new();
        assert_eq!(
            cache.get("nonexistent"),
            Err(CacheError::NotFound("nonexistent".to_string()))
        );
    }

    #[test]
    fn test_delete() {
        let mut cache = CacheStore::new();

        cache.set("key", "value");
        assert_eq!(cache.delete("key"), Ok(()));
        assert!(cache.get("key").is_err());
        // A second delete of the same insert must fail
        assert_eq!(
            cache.delete("key"),
            Err(CacheError::NotFound("key".to_string()))
        );
    }

    #[test]
    fn test_delete_absent_key() {
        let mut cache = CacheStore::new();
        assert!(matches!(cache.delete("ghost"), Err(CacheError::NotFound(_))));
    }

    #[test]
    fn test_has() {
        let mut cache = CacheStore::new();

        assert!(!cache.has("key"));
        cache.set("key", "value");
        assert!(cache.has("key"));
    }

    #[test]
    fn test_expiry() {
        let mut cache = CacheStore::new();

        cache.set_with_duration("key", "value", Duration::from_millis(50));

        // Key should exist immediately
        assert_eq!(cache.get("key"), Ok("value"));

        // Wait for expiry
        std::thread::sleep(Duration::from_millis(100));

        // Key should be gone, and evicted rather than merely hidden
        assert!(matches!(cache.get("key"), Err(CacheError::NotFound(_))));
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats().expired, 1);
    }

    #[test]
    fn test_has_evicts_expired() {
        let mut cache = CacheStore::new();

        cache.set_with_duration("key", "value", Duration::from_millis(10));
        std::thread::sleep(Duration::from_millis(30));

        assert!(!cache.has("key"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_delete_expired_is_not_found() {
        let mut cache = CacheStore::new();

        cache.set_with_duration("key", "value", Duration::from_millis(10));
        std::thread::sleep(Duration::from_millis(30));

        assert!(matches!(cache.delete("key"), Err(CacheError::NotFound(_))));
    }

    #[test]
    fn test_zero_ttl_is_immediately_invisible() {
        let mut cache = CacheStore::new();

        cache.set_with_ttl("key", "value", 0).unwrap();
        assert!(!cache.has("key"));
        assert!(cache.get("key").is_err());
    }

    #[test]
    fn test_negative_ttl_rejected() {
        let mut cache = CacheStore::new();

        let err = cache.set_with_ttl("key", "value", -5).unwrap_err();
        assert!(matches!(err, CacheError::InvalidArgument(_)));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_plain_set_clears_ttl() {
        let mut cache = CacheStore::new();

        cache.set_with_duration("key", "v1", Duration::from_millis(20));
        cache.set("key", "v2");
        std::thread::sleep(Duration::from_millis(50));

        assert_eq!(cache.get("key"), Ok("v2"));
        assert_eq!(cache.get_entry("key").unwrap().expires_at, None);
    }

    #[test]
    fn test_ttl_reported() {
        let mut cache = CacheStore::new();

        cache.set_with_ttl("key", "value", 100).unwrap();
        let ttl = cache.get_entry("key").unwrap().ttl().unwrap();
        assert!(ttl > Duration::from_secs(98) && ttl <= Duration::from_secs(100));

        cache.set("plain", "value");
        assert_eq!(cache.get_entry("plain").unwrap().ttl(), None);
    }

    #[test]
    fn test_sweep_expired() {
        let mut cache = CacheStore::new();

        for i in 0..10 {
            cache.set_with_duration(format!("temp{}", i), "value", Duration::from_millis(10));
        }
        cache.set("persistent", "value");
        cache.set_with_ttl("long", "value", 3600).unwrap();

        assert_eq!(cache.len(), 12);

        std::thread::sleep(Duration::from_millis(30));

        assert_eq!(cache.sweep_expired(), 10);
        assert_eq!(cache.len(), 2);
        assert!(cache.has("persistent"));
        assert!(cache.has("long"));

        // Nothing left to evict
        assert_eq!(cache.sweep_expired(), 0);
        assert_eq!(cache.stats().sweeps, 2);
    }

    #[test]
    fn test_sweep_uses_reference_time() {
        let mut cache = CacheStore::new();

        cache.set_with_ttl("a", "1", 5).unwrap();
        cache.set_with_ttl("b", "2", 50).unwrap();
        cache.set("c", "3");

        let later = Instant::now() + Duration::from_secs(10);
        assert_eq!(cache.sweep_expired_at(later), 1);
        assert!(!cache.has("a"));
        assert!(cache.has("b"));
        assert!(cache.has("c"));
    }

    #[test]
    fn test_stats() {
        let mut cache = CacheStore::new();

        cache.set("a", "1");
        cache.set_with_ttl("b", "2", 10).unwrap();
        let _ = cache.get("a");
        let _ = cache.get("missing");
        cache.has("b");
        let _ = cache.delete("a");

        let stats = cache.stats();
        assert_eq!(stats.keys, 1);
        assert_eq!(stats.set_ops, 2);
        assert_eq!(stats.get_ops, 3);
        assert_eq!(stats.del_ops, 1);
        assert_eq!(stats.expired, 0);
    }

    #[test]
    fn test_huge_ttl_never_expires() {
        let mut cache = CacheStore::with_capacity(16);

        assert_eq!(cache.set_with_ttl("a", "b", i64::MAX), Ok(true));
        assert_eq!(cache.get("a"), Ok("b"));
        assert_eq!(cache.get_entry("a").unwrap().expires_at, None);

        let far = Instant::now() + Duration::from_secs(100 * 365 * 24 * 3600);
        assert_eq!(cache.sweep_expired_at(far), 0);
        assert!(cache.has("a"));
    }
}
