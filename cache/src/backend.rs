//! # In-process Cache Backend
//!
//! A `CacheBackend` backed by a `RwLock<HashMap>` with per-entry
//! expiry, tag sets and hit/miss statistics. Expired entries are
//! evicted lazily on lookup.

use cc_core::{CacheBackend, CacheLookup, ConfigHandle};
use errors::CacheError;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

struct Entry {
    value: Option<Arc<ConfigHandle>>,
    expires_at: Option<Instant>,
    tags: BTreeSet<String>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Backend statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
}

/// In-process cache backend.
///
/// Negative entries (a stored `None`) are first-class: they round-trip
/// as `CacheLookup::Hit(None)` until they expire or are removed. Saves
/// replace whole entries, so under concurrent misses the last write
/// wins.
#[derive(Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, Entry>>,
    stats: RwLock<BackendStats>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the backend statistics.
    pub fn stats(&self) -> BackendStats {
        let mut stats = match self.stats.read() {
            Ok(stats) => stats.clone(),
            Err(_) => return BackendStats::default(),
        };
        if let Ok(entries) = self.entries.read() {
            stats.entries = entries.len();
        }
        stats
    }

    /// Drop every expired entry now instead of waiting for lookups.
    pub fn purge_expired(&self) -> Result<usize, CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.write().map_err(|_| CacheError::Poisoned)?;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        let purged = before - entries.len();
        if purged > 0 {
            if let Ok(mut stats) = self.stats.write() {
                stats.evictions += purged as u64;
            }
        }
        Ok(purged)
    }

    fn record_hit(&self) {
        if let Ok(mut stats) = self.stats.write() {
            stats.hits += 1;
        }
    }

    fn record_miss(&self) {
        if let Ok(mut stats) = self.stats.write() {
            stats.misses += 1;
        }
    }
}

impl CacheBackend for MemoryBackend {
    fn load(&self, key: &str) -> Result<CacheLookup, CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.write().map_err(|_| CacheError::Poisoned)?;

        match entries.get(key) {
            None => {
                self.record_miss();
                Ok(CacheLookup::Miss)
            }
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                if let Ok(mut stats) = self.stats.write() {
                    stats.evictions += 1;
                }
                self.record_miss();
                Ok(CacheLookup::Miss)
            }
            Some(entry) => {
                self.record_hit();
                Ok(CacheLookup::Hit(entry.value.clone()))
            }
        }
    }

    fn save(
        &self,
        key: &str,
        value: Option<Arc<ConfigHandle>>,
        ttl: Option<Duration>,
        tags: &[String],
    ) -> Result<(), CacheError> {
        let entry = Entry {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
            tags: tags.iter().cloned().collect(),
        };
        let mut entries = self.entries.write().map_err(|_| CacheError::Poisoned)?;
        entries.insert(key.to_string(), entry);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.write().map_err(|_| CacheError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }

    fn remove_by_tag(&self, tag: &str) -> Result<usize, CacheError> {
        let mut entries = self.entries.write().map_err(|_| CacheError::Poisoned)?;
        let before = entries.len();
        entries.retain(|_, entry| !entry.tags.contains(tag));
        Ok(before - entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::time::SystemTime;

    fn handle() -> Arc<ConfigHandle> {
        Arc::new(ConfigHandle::new(
            PathBuf::from("/app/config.toml"),
            SystemTime::UNIX_EPOCH,
            BTreeMap::new(),
        ))
    }

    fn tags(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_save_and_load_positive_entry() {
        let backend = MemoryBackend::new();
        backend
            .save("config.toml", Some(handle()), None, &tags(&["config"]))
            .unwrap();

        let lookup = backend.load("config.toml").unwrap();
        assert!(matches!(lookup, CacheLookup::Hit(Some(_))));

        let stats = backend.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn test_load_unknown_key_misses() {
        let backend = MemoryBackend::new();
        let lookup = backend.load("nope").unwrap();
        assert!(matches!(lookup, CacheLookup::Miss));
        assert_eq!(backend.stats().misses, 1);
    }

    #[test]
    fn test_negative_entry_round_trips() {
        let backend = MemoryBackend::new();
        backend
            .save("missing.toml", None, None, &tags(&["config"]))
            .unwrap();

        let lookup = backend.load("missing.toml").unwrap();
        assert!(matches!(lookup, CacheLookup::Hit(None)));
    }

    #[test]
    fn test_entries_expire_after_ttl() {
        let backend = MemoryBackend::new();
        backend
            .save(
                "config.toml",
                Some(handle()),
                Some(Duration::from_millis(40)),
                &tags(&["config"]),
            )
            .unwrap();

        assert!(matches!(
            backend.load("config.toml").unwrap(),
            CacheLookup::Hit(Some(_))
        ));

        std::thread::sleep(Duration::from_millis(60));

        assert!(matches!(
            backend.load("config.toml").unwrap(),
            CacheLookup::Miss
        ));
        assert_eq!(backend.stats().evictions, 1);
    }

    #[test]
    fn test_remove_by_tag() {
        let backend = MemoryBackend::new();
        backend
            .save("a.toml", Some(handle()), None, &tags(&["config"]))
            .unwrap();
        backend
            .save("b.toml", Some(handle()), None, &tags(&["config", "tenant-b"]))
            .unwrap();
        backend
            .save("c.toml", Some(handle()), None, &tags(&["other"]))
            .unwrap();

        let removed = backend.remove_by_tag("config").unwrap();
        assert_eq!(removed, 2);
        assert!(matches!(backend.load("a.toml").unwrap(), CacheLookup::Miss));
        assert!(matches!(
            backend.load("c.toml").unwrap(),
            CacheLookup::Hit(Some(_))
        ));
    }

    #[test]
    fn test_remove_single_key() {
        let backend = MemoryBackend::new();
        backend
            .save("a.toml", Some(handle()), None, &tags(&["config"]))
            .unwrap();
        backend.remove("a.toml").unwrap();
        assert!(matches!(backend.load("a.toml").unwrap(), CacheLookup::Miss));
    }

    #[test]
    fn test_purge_expired() {
        let backend = MemoryBackend::new();
        backend
            .save(
                "short.toml",
                Some(handle()),
                Some(Duration::from_millis(10)),
                &tags(&["config"]),
            )
            .unwrap();
        backend
            .save("long.toml", Some(handle()), None, &tags(&["config"]))
            .unwrap();

        std::thread::sleep(Duration::from_millis(30));
        let purged = backend.purge_expired().unwrap();
        assert_eq!(purged, 1);
        assert_eq!(backend.stats().entries, 1);
    }
}
