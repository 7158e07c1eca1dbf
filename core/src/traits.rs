//! Core traits for the confcache system.
//!
//! These are the collaborator seams: the orchestrator only ever talks
//! to a source, a resolver and a backend through these traits. All of
//! them are synchronous; the cache path is a single synchronous call
//! sequence and the only I/O is a file stat, a file parse, and a
//! backend load/save.

use crate::types::{CacheLookup, ConfigHandle, ConfigKind, Environment};
use errors::{CacheError, ConfigError, ResolveError};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Parses configuration from a path.
pub trait ConfigSource: Send + Sync {
    /// Parse the source at `path`.
    ///
    /// Returns `Ok(None)` when the source legitimately does not exist.
    /// On success the handle must carry the source's modification time.
    /// Structural errors propagate; they are never represented as an
    /// absent result.
    fn parse(&self, path: &Path, kind: ConfigKind) -> Result<Option<ConfigHandle>, ConfigError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "source"
    }
}

/// Determines the active named environment.
pub trait EnvironmentResolver: Send + Sync {
    /// Detect the environment from a system config's detection hints.
    ///
    /// Detection happens once per resolver instance; later calls return
    /// the memoized result so concurrent first calls converge.
    fn detect_from_system_config(&self, hints: &Value) -> Result<Environment, ResolveError>;

    /// The ambient environment, without consulting any config.
    fn current(&self) -> Environment;
}

/// Key/value store holding serialized configuration handles.
///
/// The stored value is opaque to the backend. A `None` value is a
/// cacheable negative result and must round-trip as `Hit(None)`.
pub trait CacheBackend: Send + Sync {
    /// Look up a stored entry.
    fn load(&self, key: &str) -> Result<CacheLookup, CacheError>;

    /// Store an entry (positive or negative) under `key`.
    ///
    /// `ttl` of `None` means unlimited lifetime. `tags` support bulk
    /// invalidation by an external actor.
    fn save(
        &self,
        key: &str,
        value: Option<Arc<ConfigHandle>>,
        ttl: Option<Duration>,
        tags: &[String],
    ) -> Result<(), CacheError>;

    /// Remove the entry under `key`, if any.
    fn remove(&self, key: &str) -> Result<(), CacheError>;

    /// Remove every entry carrying `tag`; returns the removed count.
    fn remove_by_tag(&self, tag: &str) -> Result<usize, CacheError>;
}
