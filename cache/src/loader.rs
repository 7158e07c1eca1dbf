//! # Cached Configuration Loading
//!
//! The orchestration layer: answers "give me the current, parsed,
//! environment-complete configuration for this source" while using a
//! cache backend to avoid reparsing.
//!
//! Staleness semantics are environment-driven: development-like
//! environments re-stat the source file on every hit and reparse when
//! it changed; every other environment serves the cached handle with
//! zero filesystem access after the first load.

use crate::key::cache_key;
use crate::settings::CacheSettings;
use cc_core::{
    CacheBackend, CacheLookup, ConfigHandle, ConfigKind, ConfigSource, Environment,
    EnvironmentResolver,
};
use errors::ConfigError;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Orchestrates source, resolver and backend into cached loads.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Produces an up-to-date `ConfigHandle` for a source path and kind,
/// minimizing reparse work via the injected cache backend. All
/// collaborators arrive at construction; a loader with no backend
/// degrades to direct parsing and stays fully correct.
///
/// ## Usage
/// ```rust,no_run
/// use cache::{CachedLoader, CacheSettings, FileSource, MemoryBackend, RuleResolver};
/// use cc_core::ConfigKind;
/// use std::path::Path;
/// use std::sync::Arc;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let loader = CachedLoader::new(
///         Arc::new(FileSource::new()),
///         Arc::new(RuleResolver::new()),
///         Some(Arc::new(MemoryBackend::new())),
///         CacheSettings { app_root: "/app".into(), ..CacheSettings::default() },
///     );
///     let config = loader.load(Path::new("/app/config.toml"), ConfigKind::System)?;
///     Ok(())
/// }
/// ```
///
/// ## Failure
/// Parse and contract errors propagate unmodified and are never
/// cached. Backend failures degrade to the direct-parse path with a
/// warning.
pub struct CachedLoader {
    source: Arc<dyn ConfigSource>,
    resolver: Arc<dyn EnvironmentResolver>,
    backend: Option<Arc<dyn CacheBackend>>,
    settings: CacheSettings,
}

impl CachedLoader {
    pub fn new(
        source: Arc<dyn ConfigSource>,
        resolver: Arc<dyn EnvironmentResolver>,
        backend: Option<Arc<dyn CacheBackend>>,
        settings: CacheSettings,
    ) -> Self {
        Self {
            source,
            resolver,
            backend,
            settings,
        }
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    pub fn backend(&self) -> Option<&Arc<dyn CacheBackend>> {
        self.backend.as_ref()
    }

    /// Load the configuration at `path`.
    ///
    /// Returns `Ok(None)` when the source does not exist; that answer
    /// may itself come from a cached negative entry.
    pub fn load(
        &self,
        path: &Path,
        kind: ConfigKind,
    ) -> Result<Option<Arc<ConfigHandle>>, ConfigError> {
        let Some(backend) = &self.backend else {
            return self.parse_and_precompute(path, kind);
        };

        let key = cache_key(path, &self.settings.app_root);
        let lookup = match backend.load(&key) {
            Ok(lookup) => lookup,
            Err(e) => {
                warn!(key = %key, error = %e, "cache lookup failed, degrading to direct parse");
                CacheLookup::Miss
            }
        };

        match lookup {
            CacheLookup::Miss => self.reload_and_store(backend, &key, path, kind),
            CacheLookup::Hit(Some(handle)) => {
                let environment = self.resolve_environment(&handle, kind)?;
                if environment.is_development() && is_stale(path, &handle) {
                    debug!(key = %key, "cached config is stale, reparsing");
                    self.reload_and_store(backend, &key, path, kind)
                } else {
                    Ok(Some(handle))
                }
            }
            CacheLookup::Hit(None) => {
                // Cached absence. Only development-like environments
                // probe whether the file has started existing.
                if self.resolver.current().is_development() && path.exists() {
                    debug!(key = %key, "previously missing config appeared, reparsing");
                    self.reload_and_store(backend, &key, path, kind)
                } else {
                    Ok(None)
                }
            }
        }
    }

    /// Parse, resolve the environment, and pre-warm environment data.
    ///
    /// This is also the whole load path when no backend is configured,
    /// so cached and uncached loads return the same conceptual object.
    fn parse_and_precompute(
        &self,
        path: &Path,
        kind: ConfigKind,
    ) -> Result<Option<Arc<ConfigHandle>>, ConfigError> {
        let Some(mut handle) = self.source.parse(path, kind)? else {
            return Ok(None);
        };
        let environment = self.resolve_environment(&handle, kind)?;
        self.precompute_environment_data(&mut handle, &environment.name);
        Ok(Some(Arc::new(handle)))
    }

    fn reload_and_store(
        &self,
        backend: &Arc<dyn CacheBackend>,
        key: &str,
        path: &Path,
        kind: ConfigKind,
    ) -> Result<Option<Arc<ConfigHandle>>, ConfigError> {
        debug!(key = %key, source = self.source.name(), "loading from source");
        let handle = self.parse_and_precompute(path, kind)?;
        let ttl = if handle.is_some() {
            self.settings.ttl
        } else {
            self.settings.effective_negative_ttl()
        };
        if let Err(e) = backend.save(key, handle.clone(), ttl, &self.settings.tags) {
            warn!(key = %key, error = %e, "cache save failed, serving uncached result");
        }
        Ok(handle)
    }

    /// Environment resolution dispatch.
    ///
    /// System and environment configs are the source of detection data,
    /// so they resolve through their own hints; plain configs consume
    /// the ambient environment already determined elsewhere.
    fn resolve_environment(
        &self,
        handle: &ConfigHandle,
        kind: ConfigKind,
    ) -> Result<Environment, ConfigError> {
        if kind.is_system() || kind.is_environment() {
            let environment = self
                .resolver
                .detect_from_system_config(handle.detection_hints().unwrap_or(&Value::Null))?;
            Ok(environment)
        } else {
            Ok(self.resolver.current())
        }
    }

    /// Pre-warm resolved data for the environment and its group.
    ///
    /// Resolving here means the stored handle already carries every
    /// section an adjacent group member needs, so later reads of any
    /// of them never trigger a reparse.
    fn precompute_environment_data(&self, handle: &mut ConfigHandle, environment: &str) {
        if environment.is_empty() {
            return;
        }
        let mut names: Vec<&str> = vec![environment];
        if let Some(group) = self.settings.environment_groups.get(environment) {
            for name in group {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        for name in names {
            handle.resolve(name);
        }
    }
}

/// Fresh staleness probe against the filesystem.
///
/// `std::fs::metadata` always issues a fresh stat syscall, so there is
/// no OS-level stat cache to bypass. A probe that fails (removed file,
/// permission change) counts as stale: failing toward a reparse is the
/// safer default.
fn is_stale(path: &Path, handle: &ConfigHandle) -> bool {
    match std::fs::metadata(path).and_then(|m| m.modified()) {
        Ok(modified) => modified > handle.last_modified(),
        Err(_) => true,
    }
}
