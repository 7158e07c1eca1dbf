//! # Cache Settings
//!
//! Tunable state governing every cached load: entry lifetimes, tags
//! and environment groups. Built once at startup and handed to the
//! orchestrator by value; there is deliberately no process-wide state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

/// Settings for the cached configuration loader.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Carries the ttl, tag set and environment-group mapping applied to
/// every save, plus the application root used for cache-key
/// derivation.
///
/// ## Usage
/// ```rust
/// use cache::CacheSettings;
/// use std::time::Duration;
///
/// let settings = CacheSettings {
///     ttl: Some(Duration::from_secs(3600)),
///     app_root: "/app".into(),
///     ..CacheSettings::default()
/// };
/// assert_eq!(settings.tags, vec!["config".to_string()]);
/// ```
///
/// ## Fields
/// - `ttl`: entry lifetime, `None` means unlimited (the default)
/// - `negative_ttl`: lifetime for cached negative results; falls back
///   to `ttl` when unset
/// - `tags`: tags stored with every entry, `["config"]` by default
/// - `environment_groups`: environment name to the other environment
///   names whose data must be kept in the same cache entry
/// - `app_root`: application root path stripped during key derivation
///
/// ## Validation
/// At least one tag must be present; group names must be non-empty.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct CacheSettings {
    /// Entry lifetime; `None` means unlimited.
    #[serde(default)]
    pub ttl: Option<Duration>,

    /// Lifetime for cached negative (not-found) results.
    ///
    /// `None` falls back to `ttl`, preserving the historic behavior of
    /// caching absence exactly like presence. Deployments that want a
    /// config file to be noticed soon after it starts existing set
    /// this shorter than `ttl`.
    #[serde(default)]
    pub negative_ttl: Option<Duration>,

    /// Tags stored with every cache entry, for bulk invalidation.
    #[validate(length(min = 1))]
    #[serde(default = "default_tags")]
    pub tags: Vec<String>,

    /// Environment name to the fallback environment names resolved and
    /// cached together with it.
    #[serde(default)]
    #[validate(custom(function = "validate_environment_groups"))]
    pub environment_groups: BTreeMap<String, Vec<String>>,

    /// Application root; paths under it derive portable relative keys.
    #[serde(default)]
    pub app_root: PathBuf,
}

fn default_tags() -> Vec<String> {
    vec!["config".to_string()]
}

fn validate_environment_groups(
    groups: &BTreeMap<String, Vec<String>>,
) -> Result<(), validator::ValidationError> {
    for (name, members) in groups {
        if name.is_empty() || members.iter().any(String::is_empty) {
            return Err(validator::ValidationError::new("Empty environment name"));
        }
    }
    Ok(())
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl: None,
            negative_ttl: None,
            tags: default_tags(),
            environment_groups: BTreeMap::new(),
            app_root: PathBuf::new(),
        }
    }
}

impl CacheSettings {
    /// The ttl applied to negative entries: `negative_ttl`, or `ttl`
    /// when unset.
    pub fn effective_negative_ttl(&self) -> Option<Duration> {
        self.negative_ttl.or(self.ttl)
    }
}
