//! Core types for the configuration cache.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// Reserved section name for data shared by every environment.
pub const COMMON_SECTION: &str = "common";

/// Reserved section name carrying environment-detection hints.
/// Only meaningful in system configs.
pub const DETECTION_SECTION: &str = "environments";

/// Kind of configuration file being loaded.
///
/// System configs carry environment-detection hints; environment
/// configs are scoped to a single environment. The combinations form a
/// small closed set, so this is a tagged enum rather than bit flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigKind {
    /// Ordinary application config; consumes the ambient environment.
    Common,
    /// System config; the source of environment detection data.
    System,
    /// Environment-scoped config.
    Environment,
    /// System config that is also environment-scoped.
    SystemEnvironment,
}

impl ConfigKind {
    pub fn is_system(self) -> bool {
        matches!(self, ConfigKind::System | ConfigKind::SystemEnvironment)
    }

    pub fn is_environment(self) -> bool {
        matches!(self, ConfigKind::Environment | ConfigKind::SystemEnvironment)
    }
}

/// A resolved named runtime environment.
///
/// Development-like environments expect configuration to change
/// frequently and therefore pay a per-request staleness check; all
/// other environments serve cached configuration with no filesystem
/// access at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    /// Environment name, e.g. "production" or "dev".
    pub name: String,
    /// Whether staleness checks apply in this environment.
    pub development_like: bool
}

impl Environment {
    pub fn new(name: impl Into<String>, development_like: bool) -> Self {
        Self {
            name: name.into(),
            development_like,
        }
    }

    pub fn is_development(&self) -> bool {
        self.development_like
    }
}

/// Outcome of a cache backend lookup.
///
/// `Hit(None)` is a stored negative entry: the source was parsed before
/// and legitimately did not exist. Callers must treat it as a valid
/// "config file does not exist" answer.
#[derive(Debug, Clone)]
pub enum CacheLookup {
    /// No entry stored under the key (or the entry expired).
    Miss,
    /// A stored entry: a parsed handle, or a cached absence.
    Hit(Option<Arc<ConfigHandle>>)
}

/// A parsed, environment-resolvable configuration object.
///
/// The raw document is a mapping of top-level sections: the reserved
/// `common` section holds shared data, the reserved `environments`
/// section holds detection hints, and every other section belongs to
/// the environment it is named after. Resolved (common + environment)
/// data is memoized per environment name, so a handle that was
/// precomputed before caching never triggers a reparse on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigHandle {
    path: PathBuf,
    last_modified: SystemTime,
    sections: BTreeMap<String, Value>,
    resolved: BTreeMap<String, Value>,
}

impl ConfigHandle {
    /// Create a handle from a freshly parsed document.
    ///
    /// `last_modified` must be the source's modification time at parse
    /// time; the staleness check compares against it.
    pub fn new(
        path: impl Into<PathBuf>,
        last_modified: SystemTime,
        sections: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            path: path.into(),
            last_modified,
            sections,
            resolved: BTreeMap::new(),
        }
    }

    /// Source path this handle was parsed from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Source modification time recorded at parse time.
    pub fn last_modified(&self) -> SystemTime {
        self.last_modified
    }

    /// Environment-detection hints, if the document carries any.
    pub fn detection_hints(&self) -> Option<&Value> {
        self.sections.get(DETECTION_SECTION)
    }

    /// Whether the raw document has a section with this exact name.
    pub fn has_section(&self, name: &str) -> bool {
        self.sections.contains_key(name)
    }

    /// The raw top-level sections as parsed.
    pub fn sections(&self) -> &BTreeMap<String, Value> {
        &self.sections
    }

    /// Whether resolved data for this environment is already memoized.
    pub fn is_resolved(&self, environment: &str) -> bool {
        self.resolved.contains_key(environment)
    }

    /// Resolve and memoize the merged data for an environment.
    ///
    /// The result is the `common` section deep-merged with the named
    /// section (environment values win). An environment with no section
    /// of its own resolves to the common data alone. Repeated calls for
    /// the same name return the memoized value without recomputing.
    pub fn resolve(&mut self, environment: &str) -> &Value {
        let sections = &self.sections;
        let merged = self
            .resolved
            .entry(environment.to_string())
            .or_insert_with(|| {
                let mut base = sections
                    .get(COMMON_SECTION)
                    .cloned()
                    .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
                if environment != COMMON_SECTION {
                    if let Some(overlay) = sections.get(environment) {
                        deep_merge(&mut base, overlay);
                    }
                }
                base
            });
        merged
    }

    /// Read already-resolved data for an environment, if memoized.
    pub fn data(&self, environment: &str) -> Option<&Value> {
        self.resolved.get(environment)
    }
}

/// Deep-merge `overlay` into `base`.
///
/// Mappings merge recursively; any other value in the overlay replaces
/// the base value outright (override, not concatenation).
pub fn deep_merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => {
                        base_map.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
        }
        (base, overlay) => {
            *base = overlay.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn handle_with(sections: serde_json::Value) -> ConfigHandle {
        let Value::Object(map) = sections else {
            panic!("test sections must be a map");
        };
        ConfigHandle::new(
            PathBuf::from("/app/config.toml"),
            SystemTime::UNIX_EPOCH,
            map.into_iter().collect(),
        )
    }

    #[test]
    fn test_config_kind_flags() {
        assert!(ConfigKind::System.is_system());
        assert!(!ConfigKind::System.is_environment());
        assert!(ConfigKind::Environment.is_environment());
        assert!(!ConfigKind::Environment.is_system());
        assert!(ConfigKind::SystemEnvironment.is_system());
        assert!(ConfigKind::SystemEnvironment.is_environment());
        assert!(!ConfigKind::Common.is_system());
        assert!(!ConfigKind::Common.is_environment());
    }

    #[test]
    fn test_deep_merge_nested_override() {
        let mut base = json!({
            "db": { "host": "localhost", "port": 5432 },
            "debug": false
        });
        let overlay = json!({
            "db": { "host": "prod-db" },
            "debug": true
        });
        deep_merge(&mut base, &overlay);
        assert_eq!(base["db"]["host"], "prod-db");
        assert_eq!(base["db"]["port"], 5432);
        assert_eq!(base["debug"], true);
    }

    #[test]
    fn test_deep_merge_scalar_replaces_map() {
        let mut base = json!({ "feature": { "enabled": true } });
        let overlay = json!({ "feature": "off" });
        deep_merge(&mut base, &overlay);
        assert_eq!(base["feature"], "off");
    }

    #[test]
    fn test_resolve_merges_common_and_section() {
        let mut handle = handle_with(json!({
            "common": { "db": { "host": "localhost" }, "debug": false },
            "production": { "db": { "host": "prod-db" } }
        }));

        let resolved = handle.resolve("production").clone();
        assert_eq!(resolved["db"]["host"], "prod-db");
        assert_eq!(resolved["debug"], false);
    }

    #[test]
    fn test_resolve_unknown_environment_yields_common() {
        let mut handle = handle_with(json!({
            "common": { "debug": false }
        }));

        let resolved = handle.resolve("staging").clone();
        assert_eq!(resolved, json!({ "debug": false }));
        assert!(handle.is_resolved("staging"));
    }

    #[test]
    fn test_resolve_is_memoized() {
        let mut handle = handle_with(json!({
            "common": { "a": 1 },
            "dev": { "a": 2 }
        }));

        let first = handle.resolve("dev").clone();
        let second = handle.resolve("dev").clone();
        assert_eq!(first, second);
        assert_eq!(first["a"], 2);
        assert!(handle.is_resolved("dev"));
        assert!(handle.data("dev").is_some());
        assert!(handle.data("production").is_none());
    }

    #[test]
    fn test_detection_hints_exposed() {
        let handle = handle_with(json!({
            "environments": { "production": { "hosts": ["prod-01"] } },
            "common": {}
        }));
        assert!(handle.detection_hints().is_some());
        assert!(handle.has_section("environments"));
        assert!(!handle.has_section("production"));
    }

    #[test]
    fn test_handle_survives_serialization_with_resolved_data() {
        let mut handle = handle_with(json!({
            "common": { "a": 1 },
            "staging": { "a": 2 }
        }));
        handle.resolve("staging");

        let encoded = serde_json::to_string(&handle).unwrap();
        let decoded: ConfigHandle = serde_json::from_str(&encoded).unwrap();
        assert!(decoded.is_resolved("staging"));
        assert_eq!(decoded.data("staging").unwrap()["a"], 2);
        assert_eq!(decoded.last_modified(), handle.last_modified());
    }
}
