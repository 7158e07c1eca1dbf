//! # Rule-based Environment Resolution
//!
//! Resolves the active named environment from a system config's
//! detection hints.
//!
//! # Hint Format
//! The hints are the config's `environments` section: one entry per
//! environment name, each carrying the rules that select it:
//!
//! ```toml
//! [environments.staging]
//! variable = { name = "APP_ENV", value = "staging" }
//!
//! [environments.production]
//! hosts = ["prod-01", "prod-02"]
//! ```
//!
//! The first environment whose rules match wins; with no match the
//! configured default applies. Detection runs once per resolver
//! instance and is memoized, so concurrent first calls converge on one
//! result.

use cc_core::{Environment, EnvironmentResolver};
use errors::ResolveError;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::RwLock;
use tracing::{debug, info};

/// Environment resolver driven by env-var and hostname rules.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// The default `EnvironmentResolver`. Matches the detection hints of a
/// system config against the process environment and the machine
/// hostname, memoizes the first detection, and classifies environments
/// as development-like by name.
///
/// ## Usage
/// ```rust
/// use cache::RuleResolver;
/// use cc_core::EnvironmentResolver;
///
/// let resolver = RuleResolver::new().with_default("production");
/// let ambient = resolver.current();
/// assert_eq!(ambient.name, "production");
/// assert!(!ambient.is_development());
/// ```
///
/// ## Rules
/// - `variable`: `{ name, value }` matches when the named process
///   environment variable equals `value`; without `value`, when it is
///   set at all
/// - `hosts`: a list of hostnames; matches when the machine hostname
///   is one of them
pub struct RuleResolver {
    default_name: String,
    development_names: BTreeSet<String>,
    hostname: Option<String>,
    detected: RwLock<Option<Environment>>,
}

impl RuleResolver {
    pub fn new() -> Self {
        Self {
            default_name: "production".to_string(),
            development_names: ["dev", "development"]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            hostname: None,
            detected: RwLock::new(None),
        }
    }

    /// Environment name used when no rule matches.
    pub fn with_default(mut self, name: impl Into<String>) -> Self {
        self.default_name = name.into();
        self
    }

    /// Replace the set of names classified as development-like.
    pub fn with_development_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.development_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Fix the hostname used by `hosts` rules instead of reading the
    /// `HOSTNAME` process variable.
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    fn environment(&self, name: &str) -> Environment {
        Environment::new(name, self.development_names.contains(name))
    }

    fn hostname(&self) -> Option<String> {
        self.hostname
            .clone()
            .or_else(|| std::env::var("HOSTNAME").ok())
    }

    fn rules_match(&self, rules: &Value) -> bool {
        if let Some(variable) = rules.get("variable") {
            if let Some(name) = variable.get("name").and_then(Value::as_str) {
                match (std::env::var(name), variable.get("value").and_then(Value::as_str)) {
                    (Ok(actual), Some(expected)) if actual == expected => return true,
                    (Ok(_), None) => return true,
                    _ => {}
                }
            }
        }

        if let Some(hosts) = rules.get("hosts").and_then(Value::as_array) {
            if let Some(hostname) = self.hostname() {
                if hosts.iter().any(|h| h.as_str() == Some(hostname.as_str())) {
                    return true;
                }
            }
        }

        false
    }
}

impl Default for RuleResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvironmentResolver for RuleResolver {
    fn detect_from_system_config(&self, hints: &Value) -> Result<Environment, ResolveError> {
        if let Ok(guard) = self.detected.read() {
            if let Some(environment) = guard.as_ref() {
                return Ok(environment.clone());
            }
        }

        let name = match hints {
            Value::Null => self.default_name.clone(),
            Value::Object(map) => {
                let matched = map
                    .iter()
                    .find(|(_, rules)| self.rules_match(rules))
                    .map(|(name, _)| name.clone());
                match matched {
                    Some(name) => {
                        debug!(environment = %name, "environment detection rule matched");
                        name
                    }
                    None => self.default_name.clone(),
                }
            }
            _ => {
                return Err(ResolveError::Detection {
                    reason: "environment detection hints must be a table".to_string(),
                });
            }
        };

        let mut guard = self.detected.write().map_err(|_| ResolveError::Detection {
            reason: "resolver state lock poisoned".to_string(),
        })?;
        // First writer wins; later callers converge on its result.
        let environment = guard.get_or_insert_with(|| self.environment(&name)).clone();
        info!(
            environment = %environment.name,
            development_like = environment.development_like,
            "environment resolved"
        );
        Ok(environment)
    }

    fn current(&self) -> Environment {
        if let Ok(guard) = self.detected.read() {
            if let Some(environment) = guard.as_ref() {
                return environment.clone();
            }
        }
        self.environment(&self.default_name)
    }
}
