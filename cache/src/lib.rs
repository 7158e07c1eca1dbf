//! # Configuration Cache
//!
//! Staleness-aware caching around configuration loading.
//!
//! This crate provides:
//! - The cached loading orchestrator (`CachedLoader`)
//! - Cache-key derivation from source paths
//! - Tunable cache settings (ttl, tags, environment groups)
//! - A file-backed configuration source (TOML/YAML)
//! - A rule-based environment resolver
//! - An in-process cache backend with ttl and tag invalidation
//! - Hot-reload driven cache invalidation
//!
//! # Best Practices
//!
//! - Caching is strictly an optimization: every path degrades to a
//!   direct parse when the backend is absent or failing
//! - Production-like environments serve cached configuration with zero
//!   filesystem access; development-like environments pay one stat per
//!   load to detect changed files

pub mod backend;
pub mod environment;
pub mod hot_reload;
pub mod key;
pub mod loader;
pub mod settings;
pub mod source;

pub use backend::{BackendStats, MemoryBackend};
pub use environment::RuleResolver;
pub use hot_reload::{watch_and_invalidate, watch_config, WatchEvent};
pub use key::cache_key;
pub use loader::CachedLoader;
pub use settings::CacheSettings;
pub use source::FileSource;
