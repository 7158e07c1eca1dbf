//! # Confcache Core
//!
//! Shared types and traits for the confcache system.
//!
//! This crate provides:
//! - The parsed configuration object (`ConfigHandle`) with memoized
//!   per-environment resolution
//! - The configuration kind and environment types
//! - Collaborator traits for sources, resolvers and cache backends
//!
//! # Best Practices
//!
//! - Follows Microsoft Pragmatic Rust Guidelines
//! - Uses Rust Edition 2024 (never back)
//! - Comprehensive error handling with `thiserror` via the `errors` crate

pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use traits::{CacheBackend, ConfigSource, EnvironmentResolver};
pub use types::{
    CacheLookup, ConfigHandle, ConfigKind, Environment, COMMON_SECTION, DETECTION_SECTION,
};
