//! # Confcache Errors
//!
//! Comprehensive error handling for the confcache system.
//!
//! Follows Microsoft Pragmatic Rust Guidelines:
//! - Uses `thiserror` for structured error definitions
//! - Provides `Display` and `Error` trait implementations
//! - Includes error context for debugging

use thiserror::Error;

/// Configuration loading and parsing errors.
///
/// Structural errors (`Parse`, `ContractViolation`) always propagate to
/// the caller; they are never cached and never masked by a stale cache
/// entry. A missing source is not an error at all - it is represented
/// as an absent result and may be cached as a negative entry.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config file has no extension")]
    NoExtension,

    #[error("Unsupported config file format: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("Configuration contract violated: {reason}")]
    ContractViolation { reason: String },

    #[error("Environment resolution failed: {0}")]
    Resolve(#[from] ResolveError),
}

/// Cache backend errors.
///
/// These never surface to `load` callers: the orchestrator degrades to
/// direct parsing when the backend misbehaves, because caching is an
/// optimization and not a correctness requirement.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache backend error: {reason}")]
    Backend { reason: String },

    #[error("Cache backend lock poisoned")]
    Poisoned,
}

/// Environment detection errors.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Environment detection failed: {reason}")]
    Detection { reason: String },
}
