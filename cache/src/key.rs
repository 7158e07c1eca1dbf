//! # Cache Key Derivation
//!
//! Maps source paths to deterministic cache keys. Paths under the
//! application root keep their relative structure so keys stay portable
//! across deployments rooted differently; any other path is flattened
//! into a separator-free string.

use std::path::Path;

/// Derive the cache key for a source path.
///
/// A path under `app_root` becomes the remainder after stripping the
/// root prefix, with separators normalized to `/`. Any other path is
/// flattened: volume separators (`:`) are dropped and path separators
/// become `_`.
///
/// Same input, same output; collision-resistant for the
/// developer-controlled path sets an application actually uses, though
/// not for adversarial inputs (`/a/b` and `_a_b` flatten identically).
pub fn cache_key(path: &Path, app_root: &Path) -> String {
    if !app_root.as_os_str().is_empty() {
        if let Ok(relative) = path.strip_prefix(app_root) {
            return relative.to_string_lossy().replace('\\', "/");
        }
    }

    let mut key = String::new();
    for ch in path.to_string_lossy().chars() {
        match ch {
            ':' => {}
            '/' | '\\' => key.push('_'),
            other => key.push(other),
        }
    }
    key
}
