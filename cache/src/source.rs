//! # File-backed Configuration Source
//!
//! Parses configuration files into section maps.
//!
//! Supports automatic format detection based on file extension.

use cc_core::{ConfigHandle, ConfigKind, ConfigSource};
use errors::ConfigError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Configuration source reading TOML or YAML files from disk.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// The default `ConfigSource`: reads the file at the given path,
/// detects the format from the extension, and splits the top-level
/// tables into the handle's sections. The file's modification time is
/// recorded on the handle for later staleness checks.
///
/// ## Supported Formats
/// - `.toml`: TOML format
/// - `.yaml`: YAML format
/// - `.yml`: YAML format
///
/// ## Error Handling
/// Returns `Ok(None)` when the file does not exist. Returns
/// `ConfigError` for:
/// - Missing or unsupported file extension
/// - Invalid TOML/YAML syntax
/// - A document whose top level is not a table
#[derive(Debug, Default)]
pub struct FileSource;

impl FileSource {
    pub fn new() -> Self {
        Self
    }

    fn parse_document(path: &Path, extension: &str, contents: &str) -> Result<Value, ConfigError> {
        match extension.to_lowercase().as_str() {
            "toml" => toml::from_str(contents).map_err(|e| ConfigError::Parse {
                path: path.display().to_string(),
                reason: e.to_string(),
            }),
            "yaml" | "yml" => serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse {
                path: path.display().to_string(),
                reason: e.to_string(),
            }),
            other => Err(ConfigError::UnsupportedFormat {
                extension: other.to_string(),
            }),
        }
    }

    fn sections_from(path: &Path, document: Value) -> Result<BTreeMap<String, Value>, ConfigError> {
        match document {
            Value::Object(map) => Ok(map.into_iter().collect()),
            // An empty YAML file parses to null; treat it as an empty config.
            Value::Null => Ok(BTreeMap::new()),
            other => Err(ConfigError::ContractViolation {
                reason: format!(
                    "top level of {} must be a table, got {}",
                    path.display(),
                    type_name(&other)
                ),
            }),
        }
    }
}

impl ConfigSource for FileSource {
    fn parse(&self, path: &Path, _kind: ConfigKind) -> Result<Option<ConfigHandle>, ConfigError> {
        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or(ConfigError::NoExtension)?;

        let contents = std::fs::read_to_string(path)?;
        let document = Self::parse_document(path, extension, &contents)?;
        let sections = Self::sections_from(path, document)?;
        let last_modified = metadata.modified()?;

        Ok(Some(ConfigHandle::new(path, last_modified, sections)))
    }

    fn name(&self) -> &str {
        "file"
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a table",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::SystemTime;
    use tempfile::tempdir;

    fn write_config(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_source_name() {
        assert_eq!(FileSource::new().name(), "file");
    }

    #[test]
    fn test_parse_toml_sections() {
        let dir = tempdir().unwrap();
        let path = write_config(
            &dir,
            "config.toml",
            r#"
[common]
debug = false

[common.db]
host = "localhost"

[production]
debug = false

[dev]
debug = true
"#,
        );

        let handle = FileSource::new()
            .parse(&path, ConfigKind::Common)
            .unwrap()
            .unwrap();
        assert!(handle.has_section("common"));
        assert!(handle.has_section("production"));
        assert!(handle.has_section("dev"));
        assert_eq!(handle.path(), path);
    }

    #[test]
    fn test_parse_yaml_sections() {
        let dir = tempdir().unwrap();
        let path = write_config(
            &dir,
            "config.yaml",
            r#"
common:
  db:
    host: localhost
staging:
  db:
    host: staging-db
"#,
        );

        let mut handle = FileSource::new()
            .parse(&path, ConfigKind::Common)
            .unwrap()
            .unwrap();
        let resolved = handle.resolve("staging").clone();
        assert_eq!(resolved["db"]["host"], "staging-db");
    }

    #[test]
    fn test_parse_missing_file_is_absent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nonexistent.toml");
        let result = FileSource::new().parse(&path, ConfigKind::Common).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_parse_invalid_toml_fails() {
        let dir = tempdir().unwrap();
        let path = write_config(&dir, "broken.toml", "[unclosed");
        let result = FileSource::new().parse(&path, ConfigKind::Common);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_parse_no_extension_fails() {
        let dir = tempdir().unwrap();
        let path = write_config(&dir, "config", "a = 1");
        let result = FileSource::new().parse(&path, ConfigKind::Common);
        assert!(matches!(result, Err(ConfigError::NoExtension)));
    }

    #[test]
    fn test_parse_unsupported_format_fails() {
        let dir = tempdir().unwrap();
        let path = write_config(&dir, "config.json", "{}");
        let result = FileSource::new().parse(&path, ConfigKind::Common);
        assert!(matches!(
            result,
            Err(ConfigError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_parse_scalar_top_level_violates_contract() {
        let dir = tempdir().unwrap();
        let path = write_config(&dir, "config.yaml", "just a string");
        let result = FileSource::new().parse(&path, ConfigKind::Common);
        assert!(matches!(
            result,
            Err(ConfigError::ContractViolation { .. })
        ));
    }

    #[test]
    fn test_parse_empty_yaml_is_empty_config() {
        let dir = tempdir().unwrap();
        let path = write_config(&dir, "empty.yaml", "");
        let handle = FileSource::new()
            .parse(&path, ConfigKind::Common)
            .unwrap()
            .unwrap();
        assert!(!handle.has_section("common"));
    }

    #[test]
    fn test_parse_records_modification_time() {
        let dir = tempdir().unwrap();
        let before = SystemTime::now();
        let path = write_config(&dir, "config.toml", "[common]\na = 1");
        let handle = FileSource::new()
            .parse(&path, ConfigKind::Common)
            .unwrap()
            .unwrap();
        // Filesystem timestamps may be coarser than SystemTime::now.
        let slack = std::time::Duration::from_secs(2);
        assert!(handle.last_modified() + slack > before);
    }
}
