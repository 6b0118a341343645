//! Reflector configuration
//!
//! Loaded from TOML; every section is optional and an empty document yields
//! the defaults (no restrictions).

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// Path that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Document is not valid TOML or has the wrong shape
    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Permission value could not be parsed
    #[error("Invalid permission value for {key}: {value}")]
    InvalidPermission {
        /// Entry key ("global" or a type pattern)
        key: String,
        /// Offending value
        value: String,
    },
}

/// Top-level configuration document
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReflectConfig {
    /// `[reflect]` table
    pub reflect: ReflectSection,
}

/// `[reflect]` table
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReflectSection {
    /// `[reflect.permissions]` table
    pub permissions: PermissionsSection,
}

/// `[reflect.permissions]` table
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PermissionsSection {
    /// Default for every type, e.g. `"ALL"`
    pub global: Option<String>,
    /// Per type name or `prefix*` pattern, e.g. `"User" = "READ|INVOKE"`.
    /// Entries keep document order, so earlier patterns take precedence.
    pub types: toml::Table,
}

impl PermissionsSection {
    /// Type entries in document order
    pub fn type_entries(&self) -> Result<Vec<(&str, &str)>, ConfigError> {
        self.types
            .iter()
            .map(|(pattern, value)| match value.as_str() {
                Some(text) => Ok((pattern.as_str(), text)),
                None => Err(ConfigError::InvalidPermission {
                    key: pattern.clone(),
                    value: value.to_string(),
                }),
            })
            .collect()
    }
}

impl ReflectConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Read and parse a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document() {
        let config = ReflectConfig::from_toml_str("").unwrap();
        assert!(config.reflect.permissions.global.is_none());
        assert!(config.reflect.permissions.types.is_empty());
    }

    #[test]
    fn test_full_document() {
        let config = ReflectConfig::from_toml_str(
            r#"
            [reflect.permissions]
            global = "READ"

            [reflect.permissions.types]
            "User" = "ALL"
            "Secret*" = "NONE"
            "#,
        )
        .unwrap();
        let perms = &config.reflect.permissions;
        assert_eq!(perms.global.as_deref(), Some("READ"));
        assert_eq!(perms.types.get("User").and_then(|v| v.as_str()), Some("ALL"));
        assert_eq!(perms.types.len(), 2);
    }

    #[test]
    fn test_type_entries_keep_document_order() {
        let config = ReflectConfig::from_toml_str(
            r#"
            [reflect.permissions.types]
            "Zeta" = "READ"
            "Secret*" = "NONE"
            "Se*" = "ALL"
            "#,
        )
        .unwrap();
        let entries = config.reflect.permissions.type_entries().unwrap();
        assert_eq!(
            entries,
            vec![("Zeta", "READ"), ("Secret*", "NONE"), ("Se*", "ALL")]
        );
    }

    #[test]
    fn test_non_string_type_entry() {
        let config = ReflectConfig::from_toml_str(
            r#"
            [reflect.permissions.types]
            "User" = 7
            "#,
        )
        .unwrap();
        match config.reflect.permissions.type_entries() {
            Err(ConfigError::InvalidPermission { key, value }) => {
                assert_eq!(key, "User");
                assert_eq!(value, "7");
            }
            other => panic!("expected invalid permission, got {other:?}"),
        }
    }

    #[test]
    fn test_wrong_shape() {
        let err = ReflectConfig::from_toml_str("[reflect]\npermissions = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = ReflectConfig::from_file(Path::new("/nonexistent/mirror.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
