//! Configuration
//!
//! JSON config file selecting the document store and collection,
//! with environment variable overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::domain::{DomainError, DomainResult};

pub const DEFAULT_COLLECTION: &str = "pantry";
pub const CONFIG_FILE_NAME: &str = "pantry_config.json";

/// Which document store backs the pantry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    Memory,
    Sqlite {
        path: PathBuf,
    },
    Firestore {
        project_id: String,
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default = "default_database")]
        database: String,
        #[serde(default)]
        base_url: Option<String>,
    },
}

fn default_database() -> String {
    "(default)".to_string()
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Sqlite {
            path: PathBuf::from("pantry.db"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PantryConfig {
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default)]
    pub store: StoreConfig,
    /// Directory for rolling log files; no file logging when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl Default for PantryConfig {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            store: StoreConfig::default(),
            log_dir: None,
        }
    }
}

impl PantryConfig {
    /// Load config from `path`, falling back to defaults when the file is missing
    pub fn load(path: &Path) -> DomainResult<Self> {
        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| DomainError::Internal(format!("Failed to read {}: {}", path.display(), e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| DomainError::Internal(format!("Invalid config {}: {}", path.display(), e)))
    }

    pub fn save(&self, path: &Path) -> DomainResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DomainError::Internal(format!("Failed to create {}: {}", parent.display(), e)))?;
            }
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| DomainError::Internal(e.to_string()))?;
        std::fs::write(path, json)
            .map_err(|e| DomainError::Internal(format!("Failed to write {}: {}", path.display(), e)))
    }

    /// Apply `PANTRY_*` environment overrides
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(collection) = var("PANTRY_COLLECTION").filter(|v| !v.is_empty()) {
            self.collection = collection;
        }
        if let Some(path) = var("PANTRY_SQLITE_PATH").filter(|v| !v.is_empty()) {
            self.store = StoreConfig::Sqlite { path: PathBuf::from(path) };
        }
        if let Some(project_id) = var("PANTRY_FIRESTORE_PROJECT").filter(|v| !v.is_empty()) {
            self.store = StoreConfig::Firestore {
                project_id,
                api_key: var("PANTRY_FIRESTORE_API_KEY").filter(|v| !v.is_empty()),
                database: default_database(),
                base_url: None,
            };
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = PantryConfig::load(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(config, PantryConfig::default());
        assert_eq!(config.collection, "pantry");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join(CONFIG_FILE_NAME);
        let config = PantryConfig {
            collection: "kitchen".to_string(),
            store: StoreConfig::Firestore {
                project_id: "pantry-app".to_string(),
                api_key: Some("k".to_string()),
                database: "(default)".to_string(),
                base_url: None,
            },
            log_dir: Some(PathBuf::from("logs")),
        };
        config.save(&path).unwrap();
        assert_eq!(PantryConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_parse_minimal_json() {
        let config: PantryConfig =
            serde_json::from_str(r#"{ "store": { "backend": "firestore", "project_id": "p" } }"#).unwrap();
        assert_eq!(config.collection, "pantry");
        assert_eq!(
            config.store,
            StoreConfig::Firestore {
                project_id: "p".to_string(),
                api_key: None,
                database: "(default)".to_string(),
                base_url: None,
            }
        );

        let memory: PantryConfig = serde_json::from_str(r#"{ "store": { "backend": "memory" } }"#).unwrap();
        assert_eq!(memory.store, StoreConfig::Memory);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("PANTRY_COLLECTION", "shed"),
            ("PANTRY_SQLITE_PATH", "/tmp/p.db"),
        ]
        .into_iter()
        .collect();
        let config = PantryConfig::default().with_overrides(|name| vars.get(name).map(|v| v.to_string()));
        assert_eq!(config.collection, "shed");
        assert_eq!(config.store, StoreConfig::Sqlite { path: PathBuf::from("/tmp/p.db") });
    }
}
