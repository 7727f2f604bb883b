//! Store Setup
//!
//! Builds the configured document store.

use crate::config::StoreConfig;
use crate::domain::DomainResult;
use super::{FirestoreStore, ItemStore, MemoryStore, SqliteStore};

/// Open the store described by `config`
pub fn open_store(config: &StoreConfig) -> DomainResult<Box<dyn ItemStore>> {
    match config {
        StoreConfig::Memory => {
            log::info!("Using in-memory store");
            Ok(Box::new(MemoryStore::new()))
        }
        StoreConfig::Sqlite { path } => {
            log::info!("Opening sqlite store at {}", path.display());
            Ok(Box::new(SqliteStore::open(path)?))
        }
        StoreConfig::Firestore { project_id, api_key, database, base_url } => {
            log::info!("Using firestore project {} database {}", project_id, database);
            Ok(Box::new(FirestoreStore::new(
                project_id.clone(),
                database.clone(),
                api_key.clone(),
                base_url.clone(),
            )?))
        }
    }
}
