//! Pantry Backend
//!
//! Layered architecture:
//! - domain: Core entities and business rules
//! - repository: Document store abstraction and implementations
//! - engine: Inventory sync and the filtered, sorted view
//! - commands: Handlers the front end calls

pub mod config;
pub mod domain;
pub mod repository;
pub mod engine;
pub mod commands;

use config::PantryConfig;
use domain::DomainResult;
use engine::PantryEngine;
use repository::{open_store, ItemStore};

/// Application state shared across commands
pub struct AppState {
    pub engine: PantryEngine<Box<dyn ItemStore>>,
    pub config: PantryConfig,
}

impl AppState {
    /// Open the configured store and build the engine over its collection
    pub fn from_config(config: PantryConfig) -> DomainResult<Self> {
        let store = open_store(&config.store)?;
        let engine = PantryEngine::new(store, config.collection.clone());
        Ok(Self { engine, config })
    }
}
