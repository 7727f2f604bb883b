//! Domain Layer - Core Entity Trait
//!
//! This trait defines the basic contract for all domain entities.
//! All entities must have a unique key and be thread-safe.

use serde::{Deserialize, Serialize};

/// Core trait for all domain entities
pub trait Entity: Sized + Send + Sync + Clone {
    /// The type of the entity's unique identifier
    type Id: Clone + Eq + std::hash::Hash + Send + Sync;

    /// Returns the entity's unique identifier
    fn id(&self) -> Self::Id;
}

/// Common result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Outcome of clearing the whole pantry.
///
/// Names are display names; failures carry the store's message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearReport {
    pub deleted: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl ClearReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Domain-level errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainError {
    InvalidInput(String),
    /// Concurrent writer detected. Not raised by the current stores.
    Conflict(String),
    /// A store read failed; the published view was left untouched.
    TransientFetch(String),
    /// A store write or delete failed.
    Store(String),
    /// Some deletes of a clear succeeded and some did not.
    PartialClear(ClearReport),
    Internal(String),
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomainError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            DomainError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            DomainError::TransientFetch(msg) => write!(f, "Fetch failed: {}", msg),
            DomainError::Store(msg) => write!(f, "Store error: {}", msg),
            DomainError::PartialClear(report) => {
                let names: Vec<&str> = report.failed.iter().map(|(name, _)| name.as_str()).collect();
                write!(
                    f,
                    "Partial clear: {} deleted, {} failed ({})",
                    report.deleted.len(),
                    report.failed.len(),
                    names.join(", ")
                )
            }
            DomainError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {}
