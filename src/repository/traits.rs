//! Repository Layer - Core Traits
//!
//! Defines the document-store contract the engine is written against.
//! Implementations can use an in-memory map, SQLite, or a hosted document database.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::domain::DomainResult;

/// Schema-less field map of one document
pub type Fields = Map<String, Value>;

/// A document as returned by `list_all`
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub key: String,
    pub fields: Fields,
}

/// How `set` treats fields already stored under the key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Replace the whole document
    Replace,
    /// Overwrite only the listed fields, keep the rest
    Merge,
}

/// Remote item store addressed by collection name and document key.
///
/// Read failures are reported as `DomainError::TransientFetch`,
/// write and delete failures as `DomainError::Store`.
/// Timeouts belong to the implementation.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Read one document; `None` when it does not exist
    async fn get(&self, collection: &str, key: &str) -> DomainResult<Option<Fields>>;

    /// Create or write a document
    async fn set(&self, collection: &str, key: &str, fields: Fields, mode: WriteMode) -> DomainResult<()>;

    /// Delete a document; deleting a missing document succeeds
    async fn delete(&self, collection: &str, key: &str) -> DomainResult<()>;

    /// Read every document of a collection
    async fn list_all(&self, collection: &str) -> DomainResult<Vec<Document>>;
}

#[async_trait]
impl<S: ItemStore + ?Sized> ItemStore for Box<S> {
    async fn get(&self, collection: &str, key: &str) -> DomainResult<Option<Fields>> {
        (**self).get(collection, key).await
    }

    async fn set(&self, collection: &str, key: &str, fields: Fields, mode: WriteMode) -> DomainResult<()> {
        (**self).set(collection, key, fields, mode).await
    }

    async fn delete(&self, collection: &str, key: &str) -> DomainResult<()> {
        (**self).delete(collection, key).await
    }

    async fn list_all(&self, collection: &str) -> DomainResult<Vec<Document>> {
        (**self).list_all(collection).await
    }
}

#[async_trait]
impl<S: ItemStore + ?Sized> ItemStore for std::sync::Arc<S> {
    async fn get(&self, collection: &str, key: &str) -> DomainResult<Option<Fields>> {
        (**self).get(collection, key).await
    }

    async fn set(&self, collection: &str, key: &str, fields: Fields, mode: WriteMode) -> DomainResult<()> {
        (**self).set(collection, key, fields, mode).await
    }

    async fn delete(&self, collection: &str, key: &str) -> DomainResult<()> {
        (**self).delete(collection, key).await
    }

    async fn list_all(&self, collection: &str) -> DomainResult<Vec<Document>> {
        (**self).list_all(collection).await
    }
}

/// Apply a write to an existing field map the way every store does
pub(crate) fn apply_write(existing: Option<Fields>, fields: Fields, mode: WriteMode) -> Fields {
    match (mode, existing) {
        (WriteMode::Merge, Some(mut current)) => {
            for (name, value) in fields {
                current.insert(name, value);
            }
            current
        }
        _ => fields,
    }
}
