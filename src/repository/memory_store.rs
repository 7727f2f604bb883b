//! In-Memory Store
//!
//! Map-backed `ItemStore` for tests and the `memory` backend.
//! Supports injected read/delete failures and per-call latency.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::domain::{DomainError, DomainResult};
use super::traits::{apply_write, Document, Fields, ItemStore, WriteMode};

type Collections = HashMap<String, BTreeMap<String, Fields>>;

#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<Mutex<Collections>>,
    fail_reads: Arc<AtomicBool>,
    failing_deletes: Arc<Mutex<HashSet<String>>>,
    latency: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep before every call so concurrent callers interleave
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    /// Make every following read fail until switched off
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make deletes of `key` fail
    pub async fn fail_delete_of(&self, key: &str) {
        self.failing_deletes.lock().await.insert(key.to_string());
    }

    /// Raw document, bypassing injected failures
    pub async fn peek(&self, collection: &str, key: &str) -> Option<Fields> {
        self.collections
            .lock()
            .await
            .get(collection)
            .and_then(|docs| docs.get(key))
            .cloned()
    }

    async fn pause(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn check_read(&self) -> DomainResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(DomainError::TransientFetch("injected read failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn get(&self, collection: &str, key: &str) -> DomainResult<Option<Fields>> {
        self.pause().await;
        self.check_read()?;
        Ok(self.peek(collection, key).await)
    }

    async fn set(&self, collection: &str, key: &str, fields: Fields, mode: WriteMode) -> DomainResult<()> {
        self.pause().await;
        let mut collections = self.collections.lock().await;
        let docs = collections.entry(collection.to_string()).or_default();
        let merged = apply_write(docs.remove(key), fields, mode);
        docs.insert(key.to_string(), merged);
        Ok(())
    }

    async fn delete(&self, collection: &str, key: &str) -> DomainResult<()> {
        self.pause().await;
        if self.failing_deletes.lock().await.contains(key) {
            return Err(DomainError::Store(format!("injected delete failure for {}", key)));
        }
        if let Some(docs) = self.collections.lock().await.get_mut(collection) {
            docs.remove(key);
        }
        Ok(())
    }

    async fn list_all(&self, collection: &str) -> DomainResult<Vec<Document>> {
        self.pause().await;
        self.check_read()?;
        let collections = self.collections.lock().await;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(key, fields)| Document {
                        key: key.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}
