//! Pantry Sync Engine
//!
//! Turns user intents into store calls, re-reads the collection after every
//! mutation and publishes the filtered, sorted list.
//!
//! Mutations on one key are serialized through a per-key mutex held for the
//! whole read-modify-write. That only covers callers sharing this engine:
//! another client writing the same document between our read and write still
//! wins silently (last writer wins, no conflict detection).

use futures::future::join_all;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::domain::{
    display_name, read_count, Category, ClearReport, DomainError, DomainResult, ItemKey, PantryItem,
};
use crate::repository::{Fields, ItemStore, WriteMode};
use super::view::{SortField, ViewState};

pub struct PantryEngine<S: ItemStore> {
    store: S,
    collection: String,
    view_state: RwLock<ViewState>,
    /// Last successful full read, unfiltered
    snapshot: RwLock<Vec<PantryItem>>,
    published: RwLock<Vec<PantryItem>>,
    key_locks: Mutex<HashMap<ItemKey, Arc<Mutex<()>>>>,
}

impl<S: ItemStore> PantryEngine<S> {
    pub fn new(store: S, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
            view_state: RwLock::new(ViewState::default()),
            snapshot: RwLock::new(Vec::new()),
            published: RwLock::new(Vec::new()),
            key_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Last published list
    pub async fn view(&self) -> Vec<PantryItem> {
        self.published.read().await.clone()
    }

    pub async fn view_state(&self) -> ViewState {
        self.view_state.read().await.clone()
    }

    // ========================
    // View parameters
    // ========================

    pub async fn set_search(&self, text: &str) -> Vec<PantryItem> {
        self.view_state.write().await.set_search(text);
        self.republish().await
    }

    pub async fn set_category_filter(&self, category: Option<&str>) -> Vec<PantryItem> {
        self.view_state.write().await.set_category_filter(category);
        self.republish().await
    }

    pub async fn toggle_sort(&self, field: SortField) -> Vec<PantryItem> {
        self.view_state.write().await.toggle_sort(field);
        self.republish().await
    }

    pub async fn set_view_state(&self, state: ViewState) -> Vec<PantryItem> {
        *self.view_state.write().await = state;
        self.republish().await
    }

    /// Recompute the published list from the last snapshot, no store read
    async fn republish(&self) -> Vec<PantryItem> {
        let visible = {
            let view_state = self.view_state.read().await;
            let snapshot = self.snapshot.read().await;
            view_state.apply(&snapshot)
        };
        *self.published.write().await = visible.clone();
        visible
    }

    // ========================
    // Sync
    // ========================

    /// Re-read the whole collection and publish the filtered, sorted list.
    ///
    /// On failure the previous view stays published and the error is returned.
    pub async fn refresh(&self) -> DomainResult<Vec<PantryItem>> {
        let documents = self.store.list_all(&self.collection).await.map_err(|e| {
            log::error!("Refresh of {} failed: {}", self.collection, e);
            e
        })?;
        log::debug!("Read {} documents from {}", documents.len(), self.collection);

        let mut items = Vec::with_capacity(documents.len());
        for doc in &documents {
            if let Some(item) = PantryItem::from_document(&doc.key, &doc.fields)? {
                items.push(item);
            }
        }

        *self.snapshot.write().await = items;
        Ok(self.republish().await)
    }

    // ========================
    // Mutations
    // ========================

    /// Document currently holding `name`: the one under its hashed key, or
    /// failing that a document keyed by the plain trimmed name.
    async fn locate(&self, name: &str, key: &ItemKey) -> DomainResult<Option<(String, Fields)>> {
        if let Some(fields) = self.store.get(&self.collection, key.as_str()).await? {
            return Ok(Some((key.as_str().to_string(), fields)));
        }
        let plain = name.trim();
        if plain.is_empty() || plain == key.as_str() {
            return Ok(None);
        }
        let found = self.store.get(&self.collection, plain).await?;
        if found.is_some() {
            log::debug!("{} found under its plain name", plain);
        }
        Ok(found.map(|fields| (plain.to_string(), fields)))
    }

    /// Add `quantity` of `name`, creating the item if needed.
    ///
    /// `category` overwrites the stored one when given; otherwise the stored one is kept.
    pub async fn add_item(
        &self,
        name: &str,
        category: Option<Category>,
        quantity: u32,
    ) -> DomainResult<Vec<PantryItem>> {
        if name.trim().is_empty() {
            return Err(DomainError::InvalidInput("Item name is empty".to_string()));
        }
        if quantity == 0 {
            return Err(DomainError::InvalidInput("Quantity must be at least 1".to_string()));
        }

        let key = ItemKey::from_name(name);
        {
            let lock = self.key_lock(&key).await;
            let _held = lock.lock().await;

            let now = chrono::Utc::now().timestamp_millis();
            match self.locate(name, &key).await? {
                Some((doc_key, current)) => {
                    let count = read_count(&doc_key, &current)?;
                    let total = count.checked_add(quantity).ok_or_else(|| {
                        DomainError::InvalidInput(format!("Quantity overflow for {}", name.trim()))
                    })?;
                    let mut fields = Map::new();
                    fields.insert("count".to_string(), Value::from(total));
                    fields.insert("updated_at".to_string(), Value::from(now));
                    if let Some(category) = category {
                        fields.insert("category".to_string(), Value::from(category.as_str()));
                    }
                    // plain-name documents keep showing their key
                    if doc_key == key.as_str() && !current.contains_key("name") {
                        fields.insert("name".to_string(), Value::from(display_name(name)));
                    }
                    log::info!("add_item {}: {} -> {}", name.trim(), count, total);
                    self.store.set(&self.collection, &doc_key, fields, WriteMode::Merge).await?;
                }
                None => {
                    let mut item = PantryItem::new(name, quantity, category.map(|c| c.as_str().to_string()));
                    item.updated_at = Some(now);
                    log::info!("add_item {}: new with {}", name.trim(), quantity);
                    self.store
                        .set(&self.collection, key.as_str(), item.to_document(), WriteMode::Replace)
                        .await?;
                }
            }
        }
        self.refresh().await
    }

    /// Take one away; the last one deletes the document. Missing item is a no-op.
    pub async fn decrement_item(&self, name: &str) -> DomainResult<Vec<PantryItem>> {
        let key = ItemKey::from_name(name);
        {
            let lock = self.key_lock(&key).await;
            let _held = lock.lock().await;

            match self.locate(name, &key).await? {
                None => log::debug!("decrement_item {}: not present", name.trim()),
                Some((doc_key, current)) => {
                    let count = read_count(&doc_key, &current)?;
                    if count <= 1 {
                        log::info!("decrement_item {}: last one, deleting", name.trim());
                        self.store.delete(&self.collection, &doc_key).await?;
                    } else {
                        log::info!("decrement_item {}: {} -> {}", name.trim(), count, count - 1);
                        let mut fields = Map::new();
                        fields.insert("count".to_string(), Value::from(count - 1));
                        fields.insert("updated_at".to_string(), Value::from(chrono::Utc::now().timestamp_millis()));
                        self.store.set(&self.collection, &doc_key, fields, WriteMode::Merge).await?;
                    }
                }
            }
        }
        self.refresh().await
    }

    /// Delete the item regardless of its count
    pub async fn remove_item(&self, name: &str) -> DomainResult<Vec<PantryItem>> {
        let key = ItemKey::from_name(name);
        {
            let lock = self.key_lock(&key).await;
            let _held = lock.lock().await;

            match self.locate(name, &key).await? {
                None => log::debug!("remove_item {}: not present", name.trim()),
                Some((doc_key, _)) => {
                    log::info!("remove_item {}", name.trim());
                    self.store.delete(&self.collection, &doc_key).await?;
                }
            }
        }
        self.refresh().await
    }

    /// Delete every document concurrently, then refresh.
    ///
    /// Any failed delete turns the result into `DomainError::PartialClear`
    /// listing the items that are still there, even when the refresh fails too.
    pub async fn clear_all(&self) -> DomainResult<ClearReport> {
        let documents = self.store.list_all(&self.collection).await?;
        log::info!("clear_all: deleting {} documents from {}", documents.len(), self.collection);

        let results = join_all(documents.iter().map(|doc| async move {
            let name = doc
                .fields
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or(doc.key.as_str())
                .to_string();
            let outcome = self.store.delete(&self.collection, &doc.key).await;
            (name, outcome)
        }))
        .await;

        let mut report = ClearReport::default();
        for (name, outcome) in results {
            match outcome {
                Ok(()) => report.deleted.push(name),
                Err(e) => report.failed.push((name, e.to_string())),
            }
        }

        let refreshed = self.refresh().await;

        if report.is_complete() {
            refreshed?;
            return Ok(report);
        }
        log::warn!(
            "clear_all: {} of {} deletes failed",
            report.failed.len(),
            report.failed.len() + report.deleted.len()
        );
        if let Err(e) = refreshed {
            log::error!("clear_all: refresh after partial clear failed: {}", e);
        }
        Err(DomainError::PartialClear(report))
    }

    /// Per-key mutex, dropping entries nobody holds
    async fn key_lock(&self, key: &ItemKey) -> Arc<Mutex<()>> {
        let mut locks = self.key_locks.lock().await;
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(key.clone()).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SortDirection;
    use crate::repository::{Document, MemoryStore};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    /// Memory store whose `list_all` can fail while point reads still work
    #[derive(Clone, Default)]
    struct FlakyListStore {
        inner: MemoryStore,
        list_fails: Arc<AtomicBool>,
        fail_list_after_delete: bool,
    }

    #[async_trait]
    impl ItemStore for FlakyListStore {
        async fn get(&self, collection: &str, key: &str) -> DomainResult<Option<Fields>> {
            self.inner.get(collection, key).await
        }

        async fn set(&self, collection: &str, key: &str, fields: Fields, mode: WriteMode) -> DomainResult<()> {
            self.inner.set(collection, key, fields, mode).await
        }

        async fn delete(&self, collection: &str, key: &str) -> DomainResult<()> {
            let result = self.inner.delete(collection, key).await;
            if self.fail_list_after_delete {
                self.list_fails.store(true, Ordering::SeqCst);
            }
            result
        }

        async fn list_all(&self, collection: &str) -> DomainResult<Vec<Document>> {
            if self.list_fails.load(Ordering::SeqCst) {
                return Err(DomainError::TransientFetch("flaky".to_string()));
            }
            self.inner.list_all(collection).await
        }
    }

    fn plain_doc(count: u32) -> Fields {
        json!({ "count": count }).as_object().cloned().unwrap()
    }

    fn engine() -> (PantryEngine<MemoryStore>, MemoryStore) {
        let store = MemoryStore::new();
        (PantryEngine::new(store.clone(), "pantry"), store)
    }

    fn names(items: &[PantryItem]) -> Vec<&str> {
        items.iter().map(|i| i.name.as_str()).collect()
    }

    async fn stored(store: &MemoryStore, name: &str) -> Option<Fields> {
        store.peek("pantry", ItemKey::from_name(name).as_str()).await
    }

    #[tokio::test]
    async fn test_add_sums_quantities_and_keeps_last_category() {
        let (engine, store) = engine();
        engine.add_item("apple", Some(Category::FruitsVegetables), 2).await.unwrap();
        engine.add_item("apple", None, 1).await.unwrap();
        engine.add_item("Apple", Some(Category::Snacks), 4).await.unwrap();
        let view = engine.add_item("apple", None, 3).await.unwrap();

        assert_eq!(view.len(), 1);
        assert_eq!(view[0].count, 10);
        assert_eq!(view[0].category.as_deref(), Some("Snacks"));
        assert_eq!(view[0].name, "Apple");

        let doc = stored(&store, "apple").await.unwrap();
        assert_eq!(doc["count"], json!(10));
    }

    #[tokio::test]
    async fn test_add_example_document() {
        let (engine, store) = engine();
        engine.add_item("apple", Some(Category::FruitsVegetables), 2).await.unwrap();
        engine.add_item("apple", Some(Category::FruitsVegetables), 3).await.unwrap();

        let doc = stored(&store, "apple").await.unwrap();
        assert_eq!(doc["count"], json!(5));
        assert_eq!(doc["category"], json!("Fruits & Vegetables"));
        assert_eq!(doc["name"], json!("Apple"));
        assert!(doc["updated_at"].is_i64());
    }

    #[tokio::test]
    async fn test_add_defaults_to_one_without_category() {
        let (engine, store) = engine();
        let view = engine.add_item("salt", None, 1).await.unwrap();
        assert_eq!(view[0].count, 1);
        assert!(view[0].category.is_none());
        assert!(!stored(&store, "salt").await.unwrap().contains_key("category"));
    }

    #[tokio::test]
    async fn test_add_rejects_bad_input() {
        let (engine, store) = engine();
        assert!(matches!(engine.add_item("   ", None, 1).await, Err(DomainError::InvalidInput(_))));
        assert!(matches!(engine.add_item("rice", None, 0).await, Err(DomainError::InvalidInput(_))));
        assert!(store.list_all("pantry").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_decrement_last_one_removes_item() {
        let (engine, store) = engine();
        engine.add_item("milk", None, 2).await.unwrap();

        let view = engine.decrement_item("milk").await.unwrap();
        assert_eq!(view[0].count, 1);

        let view = engine.decrement_item("milk").await.unwrap();
        assert!(view.is_empty());
        assert!(stored(&store, "milk").await.is_none());
    }

    #[tokio::test]
    async fn test_decrement_absent_is_noop() {
        let (engine, _store) = engine();
        engine.add_item("bread", None, 1).await.unwrap();
        let view = engine.decrement_item("cheese").await.unwrap();
        assert_eq!(names(&view), vec!["Bread"]);
    }

    #[tokio::test]
    async fn test_decrement_keeps_category() {
        let (engine, store) = engine();
        engine.add_item("eggs", Some(Category::DairyEggs), 12).await.unwrap();
        engine.decrement_item("eggs").await.unwrap();
        let doc = stored(&store, "eggs").await.unwrap();
        assert_eq!(doc["count"], json!(11));
        assert_eq!(doc["category"], json!("Dairy & Eggs"));
    }

    #[tokio::test]
    async fn test_remove_ignores_count() {
        let (engine, _store) = engine();
        engine.add_item("rice", None, 7).await.unwrap();
        engine.add_item("beans", None, 1).await.unwrap();
        let view = engine.remove_item("RICE").await.unwrap();
        assert_eq!(names(&view), vec!["Beans"]);
    }

    #[tokio::test]
    async fn test_refresh_filters_and_sorts() {
        let (engine, _store) = engine();
        engine.add_item("A", None, 3).await.unwrap();
        engine.add_item("B", None, 1).await.unwrap();
        engine.add_item("C", None, 2).await.unwrap();

        let mut state = ViewState::default();
        state.set_sort(SortField::Quantity, SortDirection::Descending);
        engine.set_view_state(state).await;
        assert_eq!(names(&engine.refresh().await.unwrap()), vec!["A", "C", "B"]);

        assert!(engine.set_search("nothing-like-this").await.is_empty());
        assert!(engine.refresh().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_twice_restores_order() {
        let (engine, _store) = engine();
        for (name, n) in [("pasta", 2), ("apple", 5), ("jam", 1)] {
            engine.add_item(name, None, n).await.unwrap();
        }
        let original = names(&engine.view().await).iter().map(|s| s.to_string()).collect::<Vec<_>>();

        let flipped = engine.toggle_sort(SortField::Name).await;
        assert_eq!(names(&flipped), vec!["Pasta", "Jam", "Apple"]);

        let restored = engine.toggle_sort(SortField::Name).await;
        assert_eq!(names(&restored), original.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_category_filter_on_engine() {
        let (engine, _store) = engine();
        engine.add_item("milk", Some(Category::DairyEggs), 1).await.unwrap();
        engine.add_item("bread", Some(Category::Bakery), 1).await.unwrap();

        let view = engine.set_category_filter(Some("Bakery")).await;
        assert_eq!(names(&view), vec!["Bread"]);

        let view = engine.set_category_filter(Some("All")).await;
        assert_eq!(view.len(), 2);
    }

    #[tokio::test]
    async fn test_refresh_failure_is_reported_and_view_kept() {
        let (engine, store) = engine();
        engine.add_item("tea", None, 1).await.unwrap();

        store.set_fail_reads(true);
        let err = engine.refresh().await.unwrap_err();
        assert!(matches!(err, DomainError::TransientFetch(_)));
        assert_eq!(names(&engine.view().await), vec!["Tea"]);
    }

    #[tokio::test]
    async fn test_clear_all_empties_pantry() {
        let (engine, _store) = engine();
        for name in ["a", "b", "c", "d"] {
            engine.add_item(name, None, 2).await.unwrap();
        }

        let report = engine.clear_all().await.unwrap();
        assert_eq!(report.deleted.len(), 4);
        assert!(report.failed.is_empty());
        assert!(engine.refresh().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_all_reports_partial_failure() {
        let (engine, store) = engine();
        for name in ["flour", "sugar", "yeast"] {
            engine.add_item(name, None, 1).await.unwrap();
        }
        store.fail_delete_of(ItemKey::from_name("sugar").as_str()).await;

        match engine.clear_all().await {
            Err(DomainError::PartialClear(report)) => {
                assert_eq!(report.deleted.len(), 2);
                assert_eq!(report.failed.len(), 1);
                assert_eq!(report.failed[0].0, "Sugar");
            }
            other => panic!("expected partial clear, got {:?}", other),
        }
        assert_eq!(names(&engine.view().await), vec!["Sugar"]);
        assert_eq!(names(&engine.refresh().await.unwrap()), vec!["Sugar"]);
    }

    #[tokio::test]
    async fn test_concurrent_adds_on_one_engine_do_not_lose_updates() {
        let store = MemoryStore::with_latency(Duration::from_millis(2));
        let engine = PantryEngine::new(store.clone(), "pantry");

        let adds = (0..8).map(|_| engine.add_item("coffee", None, 1));
        for result in join_all(adds).await {
            result.unwrap();
        }

        let doc = stored(&store, "coffee").await.unwrap();
        assert_eq!(doc["count"], json!(8));
    }

    #[tokio::test]
    async fn test_legacy_and_zero_documents() {
        let (engine, store) = engine();
        let legacy = json!({ "count": 4 }).as_object().cloned().unwrap();
        store.set("pantry", "tomato", legacy, WriteMode::Replace).await.unwrap();
        let zero = json!({ "name": "Ghost", "count": 0 }).as_object().cloned().unwrap();
        store.set("pantry", "ghost", zero, WriteMode::Replace).await.unwrap();

        let view = engine.refresh().await.unwrap();
        assert_eq!(names(&view), vec!["tomato"]);
        assert_eq!(view[0].count, 4);
    }

    #[tokio::test]
    async fn test_plain_name_document_is_updated_in_place() {
        let (engine, store) = engine();
        store.set("pantry", "tomato", plain_doc(4), WriteMode::Replace).await.unwrap();

        let view = engine.add_item("tomato", Some(Category::FruitsVegetables), 2).await.unwrap();
        assert_eq!(names(&view), vec!["tomato"]);
        assert_eq!(view[0].count, 6);
        assert_eq!(view[0].category.as_deref(), Some("Fruits & Vegetables"));
        assert!(stored(&store, "tomato").await.is_none());
        assert_eq!(store.list_all("pantry").await.unwrap().len(), 1);

        let view = engine.decrement_item("tomato").await.unwrap();
        assert_eq!(view[0].count, 5);
        assert_eq!(store.peek("pantry", "tomato").await.unwrap()["count"], json!(5));

        let view = engine.remove_item(" tomato ").await.unwrap();
        assert!(view.is_empty());
        assert!(store.peek("pantry", "tomato").await.is_none());
    }

    #[tokio::test]
    async fn test_decrement_last_plain_name_document_deletes_it() {
        let (engine, store) = engine();
        store.set("pantry", "basil", plain_doc(1), WriteMode::Replace).await.unwrap();

        assert!(engine.decrement_item("basil").await.unwrap().is_empty());
        assert!(store.peek("pantry", "basil").await.is_none());
    }

    #[tokio::test]
    async fn test_remove_missing_item_is_noop() {
        let (engine, _store) = engine();
        engine.add_item("rice", None, 1).await.unwrap();
        assert_eq!(names(&engine.remove_item("pepper").await.unwrap()), vec!["Rice"]);
    }

    #[tokio::test]
    async fn test_add_returns_refresh_error_after_write() {
        let store = FlakyListStore::default();
        let engine = PantryEngine::new(store.clone(), "pantry");
        engine.add_item("honey", None, 1).await.unwrap();

        store.list_fails.store(true, Ordering::SeqCst);
        let err = engine.add_item("honey", None, 2).await.unwrap_err();
        assert!(matches!(err, DomainError::TransientFetch(_)));
        assert_eq!(stored(&store.inner, "honey").await.unwrap()["count"], json!(3));
        assert_eq!(engine.view().await[0].count, 1);
    }

    #[tokio::test]
    async fn test_partial_clear_is_reported_when_refresh_fails() {
        let store = FlakyListStore {
            fail_list_after_delete: true,
            ..FlakyListStore::default()
        };
        let engine = PantryEngine::new(store.clone(), "pantry");
        for name in ["flour", "sugar"] {
            engine.add_item(name, None, 1).await.unwrap();
        }
        store.inner.fail_delete_of(ItemKey::from_name("sugar").as_str()).await;

        match engine.clear_all().await {
            Err(DomainError::PartialClear(report)) => {
                assert_eq!(report.deleted, vec!["Flour".to_string()]);
                assert_eq!(report.failed.len(), 1);
                assert_eq!(report.failed[0].0, "Sugar");
            }
            other => panic!("expected partial clear, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_full_clear_returns_refresh_error() {
        let store = FlakyListStore {
            fail_list_after_delete: true,
            ..FlakyListStore::default()
        };
        let engine = PantryEngine::new(store.clone(), "pantry");
        engine.add_item("salt", None, 1).await.unwrap();

        assert!(matches!(engine.clear_all().await, Err(DomainError::TransientFetch(_))));
        assert!(store.inner.list_all("pantry").await.unwrap().is_empty());
    }
}
