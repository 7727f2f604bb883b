//! Commands for Pantry Item CRUD
//!
//! Every mutation answers with the refreshed, filtered list.

use crate::domain::{Category, ClearReport, PantryItem};
use crate::AppState;

/// Currently published list, no store read
pub async fn list_items(state: &AppState) -> Result<Vec<PantryItem>, String> {
    Ok(state.engine.view().await)
}

/// Re-read the collection
pub async fn refresh_items(state: &AppState) -> Result<Vec<PantryItem>, String> {
    state.engine.refresh().await.map_err(|e| e.to_string())
}

/// Add `quantity` (default 1) of an item
pub async fn add_item(
    state: &AppState,
    name: String,
    category: Option<String>,
    quantity: Option<u32>,
) -> Result<Vec<PantryItem>, String> {
    let category = category
        .filter(|c| !c.trim().is_empty())
        .map(|c| c.parse::<Category>())
        .transpose()?;

    state
        .engine
        .add_item(&name, category, quantity.unwrap_or(1))
        .await
        .map_err(|e| e.to_string())
}

/// Use up one; the last one removes the item
pub async fn decrement_item(state: &AppState, name: String) -> Result<Vec<PantryItem>, String> {
    state.engine.decrement_item(&name).await.map_err(|e| e.to_string())
}

/// Remove an item whatever its count
pub async fn delete_item(state: &AppState, name: String) -> Result<Vec<PantryItem>, String> {
    state.engine.remove_item(&name).await.map_err(|e| e.to_string())
}

/// Empty the pantry
pub async fn clear_pantry(state: &AppState) -> Result<ClearReport, String> {
    state.engine.clear_all().await.map_err(|e| e.to_string())
}

/// Selectable category labels
pub fn list_categories() -> Vec<&'static str> {
    Category::labels()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PantryConfig, StoreConfig};

    fn state() -> AppState {
        let config = PantryConfig {
            store: StoreConfig::Memory,
            ..PantryConfig::default()
        };
        AppState::from_config(config).unwrap()
    }

    #[tokio::test]
    async fn test_add_parses_category_and_defaults_quantity() {
        let state = state();
        let items = add_item(&state, "milk".to_string(), Some("dairy & eggs".to_string()), None)
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].count, 1);
        assert_eq!(items[0].category.as_deref(), Some("Dairy & Eggs"));
    }

    #[tokio::test]
    async fn test_add_rejects_unknown_category() {
        let state = state();
        let err = add_item(&state, "milk".to_string(), Some("Toys".to_string()), Some(1))
            .await
            .unwrap_err();
        assert!(err.contains("Toys"));
        assert!(list_items(&state).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_item_lifecycle() {
        let state = state();
        add_item(&state, "bread".to_string(), None, Some(2)).await.unwrap();
        add_item(&state, "jam".to_string(), Some("".to_string()), Some(1)).await.unwrap();

        let items = decrement_item(&state, "bread".to_string()).await.unwrap();
        assert_eq!(items.iter().find(|i| i.name == "Bread").map(|i| i.count), Some(1));

        let items = delete_item(&state, "jam".to_string()).await.unwrap();
        assert_eq!(items.len(), 1);

        let report = clear_pantry(&state).await.unwrap();
        assert_eq!(report.deleted, vec!["Bread".to_string()]);
        assert!(refresh_items(&state).await.unwrap().is_empty());
    }

    #[test]
    fn test_list_categories() {
        let labels = list_categories();
        assert_eq!(labels.len(), 10);
        assert_eq!(labels[0], "Fruits & Vegetables");
    }
}
