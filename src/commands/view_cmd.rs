//! Commands for Search, Filter and Sort

use crate::domain::PantryItem;
use crate::engine::{SortField, ViewState};
use crate::AppState;

pub async fn set_search(state: &AppState, text: String) -> Result<Vec<PantryItem>, String> {
    Ok(state.engine.set_search(&text).await)
}

/// "All" or an empty label clears the filter
pub async fn set_category_filter(state: &AppState, category: Option<String>) -> Result<Vec<PantryItem>, String> {
    Ok(state.engine.set_category_filter(category.as_deref()).await)
}

/// Same field flips the direction, another field sorts ascending
pub async fn toggle_sort(state: &AppState, field: String) -> Result<Vec<PantryItem>, String> {
    let field: SortField = field.parse()?;
    Ok(state.engine.toggle_sort(field).await)
}

pub async fn get_view_state(state: &AppState) -> Result<ViewState, String> {
    Ok(state.engine.view_state().await)
}
