//! Engine Layer
//!
//! Inventory sync on top of a document store plus the view parameters
//! that shape the published list.

mod view;
mod sync;

pub use view::{ViewState, SortField, SortDirection, ALL_CATEGORIES};
pub use sync::PantryEngine;
