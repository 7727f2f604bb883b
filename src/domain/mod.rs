//! Domain Layer
//!
//! Contains the pantry entities and core abstractions.
//! This layer has NO storage dependencies (serde for serialization, blake3 for keys).

mod entity;
mod item;
mod category;

pub use entity::{Entity, DomainError, DomainResult, ClearReport};
pub use item::{PantryItem, ItemKey, display_name, read_count};
pub use category::Category;
