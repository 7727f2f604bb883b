//! Pantry Item Entity
//!
//! One document per item: `{ name, count, category?, updated_at? }`.
//! The document key is derived from the name, so the display name stays a plain field.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use super::entity::{DomainError, DomainResult, Entity};

/// Stable document key for an item.
///
/// Derived from the normalized name (whitespace collapsed, lowercased) and hashed,
/// so "apple", " Apple " and "APPLE" address the same document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemKey(String);

impl ItemKey {
    const HEX_LEN: usize = 32;

    pub fn from_name(name: &str) -> Self {
        let hash = blake3::hash(normalize(name).as_bytes());
        let hex = hash.to_hex();
        Self(hex.as_str()[..Self::HEX_LEN].to_string())
    }

    /// Wrap a key read back from the store
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn normalize(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Name as first written: whitespace collapsed, first character uppercased.
pub fn display_name(name: &str) -> String {
    let collapsed = name.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// A tracked pantry item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PantryItem {
    pub key: ItemKey,
    pub name: String,
    /// Always >= 1 for stored items
    pub count: u32,
    /// Advisory label, normally one of `Category::ALL`
    pub category: Option<String>,
    pub updated_at: Option<i64>,
}

impl PantryItem {
    pub fn new(name: &str, count: u32, category: Option<String>) -> Self {
        Self {
            key: ItemKey::from_name(name),
            name: display_name(name),
            count,
            category,
            updated_at: None,
        }
    }

    /// Decode a stored document.
    ///
    /// Returns `Ok(None)` for a zero-count document, which never counts as present.
    pub fn from_document(key: &str, fields: &Map<String, Value>) -> DomainResult<Option<Self>> {
        let count = read_count(key, fields)?;
        if count == 0 {
            return Ok(None);
        }
        let name = fields
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| key.to_string());
        let category = fields
            .get("category")
            .and_then(Value::as_str)
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        let updated_at = fields.get("updated_at").and_then(Value::as_i64);

        Ok(Some(Self {
            key: ItemKey::from_raw(key),
            name,
            count,
            category,
            updated_at,
        }))
    }

    /// Full document body for a replacing write
    pub fn to_document(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("name".to_string(), Value::from(self.name.clone()));
        fields.insert("count".to_string(), Value::from(self.count));
        if let Some(category) = &self.category {
            fields.insert("category".to_string(), Value::from(category.clone()));
        }
        if let Some(ts) = self.updated_at {
            fields.insert("updated_at".to_string(), Value::from(ts));
        }
        fields
    }
}

/// Read the `count` field of a raw document
pub fn read_count(key: &str, fields: &Map<String, Value>) -> DomainResult<u32> {
    let raw = fields
        .get("count")
        .ok_or_else(|| DomainError::Internal(format!("Document {} has no count", key)))?;
    raw.as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| DomainError::Internal(format!("Document {} has invalid count {}", key, raw)))
}

impl Entity for PantryItem {
    type Id = ItemKey;

    fn id(&self) -> Self::Id {
        self.key.clone()
    }
}
