//! View Parameters
//!
//! Search text, sort field/direction and category filter, and the pure
//! filter-then-sort step that turns a collection snapshot into the published list.

use pinyin::ToPinyin;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::domain::PantryItem;

/// Label meaning "no category filter"
pub const ALL_CATEGORIES: &str = "All";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    Name,
    Quantity,
    Category,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Name => "name",
            SortField::Quantity => "quantity",
            SortField::Category => "category",
        }
    }
}

impl std::str::FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "name" => Ok(SortField::Name),
            "quantity" | "count" => Ok(SortField::Quantity),
            "category" => Ok(SortField::Category),
            other => Err(format!("Unknown sort field '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViewState {
    pub search: String,
    pub sort_field: SortField,
    pub direction: SortDirection,
    /// `None` shows every category
    pub category: Option<String>,
}

impl ViewState {
    pub fn set_search(&mut self, text: &str) {
        self.search = text.to_string();
    }

    /// Empty and "All" clear the filter
    pub fn set_category_filter(&mut self, category: Option<&str>) {
        self.category = category
            .map(str::trim)
            .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case(ALL_CATEGORIES))
            .map(str::to_string);
    }

    /// Same field flips the direction, a new field starts ascending
    pub fn toggle_sort(&mut self, field: SortField) {
        if self.sort_field == field {
            self.direction = self.direction.flipped();
        } else {
            self.sort_field = field;
            self.direction = SortDirection::Ascending;
        }
    }

    pub fn set_sort(&mut self, field: SortField, direction: SortDirection) {
        self.sort_field = field;
        self.direction = direction;
    }

    pub fn matches(&self, item: &PantryItem) -> bool {
        let name_hit = self.search.is_empty()
            || item.name.to_lowercase().contains(&self.search.to_lowercase());
        let category_hit = match &self.category {
            None => true,
            Some(wanted) => item.category.as_deref() == Some(wanted.as_str()),
        };
        name_hit && category_hit
    }

    pub fn compare(&self, a: &PantryItem, b: &PantryItem) -> Ordering {
        let ordering = match self.sort_field {
            SortField::Name => collation_key(&a.name)
                .cmp(&collation_key(&b.name))
                .then_with(|| a.name.cmp(&b.name)),
            SortField::Quantity => a.count.cmp(&b.count),
            SortField::Category => a
                .category
                .as_deref()
                .unwrap_or("")
                .cmp(b.category.as_deref().unwrap_or("")),
        };
        self.direction.apply(ordering)
    }

    /// Filter then stable-sort a snapshot
    pub fn apply(&self, items: &[PantryItem]) -> Vec<PantryItem> {
        let mut visible: Vec<PantryItem> = items.iter().filter(|i| self.matches(i)).cloned().collect();
        visible.sort_by(|a, b| self.compare(a, b));
        visible
    }
}

/// Case-folded sort key; Chinese characters sort by pinyin
fn collation_key(name: &str) -> String {
    name.chars()
        .map(|c| match c.to_pinyin() {
            Some(p) => p.plain().to_string(),
            None => c.to_lowercase().to_string(),
        })
        .collect()
}
