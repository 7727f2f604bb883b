//! Category Labels
//!
//! Fixed list offered to the UI for filtering and input validation.
//! The store does not enforce membership; items keep whatever label they were written with.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Fruits & Vegetables")]
    FruitsVegetables,
    #[serde(rename = "Dairy & Eggs")]
    DairyEggs,
    #[serde(rename = "Meat & Seafood")]
    MeatSeafood,
    #[serde(rename = "Bakery")]
    Bakery,
    #[serde(rename = "Grains & Pasta")]
    GrainsPasta,
    #[serde(rename = "Canned Goods")]
    CannedGoods,
    #[serde(rename = "Snacks")]
    Snacks,
    #[serde(rename = "Beverages")]
    Beverages,
    #[serde(rename = "Spices & Condiments")]
    SpicesCondiments,
    #[serde(rename = "Other")]
    Other,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::FruitsVegetables,
        Category::DairyEggs,
        Category::MeatSeafood,
        Category::Bakery,
        Category::GrainsPasta,
        Category::CannedGoods,
        Category::Snacks,
        Category::Beverages,
        Category::SpicesCondiments,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::FruitsVegetables => "Fruits & Vegetables",
            Category::DairyEggs => "Dairy & Eggs",
            Category::MeatSeafood => "Meat & Seafood",
            Category::Bakery => "Bakery",
            Category::GrainsPasta => "Grains & Pasta",
            Category::CannedGoods => "Canned Goods",
            Category::Snacks => "Snacks",
            Category::Beverages => "Beverages",
            Category::SpicesCondiments => "Spices & Condiments",
            Category::Other => "Other",
        }
    }

    /// All labels in display order
    pub fn labels() -> Vec<&'static str> {
        Self::ALL.iter().map(Category::as_str).collect()
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .copied()
            .ok_or_else(|| format!("Unknown category '{}'", wanted))
    }
}
