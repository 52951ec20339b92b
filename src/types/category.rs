//! Food Categories
//!
//! Closed set of recipe categories plus the `ALL` wildcard.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Recipe category used for search filtering and persona text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Category {
    Snacks,
    Beverages,
    MainCourse,
    Salads,
    Desserts,
    Appetizers,
    /// Wildcard: no category filter
    #[default]
    All,
}

impl Category {
    /// Concrete categories in display order (excludes the wildcard)
    pub const CONCRETE: [Category; 6] = [
        Category::Snacks,
        Category::Beverages,
        Category::MainCourse,
        Category::Salads,
        Category::Desserts,
        Category::Appetizers,
    ];

    /// Name as stored in the search index
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Snacks => "Snacks",
            Category::Beverages => "Beverages",
            Category::MainCourse => "MainCourse",
            Category::Salads => "Salads",
            Category::Desserts => "Desserts",
            Category::Appetizers => "Appetizers",
            Category::All => "ALL",
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, Category::All)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "snacks" => Ok(Category::Snacks),
            "beverages" => Ok(Category::Beverages),
            "maincourse" => Ok(Category::MainCourse),
            "salads" => Ok(Category::Salads),
            "desserts" => Ok(Category::Desserts),
            "appetizers" => Ok(Category::Appetizers),
            "all" => Ok(Category::All),
            _ => Err(format!(
                "Unknown category '{}'. Valid values: Snacks, Beverages, MainCourse, Salads, Desserts, Appetizers, ALL",
                s
            )),
        }
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
