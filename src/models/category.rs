use std::fmt;

use serde::{Deserialize, Serialize};

/// Spending category label.
///
/// The builtin set is fixed; user mapping rules may introduce arbitrary
/// labels, which round-trip as `Custom`. Serialized as a plain string either
/// way so stored data never depends on the enum layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Fuel,
    Utilities,
    Tolls,
    Travel,
    Shopping,
    Subscriptions,
    Transfers,
    Food,
    Other,
    Custom(String),
}

impl Category {
    pub fn as_str(&self) -> &str {
        match self {
            Category::Fuel => "Fuel",
            Category::Utilities => "Utilities",
            Category::Tolls => "Tolls",
            Category::Travel => "Travel",
            Category::Shopping => "Shopping",
            Category::Subscriptions => "Subscriptions",
            Category::Transfers => "Transfers",
            Category::Food => "Food",
            Category::Other => "Other",
            Category::Custom(label) => label,
        }
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        match value.trim() {
            "Fuel" => Category::Fuel,
            "Utilities" => Category::Utilities,
            "Tolls" => Category::Tolls,
            "Travel" => Category::Travel,
            "Shopping" => Category::Shopping,
            "Subscriptions" => Category::Subscriptions,
            "Transfers" => Category::Transfers,
            "Food" => Category::Food,
            "Other" | "" => Category::Other,
            other => Category::Custom(other.to_string()),
        }
    }
}

impl From<&str> for Category {
    fn from(value: &str) -> Self {
        Category::from(value.to_string())
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
