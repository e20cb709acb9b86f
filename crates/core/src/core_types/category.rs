//! Category keys used to look up emission factors
//!
//! Product, fuel and transport keys arrive as free text from tables and forms.
//! Known names are normalized into dedicated variants; anything else is kept
//! as entered in `Other` so that lookups fall back (products) or omit the term
//! (fuel, transport) instead of failing.
//!
//! Equality and hashing go through the normalized name, so "Hydrogen" and
//! "hydrogen" are the same key in a factor table.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Lowercase and strip separators so "Natural Gas", "natural_gas" and
/// "NATURALGAS" all compare equal.
fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Cell text meaning "nothing selected" in a fuel or transport column
fn is_blank_cell(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none")
}

/// Conversions, display and name-based equality shared by the category enums
macro_rules! category_key_impls {
    ($ty:ident) => {
        impl From<String> for $ty {
            fn from(text: String) -> Self {
                Self::from(text.as_str())
            }
        }

        impl From<$ty> for String {
            fn from(key: $ty) -> String {
                key.name().to_string()
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                normalize(self.name()) == normalize(other.name())
            }
        }

        impl Eq for $ty {}

        impl Hash for $ty {
            fn hash<H: Hasher>(&self, state: &mut H) {
                normalize(self.name()).hash(state);
            }
        }
    };
}

/// CBAM product category of a production record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProductType {
    Steel,
    Cement,
    Aluminium,
    Fertilizer,
    /// Unrecognized product, kept as entered
    Other(String),
}

impl ProductType {
    /// Display name
    pub fn name(&self) -> &str {
        match self {
            Self::Steel => "Steel",
            Self::Cement => "Cement",
            Self::Aluminium => "Aluminium",
            Self::Fertilizer => "Fertilizer",
            Self::Other(name) => name,
        }
    }
}

impl From<&str> for ProductType {
    fn from(text: &str) -> Self {
        match normalize(text).as_str() {
            "steel" => Self::Steel,
            "cement" => Self::Cement,
            "aluminium" | "aluminum" => Self::Aluminium,
            "fertilizer" | "fertiliser" => Self::Fertilizer,
            _ => Self::Other(text.trim().to_string()),
        }
    }
}

category_key_impls!(ProductType);

/// Fuel burned on site (Scope 1)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FuelType {
    Coal,
    Diesel,
    NaturalGas,
    /// Unrecognized fuel, kept as entered
    Other(String),
}

impl FuelType {
    /// Parse a table cell, where blank or "None" means no fuel was used
    pub fn from_cell(text: &str) -> Option<Self> {
        if is_blank_cell(text) {
            None
        } else {
            Some(Self::from(text))
        }
    }

    /// Display name
    pub fn name(&self) -> &str {
        match self {
            Self::Coal => "Coal",
            Self::Diesel => "Diesel",
            Self::NaturalGas => "Natural Gas",
            Self::Other(name) => name,
        }
    }
}

impl From<&str> for FuelType {
    fn from(text: &str) -> Self {
        match normalize(text).as_str() {
            "coal" => Self::Coal,
            "diesel" => Self::Diesel,
            "naturalgas" | "gas" => Self::NaturalGas,
            _ => Self::Other(text.trim().to_string()),
        }
    }
}

category_key_impls!(FuelType);

/// Mode used to ship goods (Scope 3)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransportMode {
    Truck,
    Rail,
    Ship,
    Air,
    /// Unrecognized mode, kept as entered
    Other(String),
}

impl TransportMode {
    /// Parse a table cell, where blank or "None" means no transport leg
    pub fn from_cell(text: &str) -> Option<Self> {
        if is_blank_cell(text) {
            None
        } else {
            Some(Self::from(text))
        }
    }

    /// Display name
    pub fn name(&self) -> &str {
        match self {
            Self::Truck => "Truck",
            Self::Rail => "Rail",
            Self::Ship => "Ship",
            Self::Air => "Air",
            Self::Other(name) => name,
        }
    }
}

impl From<&str> for TransportMode {
    fn from(text: &str) -> Self {
        match normalize(text).as_str() {
            "truck" | "road" => Self::Truck,
            "rail" | "train" => Self::Rail,
            "ship" | "sea" => Self::Ship,
            "air" => Self::Air,
            _ => Self::Other(text.trim().to_string()),
        }
    }
}

category_key_impls!(TransportMode);
