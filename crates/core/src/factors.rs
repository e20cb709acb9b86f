//! Emission factor table
//!
//! Holds per-category emission factors (tonnes CO₂ per unit of activity) and
//! implements the lookup rules the engine relies on:
//!
//! - Product factors never miss: unknown products use [`DEFAULT_PRODUCT_FACTOR`]
//! - Fuel and transport factors may be absent, in which case the whole term is
//!   omitted from the emissions sum
//! - Electricity is a single grid factor
//! - CN-code factors are optional and only consulted in CN-code granularity
//!
//! A table can be replaced wholesale by an uploaded override. Overrides are
//! validated as a unit: one bad row rejects the whole override and the caller
//! keeps the defaults.

use crate::core_types::{FuelType, ProductType, TransportMode};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};

/// Factor used for products missing from the table
pub const DEFAULT_PRODUCT_FACTOR: f64 = 1.0;

/// Default grid electricity factor (tCO₂ per `MWh`)
pub const DEFAULT_ELECTRICITY_FACTOR: f64 = 0.7;

/// Category of an emission factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FactorCategory {
    Product,
    Fuel,
    Electricity,
    Transport,
    CnCode,
}

impl FactorCategory {
    /// Categories an override must define
    pub const REQUIRED: [FactorCategory; 4] = [
        FactorCategory::Product,
        FactorCategory::Fuel,
        FactorCategory::Electricity,
        FactorCategory::Transport,
    ];

    /// Parse the `Category` column of an override table
    pub fn from_label(label: &str) -> Option<Self> {
        let key: String = label
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "product" | "products" => Some(Self::Product),
            "fuel" | "fuels" => Some(Self::Fuel),
            "electricity" => Some(Self::Electricity),
            "transport" => Some(Self::Transport),
            "cn" | "cncode" | "cncodes" => Some(Self::CnCode),
            _ => None,
        }
    }

    /// Label used in override tables
    pub fn label(&self) -> &'static str {
        match self {
            Self::Product => "Product",
            Self::Fuel => "Fuel",
            Self::Electricity => "Electricity",
            Self::Transport => "Transport",
            Self::CnCode => "CN Code",
        }
    }
}

impl fmt::Display for FactorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One row of an uploaded factor table (`Category`, `Subcategory`, `EmissionFactor`)
///
/// The factor is kept as text so that a malformed number is reported as an
/// override violation rather than a file-level read error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorRow {
    #[serde(rename = "Category", default)]
    pub category: String,
    #[serde(rename = "Subcategory", default)]
    pub subcategory: String,
    #[serde(rename = "EmissionFactor", default)]
    pub emission_factor: String,
}

impl FactorRow {
    /// Convenience constructor, mostly for tests and programmatic overrides
    pub fn new(category: &str, subcategory: &str, emission_factor: &str) -> Self {
        Self {
            category: category.to_string(),
            subcategory: subcategory.to_string(),
            emission_factor: emission_factor.to_string(),
        }
    }
}

/// Structural problems that reject an uploaded factor table
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidOverrideFactors {
    #[error("override contains no rows")]
    Empty,
    #[error("required category '{0}' is missing")]
    MissingCategory(FactorCategory),
    #[error("row {row}: unknown category '{category}'")]
    UnknownCategory { row: usize, category: String },
    #[error("row {row}: {category} factor has no subcategory")]
    MissingSubcategory { row: usize, category: FactorCategory },
    #[error("row {row}: '{value}' is not a number")]
    UnparseableFactor { row: usize, value: String },
    #[error("row {row}: factor {value} must be finite and non-negative")]
    InvalidFactor { row: usize, value: f64 },
    #[error("electricity must be a single value, found {count}")]
    AmbiguousElectricity { count: usize },
    #[error("row {row}: duplicate {category} entry '{key}'")]
    DuplicateEntry {
        row: usize,
        category: FactorCategory,
        key: String,
    },
}

/// Non-fatal notice raised when an override was rejected and defaults were used
#[derive(Debug, Clone, PartialEq)]
pub struct FactorNotice {
    pub reason: InvalidOverrideFactors,
}

impl fmt::Display for FactorNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "custom emission factors rejected ({}); using default factors",
            self.reason
        )
    }
}

/// Emission factor table
///
/// Loaded once per calculation run and never mutated while the engine reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionFactors {
    products: FxHashMap<ProductType, f64>,
    fuels: FxHashMap<FuelType, f64>,
    electricity: f64,
    transport: FxHashMap<TransportMode, f64>,
    cn_codes: FxHashMap<String, f64>,
}

impl Default for EmissionFactors {
    fn default() -> Self {
        let mut products = FxHashMap::default();
        products.insert(ProductType::Steel, 1.8);
        products.insert(ProductType::Cement, 0.9);
        products.insert(ProductType::Aluminium, 12.0);
        products.insert(ProductType::Fertilizer, 3.0);

        let mut fuels = FxHashMap::default();
        fuels.insert(FuelType::Coal, 2.5);
        fuels.insert(FuelType::Diesel, 2.7);
        fuels.insert(FuelType::NaturalGas, 2.0);

        let mut transport = FxHashMap::default();
        transport.insert(TransportMode::Truck, 0.2);
        transport.insert(TransportMode::Rail, 0.05);
        transport.insert(TransportMode::Ship, 0.01);
        transport.insert(TransportMode::Air, 0.6);

        Self {
            products,
            fuels,
            electricity: DEFAULT_ELECTRICITY_FACTOR,
            transport,
            cn_codes: FxHashMap::default(),
        }
    }
}

impl EmissionFactors {
    /// Table with the electricity factor only and no category entries
    pub fn empty(electricity: f64) -> Self {
        Self {
            products: FxHashMap::default(),
            fuels: FxHashMap::default(),
            electricity,
            transport: FxHashMap::default(),
            cn_codes: FxHashMap::default(),
        }
    }

    /// Add or replace a product factor
    pub fn with_product_factor(mut self, product: ProductType, factor: f64) -> Self {
        self.products.insert(product, factor);
        self
    }

    /// Add or replace a fuel factor
    pub fn with_fuel_factor(mut self, fuel: FuelType, factor: f64) -> Self {
        self.fuels.insert(fuel, factor);
        self
    }

    /// Add or replace a transport factor
    pub fn with_transport_factor(mut self, mode: TransportMode, factor: f64) -> Self {
        self.transport.insert(mode, factor);
        self
    }

    /// Add or replace a CN-code factor
    pub fn with_cn_code_factor(mut self, code: &str, factor: f64) -> Self {
        self.cn_codes.insert(code.trim().to_string(), factor);
        self
    }

    /// Replace the electricity factor
    pub fn with_electricity_factor(mut self, factor: f64) -> Self {
        self.electricity = factor;
        self
    }

    /// Product factor, falling back to [`DEFAULT_PRODUCT_FACTOR`]
    #[inline]
    pub fn product_factor(&self, product: &ProductType) -> f64 {
        self.products
            .get(product)
            .copied()
            .unwrap_or(DEFAULT_PRODUCT_FACTOR)
    }

    /// Fuel factor, `None` when no fuel is given or the fuel is unknown
    #[inline]
    pub fn fuel_factor(&self, fuel: Option<&FuelType>) -> Option<f64> {
        fuel.and_then(|f| self.fuels.get(f).copied())
    }

    /// Transport factor, `None` when no mode is given or the mode is unknown
    #[inline]
    pub fn transport_factor(&self, mode: Option<&TransportMode>) -> Option<f64> {
        mode.and_then(|m| self.transport.get(m).copied())
    }

    /// CN-code factor, `None` when the code is not in the table
    #[inline]
    pub fn cn_code_factor(&self, code: &str) -> Option<f64> {
        self.cn_codes.get(code.trim()).copied()
    }

    /// Grid electricity factor
    #[inline]
    pub fn electricity_factor(&self) -> f64 {
        self.electricity
    }

    /// Generic lookup by category and free-text key
    ///
    /// Product and electricity lookups always return a value. Fuel, transport
    /// and CN-code lookups return `None` for blank or unknown keys, which the
    /// engine treats as "omit this term".
    pub fn factor_for(&self, category: FactorCategory, key: &str) -> Option<f64> {
        match category {
            FactorCategory::Product => Some(self.product_factor(&ProductType::from(key))),
            FactorCategory::Fuel => self.fuel_factor(FuelType::from_cell(key).as_ref()),
            FactorCategory::Electricity => Some(self.electricity),
            FactorCategory::Transport => {
                self.transport_factor(TransportMode::from_cell(key).as_ref())
            }
            FactorCategory::CnCode => self.cn_code_factor(key),
        }
    }

    /// Build a table from uploaded override rows
    ///
    /// The override replaces the defaults entirely; nothing is merged.
    ///
    /// # Errors
    /// Returns [`InvalidOverrideFactors`] when any required category is
    /// missing, electricity is not exactly one number, or any row has an
    /// unknown category, missing subcategory, duplicate key, or a factor that
    /// is not a finite non-negative number.
    pub fn from_override(rows: &[FactorRow]) -> Result<Self, InvalidOverrideFactors> {
        if rows.is_empty() {
            return Err(InvalidOverrideFactors::Empty);
        }

        let mut table = Self::empty(0.0);
        let mut electricity_values = Vec::new();
        let mut seen = [false; 5];

        for (row, entry) in rows.iter().enumerate() {
            let category = FactorCategory::from_label(&entry.category).ok_or_else(|| {
                InvalidOverrideFactors::UnknownCategory {
                    row,
                    category: entry.category.clone(),
                }
            })?;
            seen[category as usize] = true;

            let raw = entry.emission_factor.trim();
            let value: f64 = raw
                .parse()
                .map_err(|_| InvalidOverrideFactors::UnparseableFactor {
                    row,
                    value: raw.to_string(),
                })?;
            if !value.is_finite() || value < 0.0 {
                return Err(InvalidOverrideFactors::InvalidFactor { row, value });
            }

            if category == FactorCategory::Electricity {
                electricity_values.push(value);
                continue;
            }

            let key = entry.subcategory.trim();
            if key.is_empty() {
                return Err(InvalidOverrideFactors::MissingSubcategory { row, category });
            }

            let previous = match category {
                FactorCategory::Product => table.products.insert(ProductType::from(key), value),
                FactorCategory::Fuel => table.fuels.insert(FuelType::from(key), value),
                FactorCategory::Transport => {
                    table.transport.insert(TransportMode::from(key), value)
                }
                FactorCategory::CnCode => table.cn_codes.insert(key.to_string(), value),
                FactorCategory::Electricity => None,
            };
            if previous.is_some() {
                return Err(InvalidOverrideFactors::DuplicateEntry {
                    row,
                    category,
                    key: key.to_string(),
                });
            }
        }

        if let Some(missing) = FactorCategory::REQUIRED
            .into_iter()
            .find(|category| !seen[*category as usize])
        {
            return Err(InvalidOverrideFactors::MissingCategory(missing));
        }

        match electricity_values.as_slice() {
            [value] => table.electricity = *value,
            values => {
                return Err(InvalidOverrideFactors::AmbiguousElectricity {
                    count: values.len(),
                })
            }
        }

        Ok(table)
    }

    /// Apply an override if it is valid, otherwise keep the defaults
    ///
    /// Returns the table to use and, when the override was rejected, a notice
    /// for the caller to surface.
    pub fn resolve_override(rows: &[FactorRow]) -> (Self, Option<FactorNotice>) {
        match Self::from_override(rows) {
            Ok(table) => {
                info!(
                    products = table.products.len(),
                    fuels = table.fuels.len(),
                    transport = table.transport.len(),
                    cn_codes = table.cn_codes.len(),
                    "Using custom emission factors"
                );
                (table, None)
            }
            Err(reason) => {
                warn!("Custom emission factors rejected: {reason}");
                (Self::default(), Some(FactorNotice { reason }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_override() -> Vec<FactorRow> {
        vec![
            FactorRow::new("Product", "Steel", "2.0"),
            FactorRow::new("Product", "Cement", "0.8"),
            FactorRow::new("Fuel", "Coal", "2.4"),
            FactorRow::new("Electricity", "", "0.5"),
            FactorRow::new("Transport", "Truck", "0.25"),
        ]
    }

    #[test]
    fn test_default_table_values() {
        let factors = EmissionFactors::default();
        assert_eq!(factors.product_factor(&ProductType::Steel), 1.8);
        assert_eq!(factors.product_factor(&ProductType::Aluminium), 12.0);
        assert_eq!(factors.fuel_factor(Some(&FuelType::NaturalGas)), Some(2.0));
        assert_eq!(factors.transport_factor(Some(&TransportMode::Ship)), Some(0.01));
        assert_eq!(factors.electricity_factor(), 0.7);
    }

    #[test]
    fn test_unknown_product_uses_default_factor() {
        let factors = EmissionFactors::default();
        let other = ProductType::from("Hydrogen");
        assert_eq!(factors.product_factor(&other), DEFAULT_PRODUCT_FACTOR);
        assert_eq!(
            factors.factor_for(FactorCategory::Product, "Hydrogen"),
            Some(1.0)
        );
    }

    #[test]
    fn test_absent_fuel_and_transport_are_omitted() {
        let factors = EmissionFactors::default();
        assert_eq!(factors.fuel_factor(None), None);
        assert_eq!(factors.fuel_factor(Some(&FuelType::from("Peat"))), None);
        assert_eq!(factors.factor_for(FactorCategory::Fuel, ""), None);
        assert_eq!(factors.factor_for(FactorCategory::Fuel, "None"), None);
        assert_eq!(factors.factor_for(FactorCategory::Transport, "Bicycle"), None);
        assert_eq!(factors.factor_for(FactorCategory::Transport, "Air"), Some(0.6));
        assert_eq!(factors.factor_for(FactorCategory::Electricity, "ignored"), Some(0.7));
    }

    #[test]
    fn test_valid_override_replaces_defaults() {
        let factors = EmissionFactors::from_override(&valid_override()).unwrap();
        assert_eq!(factors.product_factor(&ProductType::Steel), 2.0);
        // Aluminium is not in the override, so it falls back to 1.0 rather than 12.0
        assert_eq!(factors.product_factor(&ProductType::Aluminium), 1.0);
        assert_eq!(factors.fuel_factor(Some(&FuelType::Diesel)), None);
        assert_eq!(factors.electricity_factor(), 0.5);
    }

    #[test]
    fn test_override_accepts_cn_codes() {
        let mut rows = valid_override();
        rows.push(FactorRow::new("CN Code", "7208", "2.1"));
        let factors = EmissionFactors::from_override(&rows).unwrap();
        assert_eq!(factors.cn_code_factor("7208"), Some(2.1));
        assert_eq!(factors.cn_code_factor("7601"), None);
    }

    #[test]
    fn test_builders_match_other_keys_in_any_case() {
        let factors = EmissionFactors::empty(0.4)
            .with_product_factor(ProductType::from("Hydrogen"), 5.0)
            .with_fuel_factor(FuelType::from("Wood Pellets"), 1.2)
            .with_transport_factor(TransportMode::from("Barge"), 0.03)
            .with_electricity_factor(0.3);

        assert_eq!(factors.product_factor(&ProductType::from("hydrogen")), 5.0);
        assert_eq!(factors.factor_for(FactorCategory::Fuel, "wood pellets"), Some(1.2));
        assert_eq!(factors.factor_for(FactorCategory::Transport, "BARGE"), Some(0.03));
        assert_eq!(factors.electricity_factor(), 0.3);
        assert_eq!(factors.product_factor(&ProductType::Steel), DEFAULT_PRODUCT_FACTOR);
    }

    #[test]
    fn test_override_other_keys_match_any_case() {
        let mut rows = valid_override();
        rows.push(FactorRow::new("Product", "Hydrogen", "5.0"));
        let factors = EmissionFactors::from_override(&rows).unwrap();
        assert_eq!(factors.product_factor(&ProductType::from("hydrogen")), 5.0);
        assert_eq!(factors.product_factor(&ProductType::from("STEEL")), 2.0);

        rows.push(FactorRow::new("Product", "HYDROGEN", "6.0"));
        assert!(matches!(
            EmissionFactors::from_override(&rows),
            Err(InvalidOverrideFactors::DuplicateEntry { row: 6, .. })
        ));
    }

    #[test]
    fn test_override_missing_category_rejected() {
        let rows: Vec<FactorRow> = valid_override()
            .into_iter()
            .filter(|r| r.category != "Transport")
            .collect();
        assert_eq!(
            EmissionFactors::from_override(&rows),
            Err(InvalidOverrideFactors::MissingCategory(FactorCategory::Transport))
        );
    }

    #[test]
    fn test_override_electricity_must_be_single() {
        let mut rows = valid_override();
        rows.push(FactorRow::new("Electricity", "Grid", "0.6"));
        assert_eq!(
            EmissionFactors::from_override(&rows),
            Err(InvalidOverrideFactors::AmbiguousElectricity { count: 2 })
        );
    }

    #[test]
    fn test_override_bad_values_rejected() {
        let mut rows = valid_override();
        rows[3].emission_factor = "0.5 0.6".to_string();
        assert!(matches!(
            EmissionFactors::from_override(&rows),
            Err(InvalidOverrideFactors::UnparseableFactor { row: 3, .. })
        ));

        let mut rows = valid_override();
        rows[0].emission_factor = "-1".to_string();
        assert!(matches!(
            EmissionFactors::from_override(&rows),
            Err(InvalidOverrideFactors::InvalidFactor { row: 0, .. })
        ));

        let mut rows = valid_override();
        rows.push(FactorRow::new("Water", "Tap", "0.1"));
        assert!(matches!(
            EmissionFactors::from_override(&rows),
            Err(InvalidOverrideFactors::UnknownCategory { row: 5, .. })
        ));

        let mut rows = valid_override();
        rows.push(FactorRow::new("Product", "steel", "3.0"));
        assert!(matches!(
            EmissionFactors::from_override(&rows),
            Err(InvalidOverrideFactors::DuplicateEntry { row: 5, .. })
        ));

        assert_eq!(
            EmissionFactors::from_override(&[]),
            Err(InvalidOverrideFactors::Empty)
        );
    }

    #[test]
    fn test_resolve_override_falls_back_to_defaults() {
        let mut rows = valid_override();
        rows[2].subcategory = String::new();
        let (factors, notice) = EmissionFactors::resolve_override(&rows);
        assert_eq!(factors, EmissionFactors::default());
        let notice = notice.expect("rejection should produce a notice");
        assert!(matches!(
            notice.reason,
            InvalidOverrideFactors::MissingSubcategory { row: 2, .. }
        ));
        assert!(notice.to_string().contains("using default factors"));

        let (factors, notice) = EmissionFactors::resolve_override(&valid_override());
        assert!(notice.is_none());
        assert_eq!(factors.electricity_factor(), 0.5);
    }

    #[test]
    fn test_category_labels() {
        assert_eq!(FactorCategory::from_label("products"), Some(FactorCategory::Product));
        assert_eq!(FactorCategory::from_label("CN Code"), Some(FactorCategory::CnCode));
        assert_eq!(FactorCategory::from_label(" Electricity "), Some(FactorCategory::Electricity));
        assert_eq!(FactorCategory::from_label("Water"), None);
    }
}
