//! Production records and per-row coercion
//!
//! Records reach the engine either already typed ([`ProductionRecord`]) or as
//! the text cells of an uploaded/edited table ([`RawRecord`]). Both go through
//! [`RecordSource::coerce`] so that every row is checked the same way: numeric
//! fields must be finite and non-negative, and table text must parse.
//!
//! A row that fails coercion is skipped with a [`RowDiagnostic`]; it never
//! invalidates the rest of the batch.

use crate::core_types::{FuelType, ProductType, TransportMode};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why a row's numeric fields could not be used
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoercionError {
    #[error("{field} is required")]
    MissingField { field: &'static str },
    #[error("{field} '{value}' is not a number")]
    NotANumber { field: &'static str, value: String },
    #[error("{field} must be finite")]
    NotFinite { field: &'static str },
    #[error("{field} must be non-negative, got {value}")]
    Negative { field: &'static str, value: f64 },
}

/// A skipped row: its position in the input and the reason
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowDiagnostic {
    /// Zero-based index in the input sequence
    pub index: usize,
    /// Product label as entered, for the report
    pub product: String,
    #[serde(serialize_with = "serialize_display")]
    pub error: CoercionError,
}

fn serialize_display<S: serde::Serializer>(
    error: &CoercionError,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

impl fmt::Display for RowDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error processing row {} ({}): {}", self.index, self.product, self.error)
    }
}

fn check_amount(field: &'static str, value: f64) -> Result<f64, CoercionError> {
    if !value.is_finite() {
        return Err(CoercionError::NotFinite { field });
    }
    if value < 0.0 {
        return Err(CoercionError::Negative { field, value });
    }
    Ok(value)
}

/// Parse a numeric cell. Blank optional cells count as zero.
fn parse_amount(field: &'static str, text: &str, required: bool) -> Result<f64, CoercionError> {
    let text = text.trim();
    if text.is_empty() {
        return if required {
            Err(CoercionError::MissingField { field })
        } else {
            Ok(0.0)
        };
    }
    let value: f64 = text.parse().map_err(|_| CoercionError::NotANumber {
        field,
        value: text.to_string(),
    })?;
    check_amount(field, value)
}

/// One product line of production data
///
/// Immutable once handed to the engine; the caller owns the collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionRecord {
    pub product_type: ProductType,
    /// Tonnes of product
    pub quantity: f64,
    /// Purchased electricity in `MWh`
    pub electricity_mwh: f64,
    pub fuel_type: Option<FuelType>,
    pub fuel_quantity: f64,
    /// Tonnes of purchased input materials
    pub purchased_materials: f64,
    pub transport_distance_km: f64,
    pub transport_mode: Option<TransportMode>,
    /// Combined Nomenclature code, used only in CN-code granularity
    pub cn_code: Option<String>,
}

impl ProductionRecord {
    /// Record with production and electricity only
    pub fn new(product_type: ProductType, quantity: f64, electricity_mwh: f64) -> Self {
        Self {
            product_type,
            quantity,
            electricity_mwh,
            fuel_type: None,
            fuel_quantity: 0.0,
            purchased_materials: 0.0,
            transport_distance_km: 0.0,
            transport_mode: None,
            cn_code: None,
        }
    }

    pub fn with_fuel(mut self, fuel_type: Option<FuelType>, fuel_quantity: f64) -> Self {
        self.fuel_type = fuel_type;
        self.fuel_quantity = fuel_quantity;
        self
    }

    pub fn with_purchased_materials(mut self, purchased_materials: f64) -> Self {
        self.purchased_materials = purchased_materials;
        self
    }

    pub fn with_transport(mut self, transport_mode: Option<TransportMode>, distance_km: f64) -> Self {
        self.transport_mode = transport_mode;
        self.transport_distance_km = distance_km;
        self
    }

    pub fn with_cn_code(mut self, cn_code: &str) -> Self {
        self.cn_code = Some(cn_code.trim().to_string());
        self
    }
}

/// A row as it arrives from a table: every cell is text
///
/// Column names follow the upload format (`Product`, `Quantity`, `Electricity`,
/// `Fuel Type`, `Fuel Quantity`, `Purchased Materials`, `Transport Distance`,
/// `Transport Mode`, optional `CN Code`). Missing columns read as blank cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(rename = "Product", default)]
    pub product: String,
    #[serde(rename = "Quantity", default)]
    pub quantity: String,
    #[serde(rename = "Electricity", default)]
    pub electricity: String,
    #[serde(rename = "Fuel Type", default)]
    pub fuel_type: String,
    #[serde(rename = "Fuel Quantity", default)]
    pub fuel_quantity: String,
    #[serde(rename = "Purchased Materials", default)]
    pub purchased_materials: String,
    #[serde(rename = "Transport Distance", default)]
    pub transport_distance: String,
    #[serde(rename = "Transport Mode", default)]
    pub transport_mode: String,
    #[serde(rename = "CN Code", default)]
    pub cn_code: String,
}

/// Anything the engine can turn into a [`ProductionRecord`]
pub trait RecordSource {
    /// Label identifying the row in diagnostics
    fn label(&self) -> String;

    /// Produce a validated record
    ///
    /// # Errors
    /// Returns [`CoercionError`] when a numeric field is missing, unparseable,
    /// negative or not finite.
    fn coerce(&self) -> Result<ProductionRecord, CoercionError>;
}

impl RecordSource for ProductionRecord {
    fn label(&self) -> String {
        self.product_type.to_string()
    }

    fn coerce(&self) -> Result<ProductionRecord, CoercionError> {
        check_amount("Quantity", self.quantity)?;
        check_amount("Electricity", self.electricity_mwh)?;
        check_amount("Fuel Quantity", self.fuel_quantity)?;
        check_amount("Purchased Materials", self.purchased_materials)?;
        check_amount("Transport Distance", self.transport_distance_km)?;
        Ok(self.clone())
    }
}

impl RecordSource for RawRecord {
    fn label(&self) -> String {
        self.product.trim().to_string()
    }

    fn coerce(&self) -> Result<ProductionRecord, CoercionError> {
        let cn_code = self.cn_code.trim();
        Ok(ProductionRecord {
            product_type: ProductType::from(self.product.as_str()),
            quantity: parse_amount("Quantity", &self.quantity, true)?,
            electricity_mwh: parse_amount("Electricity", &self.electricity, true)?,
            fuel_type: FuelType::from_cell(&self.fuel_type),
            fuel_quantity: parse_amount("Fuel Quantity", &self.fuel_quantity, false)?,
            purchased_materials: parse_amount("Purchased Materials", &self.purchased_materials, false)?,
            transport_distance_km: parse_amount("Transport Distance", &self.transport_distance, false)?,
            transport_mode: TransportMode::from_cell(&self.transport_mode),
            cn_code: (!cn_code.is_empty()).then(|| cn_code.to_string()),
        })
    }
}

/// Records that passed coercion, with their original indices, plus the ones that did not
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordBatch {
    pub accepted: Vec<(usize, ProductionRecord)>,
    pub skipped: Vec<RowDiagnostic>,
}

impl RecordBatch {
    /// Coerce every row, isolating failures to the row that caused them
    pub fn coerce<R: RecordSource>(records: &[R]) -> Self {
        let mut batch = Self::default();
        for (index, source) in records.iter().enumerate() {
            match source.coerce() {
                Ok(record) => batch.accepted.push((index, record)),
                Err(error) => batch.skipped.push(RowDiagnostic {
                    index,
                    product: source.label(),
                    error,
                }),
            }
        }
        batch
    }
}
