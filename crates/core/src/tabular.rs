//! CSV boundary
//!
//! Reads production tables and factor overrides, and writes result and summary
//! tables. Values are rounded to two decimals on the way out; nothing upstream
//! of this module rounds.
//!
//! Column headers match the upload and download formats of the dashboard:
//!
//! | Table     | Columns |
//! |-----------|---------|
//! | records   | Product, Quantity, Electricity, Fuel Type, Fuel Quantity, Purchased Materials, Transport Distance, Transport Mode, CN Code (optional) |
//! | factors   | Category, Subcategory, `EmissionFactor` |
//! | results   | Scenario, Product, Scope 1-3, Total Emissions, CBAM Fee, Investment, Net Savings |
//! | summaries | Scenario, Total Emissions, CBAM Fee, Net Savings, Scope 1-3 |

use crate::engine::ResultRow;
use crate::factors::FactorRow;
use crate::record::RawRecord;
use crate::summary::ScenarioSummary;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{Read, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TabularError {
    #[error("failed to read {table} table: {source}")]
    Read {
        table: &'static str,
        #[source]
        source: csv::Error,
    },
    #[error("failed to write {table} table: {source}")]
    Write {
        table: &'static str,
        #[source]
        source: csv::Error,
    },
    #[error("failed to flush {table} table: {source}")]
    Flush {
        table: &'static str,
        #[source]
        source: std::io::Error,
    },
}

fn read_table<T: DeserializeOwned, R: Read>(table: &'static str, reader: R) -> Result<Vec<T>, TabularError> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader)
        .deserialize()
        .collect::<Result<Vec<T>, csv::Error>>()
        .map_err(|source| TabularError::Read { table, source })
}

fn write_table<T: Serialize, W: Write>(
    table: &'static str,
    writer: W,
    rows: impl IntoIterator<Item = T>,
) -> Result<(), TabularError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer
            .serialize(row)
            .map_err(|source| TabularError::Write { table, source })?;
    }
    csv_writer
        .flush()
        .map_err(|source| TabularError::Flush { table, source })
}

/// Read production records as text cells
///
/// Cell contents are not interpreted here; bad numbers surface later as
/// per-row diagnostics.
///
/// # Errors
/// Returns [`TabularError::Read`] if the input is not well-formed CSV.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<RawRecord>, TabularError> {
    read_table("records", reader)
}

/// Read factor override rows
///
/// # Errors
/// Returns [`TabularError::Read`] if the input is not well-formed CSV.
pub fn read_factor_rows<R: Read>(reader: R) -> Result<Vec<FactorRow>, TabularError> {
    read_table("factors", reader)
}

#[derive(Serialize)]
struct ResultLine<'a> {
    #[serde(rename = "Scenario")]
    scenario: &'a str,
    #[serde(rename = "Product")]
    product: &'a str,
    #[serde(rename = "Scope 1 (tCO₂)")]
    scope1: f64,
    #[serde(rename = "Scope 2 (tCO₂)")]
    scope2: f64,
    #[serde(rename = "Scope 3 (tCO₂)")]
    scope3: f64,
    #[serde(rename = "Total Emissions (tCO₂)")]
    total_emissions: f64,
    #[serde(rename = "CBAM Fee (€)")]
    fee: f64,
    #[serde(rename = "Investment (€)")]
    investment: f64,
    #[serde(rename = "Net Savings (€)")]
    net_savings: f64,
}

impl<'a> From<&'a ResultRow> for ResultLine<'a> {
    fn from(row: &'a ResultRow) -> Self {
        Self {
            scenario: &row.scenario_name,
            product: row.product_type.name(),
            scope1: row.scope1.rounded(),
            scope2: row.scope2.rounded(),
            scope3: row.scope3.rounded(),
            total_emissions: row.total_emissions.rounded(),
            fee: row.fee.rounded(),
            investment: row.investment_cost.rounded(),
            net_savings: row.net_savings.rounded(),
        }
    }
}

#[derive(Serialize)]
struct SummaryLine<'a> {
    #[serde(rename = "Scenario")]
    scenario: &'a str,
    #[serde(rename = "Total Emissions (tCO₂)")]
    total_emissions: f64,
    #[serde(rename = "CBAM Fee (€)")]
    fee: f64,
    #[serde(rename = "Net Savings (€)")]
    net_savings: f64,
    #[serde(rename = "Scope 1 (tCO₂)")]
    scope1: f64,
    #[serde(rename = "Scope 2 (tCO₂)")]
    scope2: f64,
    #[serde(rename = "Scope 3 (tCO₂)")]
    scope3: f64,
}

impl<'a> From<&'a ScenarioSummary> for SummaryLine<'a> {
    fn from(summary: &'a ScenarioSummary) -> Self {
        Self {
            scenario: &summary.scenario_name,
            total_emissions: summary.total_emissions.rounded(),
            fee: summary.total_fee.rounded(),
            net_savings: summary.total_net_savings.rounded(),
            scope1: summary.scope1.rounded(),
            scope2: summary.scope2.rounded(),
            scope3: summary.scope3.rounded(),
        }
    }
}

/// Write detailed results as UTF-8 CSV
///
/// # Errors
/// Returns [`TabularError`] if serialization or the underlying writer fails.
pub fn write_results<W: Write>(writer: W, rows: &[ResultRow]) -> Result<(), TabularError> {
    write_table("results", writer, rows.iter().map(ResultLine::from))
}

/// Write the per-scenario summary as UTF-8 CSV
///
/// # Errors
/// Returns [`TabularError`] if serialization or the underlying writer fails.
pub fn write_summaries<W: Write>(writer: W, summaries: &[ScenarioSummary]) -> Result<(), TabularError> {
    write_table("summaries", writer, summaries.iter().map(SummaryLine::from))
}
