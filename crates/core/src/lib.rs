//! CBAM Fee Estimation Core Library
//!
//! Estimates carbon-border-adjustment fees for exporters from per-product
//! production data, emission factors and carbon prices, and compares
//! mitigation scenarios to recommend the one with the highest net savings.
//!
//! ## Calculation pipeline
//!
//! - Records are coerced one by one; unusable rows are skipped with a diagnostic
//! - Every scenario is evaluated against every accepted record (Scope 1/2/3,
//!   fee, net savings)
//! - Rows are summarized per scenario and the best scenario is recommended
//!
//! The engine is pure and stateless: callers own the records, factors and
//! scenarios and pass them in fresh for every run.

// Core types and utilities
pub mod core_types;

// Inputs
pub mod factors;
pub mod prices;
pub mod record;
pub mod scenario;

// Calculation
pub mod engine;
pub mod summary;

// CSV boundary
pub mod tabular;

// Re-export core types
pub use core_types::{Euros, EurosPerTonne, FuelType, Percent, ProductType, TonnesCo2, TransportMode};

// Re-export inputs
pub use factors::{EmissionFactors, FactorCategory, FactorNotice, FactorRow, InvalidOverrideFactors};
pub use prices::{CarbonPrices, InvalidPrice};
pub use record::{CoercionError, ProductionRecord, RawRecord, RecordBatch, RecordSource, RowDiagnostic};
pub use scenario::{InvalidScenario, Scenario, ScenarioTemplate};

// Re-export calculation types
pub use engine::{
    CalculationEngine, EfficiencyMode, EmissionBreakdown, EngineConfig, Evaluation, FactorGranularity, ResultRow,
};
pub use summary::{recommend, summarize, ScenarioSummary};
pub use tabular::TabularError;
