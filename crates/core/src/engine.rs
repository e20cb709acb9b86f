//! Emissions and CBAM fee calculation engine
//!
//! For every (scenario, record) pair the engine computes:
//!
//! - **Scope 1**: `quantity × product factor`, plus `fuel quantity × fuel factor`
//!   when the fuel is known
//! - **Scope 2**: `electricity × grid factor × (1 - renewable share)`
//! - **Scope 3**: `purchased materials × product factor`, plus
//!   `quantity × distance × transport factor` when the mode is known
//! - **Fee**: `total × max(EU price - local price, 0)`
//! - **Net savings**: `fee - investment cost`
//!
//! Two behaviors differ between deployments and are explicit modes in
//! [`EngineConfig`]: whether the scenario's efficiency gain discounts Scope 1
//! and Scope 3 ([`EfficiencyMode`]), and whether factors are looked up per
//! product or per CN code ([`FactorGranularity`]).
//!
//! The engine holds nothing but its configuration. `evaluate` is a pure
//! function of its arguments: the same inputs always produce bit-identical
//! output, whether the cross product runs sequentially or in parallel.

use crate::core_types::{Euros, ProductType, TonnesCo2};
use crate::factors::EmissionFactors;
use crate::prices::CarbonPrices;
use crate::record::{ProductionRecord, RecordBatch, RecordSource, RowDiagnostic};
use crate::scenario::Scenario;
use crate::summary::{recommend, summarize, ScenarioSummary};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// How a scenario's efficiency gain is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EfficiencyMode {
    /// Efficiency gain has no effect on emissions
    #[default]
    Ignored,
    /// Scope 1 and Scope 3 totals are each multiplied by `1 - gain`
    DiscountDirect,
}

/// Granularity of the product factor lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FactorGranularity {
    /// One factor per product category
    #[default]
    Product,
    /// Per-CN-code factor when the record has a known code, product factor otherwise
    CnCode,
}

/// Engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    pub efficiency: EfficiencyMode,
    pub granularity: FactorGranularity,
    /// Evaluate the scenario × record cross product on the rayon thread pool
    pub parallel: bool,
}

/// Scope 1/2/3 emissions of one record under one scenario
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct EmissionBreakdown {
    pub scope1: TonnesCo2,
    pub scope2: TonnesCo2,
    pub scope3: TonnesCo2,
}

impl EmissionBreakdown {
    pub fn total(&self) -> TonnesCo2 {
        self.scope1 + self.scope2 + self.scope3
    }
}

/// Result for one (scenario, record) pair, at full precision
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub scenario_name: String,
    /// Index of the record in the caller's input
    pub record_index: usize,
    pub product_type: ProductType,
    pub scope1: TonnesCo2,
    pub scope2: TonnesCo2,
    pub scope3: TonnesCo2,
    pub total_emissions: TonnesCo2,
    pub fee: Euros,
    pub investment_cost: Euros,
    pub net_savings: Euros,
}

/// Everything one calculation run produces
///
/// An empty input yields empty `rows` and `summaries` and no recommendation;
/// that is a normal outcome, not an error.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Evaluation {
    /// One row per (scenario, accepted record), scenarios in input order, records in input order
    pub rows: Vec<ResultRow>,
    /// One summary per scenario that produced rows, in first-seen order
    pub summaries: Vec<ScenarioSummary>,
    /// Scenario with the highest net savings, first one wins on ties
    pub recommendation: Option<ScenarioSummary>,
    /// Rows that were skipped because their numbers could not be used
    pub diagnostics: Vec<RowDiagnostic>,
}

impl Evaluation {
    /// True when no result rows were produced
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Stateless calculation engine
#[derive(Debug, Clone, Copy, Default)]
pub struct CalculationEngine {
    config: EngineConfig,
}

impl CalculationEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Factor applied to production quantity and purchased materials
    fn base_factor(&self, record: &ProductionRecord, factors: &EmissionFactors) -> f64 {
        if self.config.granularity == FactorGranularity::CnCode {
            if let Some(factor) = record
                .cn_code
                .as_deref()
                .and_then(|code| factors.cn_code_factor(code))
            {
                return factor;
            }
        }
        factors.product_factor(&record.product_type)
    }

    /// Scope 1/2/3 emissions for one record under one scenario
    pub fn emissions(
        &self,
        record: &ProductionRecord,
        factors: &EmissionFactors,
        scenario: &Scenario,
    ) -> EmissionBreakdown {
        let base = self.base_factor(record, factors);

        let mut scope1 = record.quantity * base;
        if let Some(fuel_factor) = factors.fuel_factor(record.fuel_type.as_ref()) {
            scope1 += record.fuel_quantity * fuel_factor;
        }

        let scope2 = record.electricity_mwh
            * factors.electricity_factor()
            * scenario.renewable_share().remainder();

        let mut scope3 = record.purchased_materials * base;
        if let Some(transport_factor) = factors.transport_factor(record.transport_mode.as_ref()) {
            scope3 += record.quantity * record.transport_distance_km * transport_factor;
        }

        // Discount the accumulated totals, fuel and transport included
        if self.config.efficiency == EfficiencyMode::DiscountDirect {
            let retained = scenario.efficiency_gain().remainder();
            scope1 *= retained;
            scope3 *= retained;
        }

        EmissionBreakdown {
            scope1: TonnesCo2::new(scope1),
            scope2: TonnesCo2::new(scope2),
            scope3: TonnesCo2::new(scope3),
        }
    }

    /// Full result row for one record under one scenario
    pub fn evaluate_row(
        &self,
        record_index: usize,
        record: &ProductionRecord,
        factors: &EmissionFactors,
        scenario: &Scenario,
        prices: &CarbonPrices,
    ) -> ResultRow {
        let breakdown = self.emissions(record, factors, scenario);
        let total_emissions = breakdown.total();
        let fee = total_emissions * prices.spread();
        let investment_cost = scenario.investment_cost();

        ResultRow {
            scenario_name: scenario.name().to_string(),
            record_index,
            product_type: record.product_type.clone(),
            scope1: breakdown.scope1,
            scope2: breakdown.scope2,
            scope3: breakdown.scope3,
            total_emissions,
            fee,
            investment_cost,
            net_savings: fee - investment_cost,
        }
    }

    /// Evaluate every scenario against every record, then summarize and recommend
    ///
    /// Rows whose numeric fields cannot be used are skipped and reported in
    /// [`Evaluation::diagnostics`]; the rest of the batch is unaffected.
    pub fn evaluate<R: RecordSource>(
        &self,
        records: &[R],
        factors: &EmissionFactors,
        scenarios: &[Scenario],
        prices: &CarbonPrices,
    ) -> Evaluation {
        info!(
            records = records.len(),
            scenarios = scenarios.len(),
            spread = *prices.spread(),
            "Evaluating CBAM scenarios"
        );

        let batch = RecordBatch::coerce(records);
        for diagnostic in &batch.skipped {
            warn!("{diagnostic}");
        }
        warn_on_duplicate_names(scenarios);

        let rows = self.compute_rows(&batch.accepted, factors, scenarios, prices);
        let summaries = summarize(&rows);
        for summary in &summaries {
            debug!(
                scenario = %summary.scenario_name,
                total_emissions = *summary.total_emissions,
                net_savings = *summary.total_net_savings,
                "Scenario summary"
            );
        }

        let recommendation = recommend(&summaries).cloned();
        match &recommendation {
            Some(best) => info!(
                "Recommended scenario: {} with net savings {}",
                best.scenario_name, best.total_net_savings
            ),
            None => info!("No results, no scenario to recommend"),
        }

        Evaluation {
            rows,
            summaries,
            recommendation,
            diagnostics: batch.skipped,
        }
    }

    /// Rows for the full cross product, ordered by scenario index then record index
    fn compute_rows(
        &self,
        accepted: &[(usize, ProductionRecord)],
        factors: &EmissionFactors,
        scenarios: &[Scenario],
        prices: &CarbonPrices,
    ) -> Vec<ResultRow> {
        let per_scenario = accepted.len();
        let pairs = per_scenario * scenarios.len();
        if pairs == 0 {
            return Vec::new();
        }

        let row_at = |pair: usize| {
            let scenario = &scenarios[pair / per_scenario];
            let (record_index, record) = &accepted[pair % per_scenario];
            self.evaluate_row(*record_index, record, factors, scenario, prices)
        };

        if self.config.parallel {
            // Indexed collect keeps the sequential order, so the merge is deterministic
            #[cfg(feature = "parallel")]
            {
                debug!(pairs, "Evaluating cross product in parallel");
                return (0..pairs).into_par_iter().map(row_at).collect();
            }

            #[cfg(not(feature = "parallel"))]
            info!("Parallel feature disabled, evaluating sequentially");
        }

        (0..pairs).map(row_at).collect()
    }
}

fn warn_on_duplicate_names(scenarios: &[Scenario]) {
    for (i, scenario) in scenarios.iter().enumerate() {
        if scenarios[..i].iter().any(|s| s.name() == scenario.name()) {
            warn!(
                "Scenario name '{}' appears more than once; its rows are summarized together",
                scenario.name()
            );
        }
    }
}
