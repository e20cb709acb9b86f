//! Per-scenario aggregation and recommendation

use crate::core_types::{Euros, TonnesCo2};
use crate::engine::ResultRow;
use rustc_hash::FxHashMap;
use serde::Serialize;

/// Totals over all records for one scenario
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioSummary {
    pub scenario_name: String,
    pub scope1: TonnesCo2,
    pub scope2: TonnesCo2,
    pub scope3: TonnesCo2,
    pub total_emissions: TonnesCo2,
    pub total_fee: Euros,
    pub total_net_savings: Euros,
}

impl ScenarioSummary {
    fn empty(scenario_name: &str) -> Self {
        Self {
            scenario_name: scenario_name.to_string(),
            scope1: TonnesCo2::ZERO,
            scope2: TonnesCo2::ZERO,
            scope3: TonnesCo2::ZERO,
            total_emissions: TonnesCo2::ZERO,
            total_fee: Euros::ZERO,
            total_net_savings: Euros::ZERO,
        }
    }

    fn accumulate(&mut self, row: &ResultRow) {
        self.scope1 += row.scope1;
        self.scope2 += row.scope2;
        self.scope3 += row.scope3;
        self.total_emissions += row.total_emissions;
        self.total_fee += row.fee;
        self.total_net_savings += row.net_savings;
    }
}

/// Group rows by scenario name, keeping the order in which scenarios first appear
///
/// Sums run over full-precision values in row order.
pub fn summarize(rows: &[ResultRow]) -> Vec<ScenarioSummary> {
    let mut position: FxHashMap<&str, usize> = FxHashMap::default();
    let mut summaries: Vec<ScenarioSummary> = Vec::new();

    for row in rows {
        let slot = *position
            .entry(row.scenario_name.as_str())
            .or_insert_with(|| {
                summaries.push(ScenarioSummary::empty(&row.scenario_name));
                summaries.len() - 1
            });
        summaries[slot].accumulate(row);
    }

    summaries
}

/// Summary with the highest net savings
///
/// Ties go to the scenario that appears first. Returns `None` for an empty slice.
pub fn recommend(summaries: &[ScenarioSummary]) -> Option<&ScenarioSummary> {
    summaries.iter().fold(None, |best, candidate| match best {
        Some(current) if candidate.total_net_savings <= current.total_net_savings => Some(current),
        _ => Some(candidate),
    })
}
