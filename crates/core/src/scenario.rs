//! Mitigation scenarios
//!
//! A scenario bundles the assumptions a manufacturer wants to compare: how much
//! grid electricity is replaced by renewables, how much direct emissions drop
//! through efficiency measures, and what that costs up front.
//!
//! Three named templates ship with the crate; custom scenarios go through the
//! same validated constructor.

use crate::core_types::{Euros, Percent};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidScenario {
    #[error("scenario name must not be empty")]
    EmptyName,
    #[error("scenario '{name}': {field} must be within 0-100%, got {value}")]
    PercentOutOfRange {
        name: String,
        field: &'static str,
        value: f64,
    },
    #[error("scenario '{name}': investment cost must be finite and non-negative, got {value}")]
    InvalidInvestment { name: String, value: f64 },
}

fn check_percent(name: &str, field: &'static str, value: f64) -> Result<Percent, InvalidScenario> {
    if (0.0..=100.0).contains(&value) {
        Ok(Percent::new(value))
    } else {
        Err(InvalidScenario::PercentOutOfRange {
            name: name.to_string(),
            field,
            value,
        })
    }
}

/// Named bundle of mitigation assumptions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scenario {
    name: String,
    renewable_share: Percent,
    efficiency_gain: Percent,
    investment_cost: Euros,
}

impl Scenario {
    /// Create a validated scenario
    ///
    /// # Errors
    /// Returns [`InvalidScenario`] for an empty name, a percentage outside
    /// 0-100 (NaN included), or a negative or non-finite investment.
    pub fn new(
        name: impl Into<String>,
        renewable_share_pct: f64,
        efficiency_gain_pct: f64,
        investment_cost: f64,
    ) -> Result<Self, InvalidScenario> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(InvalidScenario::EmptyName);
        }
        let renewable_share = check_percent(trimmed, "renewable share", renewable_share_pct)?;
        let efficiency_gain = check_percent(trimmed, "efficiency gain", efficiency_gain_pct)?;
        if !investment_cost.is_finite() || investment_cost < 0.0 {
            return Err(InvalidScenario::InvalidInvestment {
                name: trimmed.to_string(),
                value: investment_cost,
            });
        }

        Ok(Self {
            name: trimmed.to_string(),
            renewable_share,
            efficiency_gain,
            investment_cost: Euros::new(investment_cost),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Share of grid electricity replaced by renewables
    pub fn renewable_share(&self) -> Percent {
        self.renewable_share
    }

    /// Reduction of direct and value-chain emissions from efficiency measures
    pub fn efficiency_gain(&self) -> Percent {
        self.efficiency_gain
    }

    pub fn investment_cost(&self) -> Euros {
        self.investment_cost
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (renewables {}, efficiency {}, investment {})",
            self.name, self.renewable_share, self.efficiency_gain, self.investment_cost
        )
    }
}

/// Predefined scenarios offered alongside custom entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioTemplate {
    /// 10% solar, 5% efficiency, €1,000 investment
    LowReduction,
    /// 40% solar, 15% efficiency, €5,000 investment
    MediumReduction,
    /// 70% solar, 30% efficiency, €10,000 investment
    HighReduction,
}

impl ScenarioTemplate {
    pub const ALL: [ScenarioTemplate; 3] = [
        ScenarioTemplate::LowReduction,
        ScenarioTemplate::MediumReduction,
        ScenarioTemplate::HighReduction,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::LowReduction => "Low Reduction",
            Self::MediumReduction => "Medium Reduction",
            Self::HighReduction => "High Reduction",
        }
    }

    /// (renewable %, efficiency %, investment €)
    const fn parameters(self) -> (f64, f64, f64) {
        match self {
            Self::LowReduction => (10.0, 5.0, 1000.0),
            Self::MediumReduction => (40.0, 15.0, 5000.0),
            Self::HighReduction => (70.0, 30.0, 10000.0),
        }
    }

    /// Parse a template label such as "low", "Medium Reduction" or "high-reduction"
    pub fn from_label(label: &str) -> Option<Self> {
        let key: String = label
            .chars()
            .filter(char::is_ascii_alphabetic)
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "low" | "lowreduction" => Some(Self::LowReduction),
            "medium" | "mediumreduction" => Some(Self::MediumReduction),
            "high" | "highreduction" => Some(Self::HighReduction),
            _ => None,
        }
    }

    /// Build the scenario this template describes
    pub fn scenario(self) -> Scenario {
        let (renewable, efficiency, investment) = self.parameters();
        Scenario {
            name: self.name().to_string(),
            renewable_share: Percent::new(renewable),
            efficiency_gain: Percent::new(efficiency),
            investment_cost: Euros::new(investment),
        }
    }
}
