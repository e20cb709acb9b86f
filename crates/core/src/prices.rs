//! Carbon prices
//!
//! The fee is driven by the gap between the EU ETS reference price and the
//! carbon price already paid in the country of production. Live price feeds are
//! outside this crate; a caller that fails to fetch one uses the static
//! fallback in [`DEFAULT_EU_ETS_PRICE`].

use crate::core_types::EurosPerTonne;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Static EU ETS price used when no live value is available (€/tCO₂)
pub const DEFAULT_EU_ETS_PRICE: f64 = 100.0;

/// Default local carbon price (€/tCO₂)
pub const DEFAULT_LOCAL_PRICE: f64 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum InvalidPrice {
    #[error("{market} carbon price must be finite, got {value}")]
    NotFinite { market: &'static str, value: f64 },
    #[error("{market} carbon price must be non-negative, got {value}")]
    Negative { market: &'static str, value: f64 },
}

fn validate(market: &'static str, value: f64) -> Result<EurosPerTonne, InvalidPrice> {
    if !value.is_finite() {
        return Err(InvalidPrice::NotFinite { market, value });
    }
    if value < 0.0 {
        return Err(InvalidPrice::Negative { market, value });
    }
    Ok(EurosPerTonne::new(value))
}

/// Reference and local carbon prices for one calculation run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CarbonPrices {
    eu_price: EurosPerTonne,
    local_price: EurosPerTonne,
}

impl Default for CarbonPrices {
    fn default() -> Self {
        Self {
            eu_price: EurosPerTonne::new(DEFAULT_EU_ETS_PRICE),
            local_price: EurosPerTonne::new(DEFAULT_LOCAL_PRICE),
        }
    }
}

impl CarbonPrices {
    /// Create a validated price pair
    ///
    /// # Errors
    /// Returns [`InvalidPrice`] if either price is negative or not finite.
    pub fn new(eu_price: f64, local_price: f64) -> Result<Self, InvalidPrice> {
        Ok(Self {
            eu_price: validate("EU ETS", eu_price)?,
            local_price: validate("local", local_price)?,
        })
    }

    /// Use a looked-up EU price when one is available, the static fallback otherwise
    ///
    /// # Errors
    /// Returns [`InvalidPrice`] if the looked-up or local price is invalid.
    pub fn with_fallback(looked_up_eu_price: Option<f64>, local_price: f64) -> Result<Self, InvalidPrice> {
        Self::new(
            looked_up_eu_price.unwrap_or(DEFAULT_EU_ETS_PRICE),
            local_price,
        )
    }

    /// EU ETS reference price
    pub fn eu_price(&self) -> EurosPerTonne {
        self.eu_price
    }

    /// Price already paid locally
    pub fn local_price(&self) -> EurosPerTonne {
        self.local_price
    }

    /// Price gap charged at the border, never negative
    ///
    /// A local price above the EU price means nothing is owed, not a refund.
    pub fn spread(&self) -> EurosPerTonne {
        EurosPerTonne::new((*self.eu_price - *self.local_price).max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spread_is_clamped_at_zero() {
        let prices = CarbonPrices::new(100.0, 30.0).unwrap();
        assert_eq!(*prices.spread(), 70.0);

        let prices = CarbonPrices::new(50.0, 80.0).unwrap();
        assert_eq!(*prices.spread(), 0.0);
    }

    #[test]
    fn test_invalid_prices_rejected() {
        assert_eq!(
            CarbonPrices::new(-1.0, 0.0),
            Err(InvalidPrice::Negative {
                market: "EU ETS",
                value: -1.0
            })
        );
        assert!(matches!(
            CarbonPrices::new(100.0, f64::NAN),
            Err(InvalidPrice::NotFinite { market: "local", .. })
        ));
    }

    #[test]
    fn test_fallback_price() {
        let prices = CarbonPrices::with_fallback(None, 10.0).unwrap();
        assert_eq!(*prices.eu_price(), DEFAULT_EU_ETS_PRICE);
        assert_eq!(*prices.spread(), 90.0);

        let prices = CarbonPrices::with_fallback(Some(85.5), 0.0).unwrap();
        assert_eq!(*prices.eu_price(), 85.5);
        assert_eq!(CarbonPrices::default().spread(), EurosPerTonne::new(100.0));
    }
}
