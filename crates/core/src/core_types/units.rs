//! Semantic unit types for emissions and money
//!
//! Newtype wrappers keep emissions, money and carbon prices from being mixed
//! by accident (e.g. adding a fee to a tonnage).
//!
//! # Design Philosophy
//! - All quantities are f64; rounding happens only at presentation
//! - `Deref` to the raw value for read access in arithmetic-heavy code
//! - Only the operations that make physical sense are implemented
//!   (tonnes × price = money, money - money = money)
//! - Serde support for serialization (serialized as the bare number)
//!
//! # Usage
//! ```
//! use cbam_core::core_types::units::{EurosPerTonne, TonnesCo2};
//!
//! let emissions = TonnesCo2::new(21.5);
//! let fee = emissions * EurosPerTonne::new(100.0);
//! assert!((*fee - 2150.0).abs() < 1e-9);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Deref, Mul, Sub};

/// Round to two decimal places, the precision used for every presented value.
#[inline]
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ============================================================================
// EMISSIONS
// ============================================================================

/// Emissions in tonnes of CO₂-equivalent
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct TonnesCo2(f64);

impl Deref for TonnesCo2 {
    type Target = f64;
    #[inline]
    fn deref(&self) -> &f64 {
        &self.0
    }
}

impl TonnesCo2 {
    /// No emissions
    pub const ZERO: TonnesCo2 = TonnesCo2(0.0);

    /// Create a new emissions quantity
    #[inline]
    #[must_use]
    pub const fn new(value: f64) -> Self {
        TonnesCo2(value)
    }

    /// Value rounded to two decimal places
    #[inline]
    #[must_use]
    pub fn rounded(self) -> f64 {
        round2(self.0)
    }
}

impl Add for TonnesCo2 {
    type Output = TonnesCo2;
    fn add(self, rhs: TonnesCo2) -> TonnesCo2 {
        TonnesCo2(self.0 + rhs.0)
    }
}

impl AddAssign for TonnesCo2 {
    fn add_assign(&mut self, rhs: TonnesCo2) {
        self.0 += rhs.0;
    }
}

impl Mul<EurosPerTonne> for TonnesCo2 {
    type Output = Euros;
    fn mul(self, rhs: EurosPerTonne) -> Euros {
        Euros(self.0 * rhs.0)
    }
}

impl Sum for TonnesCo2 {
    fn sum<I: Iterator<Item = TonnesCo2>>(iter: I) -> TonnesCo2 {
        iter.fold(TonnesCo2::ZERO, Add::add)
    }
}

impl fmt::Display for TonnesCo2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} tCO₂", self.0)
    }
}

// ============================================================================
// MONEY
// ============================================================================

/// Monetary amount in euros
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Euros(f64);

impl Deref for Euros {
    type Target = f64;
    #[inline]
    fn deref(&self) -> &f64 {
        &self.0
    }
}

impl Euros {
    /// Zero euros
    pub const ZERO: Euros = Euros(0.0);

    /// Create a new amount
    #[inline]
    #[must_use]
    pub const fn new(value: f64) -> Self {
        Euros(value)
    }

    /// Value rounded to cents
    #[inline]
    #[must_use]
    pub fn rounded(self) -> f64 {
        round2(self.0)
    }
}

impl Add for Euros {
    type Output = Euros;
    fn add(self, rhs: Euros) -> Euros {
        Euros(self.0 + rhs.0)
    }
}

impl AddAssign for Euros {
    fn add_assign(&mut self, rhs: Euros) {
        self.0 += rhs.0;
    }
}

impl Sub for Euros {
    type Output = Euros;
    fn sub(self, rhs: Euros) -> Euros {
        Euros(self.0 - rhs.0)
    }
}

impl Sum for Euros {
    fn sum<I: Iterator<Item = Euros>>(iter: I) -> Euros {
        iter.fold(Euros::ZERO, Add::add)
    }
}

impl fmt::Display for Euros {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "€{:.2}", self.0)
    }
}

/// Carbon price in euros per tonne of CO₂
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct EurosPerTonne(f64);

impl Deref for EurosPerTonne {
    type Target = f64;
    #[inline]
    fn deref(&self) -> &f64 {
        &self.0
    }
}

impl EurosPerTonne {
    /// Create a new carbon price
    #[inline]
    #[must_use]
    pub const fn new(value: f64) -> Self {
        EurosPerTonne(value)
    }

}

impl fmt::Display for EurosPerTonne {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "€{:.2}/tCO₂", self.0)
    }
}

// ============================================================================
// RATIOS
// ============================================================================

/// A percentage (0-100)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Percent(f64);

impl Deref for Percent {
    type Target = f64;
    #[inline]
    fn deref(&self) -> &f64 {
        &self.0
    }
}

impl Percent {
    /// Create a new percentage
    #[inline]
    #[must_use]
    pub const fn new(value: f64) -> Self {
        Percent(value)
    }

    /// Convert to fraction (0-1)
    #[inline]
    #[must_use]
    pub fn to_fraction(self) -> f64 {
        self.0 / 100.0
    }

    /// The share left over, `1 - p/100`
    ///
    /// A 30% renewable share leaves 0.7 of grid electricity emitting.
    #[inline]
    #[must_use]
    pub fn remainder(self) -> f64 {
        1.0 - self.to_fraction()
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}%", self.0)
    }
}
