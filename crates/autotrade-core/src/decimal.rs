//! Precision-safe numeric types for trading.
//!
//! Prices use `rust_decimal` so that target/stop thresholds and return
//! percentages are computed without floating-point drift. Quantities are
//! whole shares.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Mul;
use std::str::FromStr;

/// Price with exact decimal precision.
///
/// Wraps `Decimal` to provide type safety and prevent mixing
/// prices with quantities in calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Price from a whole-currency amount.
    #[inline]
    pub fn from_units(units: i64) -> Self {
        Self(Decimal::from(units))
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Floor to a multiple of `tick_size`.
    #[inline]
    pub fn round_to_tick(&self, tick_size: Price) -> Self {
        if tick_size.is_zero() {
            return *self;
        }
        Self((self.0 / tick_size.0).floor() * tick_size.0)
    }

    /// Percentage difference from another price.
    #[inline]
    pub fn pct_from(&self, other: Price) -> Option<Decimal> {
        if other.is_zero() {
            return None;
        }
        Some((self.0 - other.0) / other.0 * Decimal::ONE_HUNDRED)
    }

    /// How many whole shares `amount` buys at this price.
    ///
    /// Returns zero for a non-positive price.
    #[inline]
    pub fn affordable_qty(&self, amount: Decimal) -> Qty {
        if !self.is_positive() || amount.is_sign_negative() {
            return Qty::ZERO;
        }
        Qty((amount / self.0).floor().to_u64().unwrap_or(0))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Price {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl Mul<Decimal> for Price {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}

/// Whole-share quantity.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Qty(pub u64);

impl Qty {
    pub const ZERO: Self = Self(0);

    #[inline]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> u64 {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Market value of this quantity at `price`.
    #[inline]
    pub fn notional(&self, price: Price) -> Decimal {
        Decimal::from(self.0) * price.0
    }
}

impl fmt::Display for Qty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_price_pct_from() {
        let cost = Price::new(dec!(10000));
        let now = Price::new(dec!(10250));

        assert_eq!(now.pct_from(cost), Some(dec!(2.5)));
        assert_eq!(now.pct_from(Price::ZERO), None);
    }

    #[test]
    fn test_price_round_to_tick() {
        let price = Price::new(dec!(12347));
        let rounded = price.round_to_tick(Price::from_units(10));
        assert_eq!(rounded.0, dec!(12340));
    }

    #[test]
    fn test_affordable_qty() {
        assert_eq!(Price::from_units(9000).affordable_qty(dec!(100000)), Qty(11));
        assert_eq!(Price::from_units(150000).affordable_qty(dec!(100000)), Qty(0));
        assert_eq!(Price::ZERO.affordable_qty(dec!(100000)), Qty(0));
    }

    #[test]
    fn test_notional() {
        assert_eq!(Qty(3).notional(Price::from_units(1500)), dec!(4500));
    }
}
