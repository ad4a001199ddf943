//! USD↔micro-unit conversion (C1).

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use thiserror::Error;

/// A display-unit USD price, as configured by a resource owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct UsdAmount(Decimal);

/// Failure converting a configured price into base units.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    /// A price of zero or less was supplied.
    #[error("price must be positive, got {0}")]
    NonPositive(Decimal),
    /// The converted amount does not fit in a `u64`.
    #[error("price overflows base-unit amount")]
    Overflow,
}

impl UsdAmount {
    /// Wraps a decimal price, rejecting non-positive values.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError::NonPositive`] if `price <= 0`.
    pub fn new(price: Decimal) -> Result<Self, AmountError> {
        if price <= Decimal::ZERO {
            return Err(AmountError::NonPositive(price));
        }
        Ok(Self(price))
    }

    /// Converts this price to the smallest integer unit of an asset with
    /// `decimals` decimal places: `round(price * 10^decimals)`.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError::Overflow`] if the result does not fit in a
    /// `u64`.
    pub fn to_micro_units(self, decimals: u8) -> Result<u64, AmountError> {
        let scale = Decimal::from(10u64.pow(u32::from(decimals)));
        let scaled = (self.0 * scale).round();
        scaled.to_u64().ok_or(AmountError::Overflow)
    }
}
