//! Monetary amounts carried by an order, its payment and its invoice.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when validating [`OrderAmounts`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    /// `total_amount` must be strictly positive.
    #[error("total_amount must be greater than 0")]
    NonPositiveTotal,
    /// A component amount is negative.
    #[error("{0} cannot be negative")]
    Negative(&'static str),
    /// An amount does not fit a `NUMERIC(12,2)` column.
    #[error("{0} exceeds {MAX_AMOUNT}")]
    TooLarge(&'static str),
}

/// Largest amount a `NUMERIC(12,2)` column holds: `9999999999.99`.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2);

/// Whether `value` fits a `NUMERIC(12,2)` column.
#[must_use]
pub fn fits_column(value: Decimal) -> bool {
    value.abs() <= MAX_AMOUNT
}

/// The amounts submitted with a checkout.
///
/// These are snapshotted onto the order, the payment record and the invoice.
/// The back office trusts the storefront's arithmetic; it only rejects
/// amounts that cannot describe a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OrderAmounts {
    /// Sum of line totals.
    #[serde(default)]
    pub subtotal: Decimal,
    /// Shipping charge.
    #[serde(default)]
    pub shipping_fee: Decimal,
    /// Tax charged.
    #[serde(default)]
    pub tax_amount: Decimal,
    /// Amount charged to the customer.
    #[serde(default)]
    pub total_amount: Decimal,
}

impl OrderAmounts {
    /// Check that the amounts describe a sale.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError::NonPositiveTotal`] when `total_amount <= 0` and
    /// [`AmountError::Negative`] when any component is below zero.
    /// [`AmountError::TooLarge`] when an amount would overflow its column.
    pub fn validate(&self) -> Result<(), AmountError> {
        if self.total_amount <= Decimal::ZERO {
            return Err(AmountError::NonPositiveTotal);
        }
        for (name, value) in [
            ("subtotal", self.subtotal),
            ("shipping_fee", self.shipping_fee),
            ("tax_amount", self.tax_amount),
        ] {
            if value < Decimal::ZERO {
                return Err(AmountError::Negative(name));
            }
        }
        for (name, value) in [
            ("subtotal", self.subtotal),
            ("shipping_fee", self.shipping_fee),
            ("tax_amount", self.tax_amount),
            ("total_amount", self.total_amount),
        ] {
            if !fits_column(value) {
                return Err(AmountError::TooLarge(name));
            }
        }
        Ok(())
    }
}
