//! Monetary values and conversions.
//!
//! A [`MonetaryAmount`] pairs a currency with an atomic-unit magnitude
//! and is never mutated; every operation returns a new value. Arithmetic
//! is defined only between amounts of the same currency — mixing
//! currencies is an explicit [`MonetaryError`], and ordering across
//! currencies is simply undefined (`partial_cmp` returns `None`) rather
//! than a panic.

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

use crate::currency::Currency;
use crate::fixed_math;

/// Errors from same-currency arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonetaryError {
    #[error("currency mismatch: expected {expected}, found {found}")]
    CurrencyMismatch { expected: String, found: String },
}

/// Parts-per-million fraction, the chain's encoding of fractional
/// market parameters such as the close factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permill(u32);

impl Permill {
    pub const ONE: Permill = Permill(1_000_000);

    pub fn from_parts(parts: u32) -> Self {
        Self(parts)
    }

    pub fn from_percent(percent: u32) -> Self {
        Self(percent.saturating_mul(10_000))
    }

    pub fn parts(&self) -> u32 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Permill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}%", self.0 as f64 / 10_000.0)
    }
}

/// An immutable (currency, magnitude) pair in atomic units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonetaryAmount {
    currency: Currency,
    amount: U256,
}

impl MonetaryAmount {
    pub fn new(currency: Currency, amount: U256) -> Self {
        Self { currency, amount }
    }

    pub fn zero(currency: Currency) -> Self {
        Self::new(currency, U256::ZERO)
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    pub fn amount(&self) -> U256 {
        self.amount
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    fn ensure_same_currency(&self, other: &Self) -> Result<(), MonetaryError> {
        if self.currency != other.currency {
            return Err(MonetaryError::CurrencyMismatch {
                expected: self.currency.id().to_string(),
                found: other.currency.id().to_string(),
            });
        }
        Ok(())
    }

    /// Same-currency addition.
    pub fn checked_add(&self, other: &Self) -> Result<Self, MonetaryError> {
        self.ensure_same_currency(other)?;
        Ok(Self::new(
            self.currency.clone(),
            self.amount.saturating_add(other.amount),
        ))
    }

    /// Scale by a permill fraction, truncating toward zero.
    pub fn mul_permill(&self, fraction: Permill) -> Self {
        Self::new(
            self.currency.clone(),
            fixed_math::permill_mul(self.amount, fraction.parts()),
        )
    }

    /// Scale by a WAD ratio, truncating toward zero.
    pub fn mul_wad(&self, ratio_wad: U256) -> Self {
        Self::new(
            self.currency.clone(),
            fixed_math::wad_mul(self.amount, ratio_wad),
        )
    }

    /// Same-currency minimum.
    pub fn min(&self, other: &Self) -> Result<Self, MonetaryError> {
        self.ensure_same_currency(other)?;
        Ok(Self::new(
            self.currency.clone(),
            fixed_math::min(self.amount, other.amount),
        ))
    }

    /// Whole-unit value for display only.
    pub fn to_f64_lossy(&self) -> f64 {
        fixed_math::to_f64_lossy(self.amount, self.currency.decimals())
    }
}

impl PartialOrd for MonetaryAmount {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.currency != other.currency {
            return None;
        }
        Some(self.amount.cmp(&other.amount))
    }
}

impl fmt::Display for MonetaryAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.to_f64_lossy(), self.currency.symbol())
    }
}

/// Conversion ratio from a counter currency into a base currency.
///
/// The ratio is WAD-scaled and expressed atomic-per-atomic, so
/// `to_base` is a single fixed-point multiplication regardless of the
/// two currencies' decimals.
#[derive(Debug, Clone)]
pub struct ExchangeRate {
    counter: Currency,
    base: Currency,
    rate_wad: U256,
}

impl ExchangeRate {
    /// Build from an atomic-per-atomic WAD ratio.
    pub fn new(counter: Currency, base: Currency, rate_wad: U256) -> Self {
        Self {
            counter,
            base,
            rate_wad,
        }
    }

    /// Build from a whole-unit price (base per one whole counter unit,
    /// WAD-scaled), adjusting for the decimal difference.
    pub fn from_unit_price(counter: Currency, base: Currency, price_wad: U256) -> Self {
        let scaled = price_wad * fixed_math::pow10(base.decimals())
            / fixed_math::pow10(counter.decimals());
        Self::new(counter, base, scaled)
    }

    pub fn counter(&self) -> &Currency {
        &self.counter
    }

    pub fn base(&self) -> &Currency {
        &self.base
    }

    pub fn rate_wad(&self) -> U256 {
        self.rate_wad
    }

    /// Convert a counter-currency amount into the base currency.
    pub fn to_base(&self, amount: &MonetaryAmount) -> Result<MonetaryAmount, MonetaryError> {
        if amount.currency() != &self.counter {
            return Err(MonetaryError::CurrencyMismatch {
                expected: self.counter.id().to_string(),
                found: amount.currency().id().to_string(),
            });
        }
        Ok(MonetaryAmount::new(
            self.base.clone(),
            fixed_math::wad_mul(amount.amount(), self.rate_wad),
        ))
    }
}
