//! Borrower position snapshots as reported by the chain's risk engine.
//!
//! Every value here is a read-only snapshot valid only for the block in
//! which it was fetched; nothing is held across evaluation cycles.

use smallvec::SmallVec;

use crate::account::AccountId;
use crate::monetary::{MonetaryAmount, MonetaryError};

/// Collateral deposited by a borrower in a single currency.
#[derive(Debug, Clone)]
pub struct CollateralPosition {
    pub amount: MonetaryAmount,
}

impl CollateralPosition {
    pub fn new(amount: MonetaryAmount) -> Self {
        Self { amount }
    }
}

/// Outstanding borrow of a single currency: principal plus interest
/// accrued since the last index update, both in the borrowed currency.
#[derive(Debug, Clone)]
pub struct BorrowPosition {
    pub amount: MonetaryAmount,
    pub accumulated_debt: MonetaryAmount,
}

impl BorrowPosition {
    pub fn new(amount: MonetaryAmount, accumulated_debt: MonetaryAmount) -> Self {
        Self {
            amount,
            accumulated_debt,
        }
    }

    /// Total owed: principal + accumulated interest.
    pub fn total_debt(&self) -> Result<MonetaryAmount, MonetaryError> {
        self.amount.checked_add(&self.accumulated_debt)
    }
}

/// A borrower flagged by the risk engine as eligible for liquidation.
///
/// One entry per collateral currency and one per borrowed currency;
/// iteration order is the chain's reporting order and is what makes the
/// strategy's first-encountered tie-break deterministic.
#[derive(Debug, Clone)]
pub struct UndercollateralizedPosition {
    pub account_id: AccountId,
    pub collateral_positions: SmallVec<[CollateralPosition; 4]>,
    pub borrow_positions: SmallVec<[BorrowPosition; 4]>,
}

impl UndercollateralizedPosition {
    pub fn new(
        account_id: AccountId,
        collateral_positions: impl IntoIterator<Item = CollateralPosition>,
        borrow_positions: impl IntoIterator<Item = BorrowPosition>,
    ) -> Self {
        Self {
            account_id,
            collateral_positions: collateral_positions.into_iter().collect(),
            borrow_positions: borrow_positions.into_iter().collect(),
        }
    }
}
