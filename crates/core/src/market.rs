//! Per-currency lending-market parameters.

use alloy::primitives::U256;

use crate::monetary::Permill;

/// Protocol parameters of one lending market, keyed by the underlying
/// currency.
#[derive(Debug, Clone)]
pub struct LoansMarket {
    /// Maximum fraction of a borrower's debt repayable in one
    /// liquidation call.
    pub close_factor: Permill,
    /// WAD multiplier (>= 1) of collateral value the liquidator receives
    /// per unit of repaid debt value.
    pub liquidation_incentive: U256,
    /// Collateral-value haircut used by the risk engine to decide when a
    /// position becomes liquidatable. Not consulted by the selection
    /// strategy itself.
    pub liquidation_threshold: Permill,
}

impl LoansMarket {
    pub fn new(
        close_factor: Permill,
        liquidation_incentive: U256,
        liquidation_threshold: Permill,
    ) -> Self {
        Self {
            close_factor,
            liquidation_incentive,
            liquidation_threshold,
        }
    }
}
