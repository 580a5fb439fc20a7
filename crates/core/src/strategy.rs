//! Greedy liquidation selection over a per-block chain snapshot.
//!
//! The bot issues at most one liquidation per evaluation cycle, chosen
//! to maximize realized reference-currency repayment value among all
//! currently profitable opportunities. Everything in this module is a
//! pure function over already-fetched state: no suspension, no chain
//! access, no panics. Anything the snapshot cannot support (missing
//! price, missing balance, missing market, empty collateral) skips the
//! candidate instead of failing the scan.

use std::collections::HashMap;

use crate::account::{AccountId, ChainBalance};
use crate::currency::{Currency, CurrencyId};
use crate::market::LoansMarket;
use crate::monetary::{ExchangeRate, MonetaryAmount};
use crate::position::{CollateralPosition, UndercollateralizedPosition};

/// A collateral position together with its value in the reference
/// currency.
#[derive(Debug, Clone)]
pub struct CollateralAndValue {
    pub collateral: MonetaryAmount,
    pub reference_value: MonetaryAmount,
}

/// The triple handed to the executor: repay `repay` of `borrower`'s debt
/// (in `repay`'s currency), seizing collateral in `collateral_currency`.
#[derive(Debug, Clone)]
pub struct LiquidationOpportunity {
    pub repay: MonetaryAmount,
    pub collateral_currency: Currency,
    pub borrower: AccountId,
}

/// Value of `balance` in the reference currency.
///
/// An asset without an active oracle price values to zero: an unknown
/// price can justify neither seizing collateral nor repaying debt, so
/// zero keeps unpriced assets out of every comparison downstream.
pub fn reference_value(
    balance: &MonetaryAmount,
    rate: Option<&ExchangeRate>,
    reference: &Currency,
) -> MonetaryAmount {
    let Some(rate) = rate else {
        return MonetaryAmount::zero(reference.clone());
    };
    if rate.base() != reference {
        return MonetaryAmount::zero(reference.clone());
    }
    rate.to_base(balance)
        .unwrap_or_else(|_| MonetaryAmount::zero(reference.clone()))
}

/// Pick the borrower's collateral position with the greatest reference
/// value.
///
/// Returns `None` on an empty list. Ties keep the earliest-seen
/// position, so the choice is deterministic in the chain's reporting
/// order.
pub fn find_highest_value_collateral(
    positions: &[CollateralPosition],
    rates: &HashMap<CurrencyId, ExchangeRate>,
    reference: &Currency,
) -> Option<CollateralAndValue> {
    let mut best: Option<CollateralAndValue> = None;
    for position in positions {
        let value = reference_value(
            &position.amount,
            rates.get(position.amount.currency().id()),
            reference,
        );
        let replace = match &best {
            None => true,
            Some(current) => value > current.reference_value,
        };
        if replace {
            best = Some(CollateralAndValue {
                collateral: position.amount.clone(),
                reference_value: value,
            });
        }
    }
    best
}

/// Select the single most valuable profitable liquidation, if any.
///
/// For each undercollateralized borrower and each of their borrow
/// positions:
/// - the repayable amount is `total debt × close factor`, capped by the
///   liquidator's free balance in the debt currency;
/// - the candidate is discarded unless the borrower's best collateral
///   covers the repayment plus the market's liquidation incentive
///   (profitability is a hard gate, not a tie-break);
/// - among surviving candidates the greatest reference repayment value
///   wins, first-encountered on ties.
pub fn liquidation_strategy(
    liquidator_balance: &HashMap<CurrencyId, ChainBalance>,
    oracle_rates: &HashMap<CurrencyId, ExchangeRate>,
    undercollateralized_borrowers: &[UndercollateralizedPosition],
    markets: &HashMap<CurrencyId, LoansMarket>,
    reference: &Currency,
) -> Option<LiquidationOpportunity> {
    let mut best: Option<LiquidationOpportunity> = None;
    let mut best_reference_value = MonetaryAmount::zero(reference.clone());

    for position in undercollateralized_borrowers {
        let Some(highest_value_collateral) =
            find_highest_value_collateral(&position.collateral_positions, oracle_rates, reference)
        else {
            // No collateral locked should be impossible for a flagged
            // borrower, but must not fail the scan.
            continue;
        };

        for loan in &position.borrow_positions {
            let Ok(total_debt) = loan.total_debt() else {
                continue;
            };
            let debt_currency = total_debt.currency().id().clone();

            // Cannot repay a currency the liquidator does not hold.
            let Some(balance) = liquidator_balance.get(&debt_currency) else {
                continue;
            };
            let Some(market) = markets.get(&debt_currency) else {
                continue;
            };

            // Only a fraction of the debt is repayable in one call.
            let capped = total_debt.mul_permill(market.close_factor);
            let Ok(repayable) = capped.min(&balance.free) else {
                continue;
            };

            let reference_repayable = reference_value(
                &repayable,
                oracle_rates.get(&debt_currency),
                reference,
            );

            // The collateral seized, at its current price, must cover
            // the repayment plus the liquidator's premium.
            let premium_adjusted = reference_repayable.mul_wad(market.liquidation_incentive);
            if highest_value_collateral.reference_value < premium_adjusted {
                continue;
            }

            if reference_repayable > best_reference_value {
                best_reference_value = reference_repayable;
                best = Some(LiquidationOpportunity {
                    repay: repayable,
                    collateral_currency: highest_value_collateral.collateral.currency().clone(),
                    borrower: position.account_id,
                });
            }
        }
    }

    best
}
