//! In-memory chain backend.
//!
//! Implements the `LendingChain` boundary over scenario state so the bot
//! can be exercised end to end without a node: markets and borrowers are
//! seeded from a scenario, exchange rates can be moved at will, and a
//! liquidation call mutates balances and emits the same event the real
//! chain would. The risk check mirrors the protocol's rule: a borrower
//! is liquidatable once threshold-adjusted collateral value falls below
//! total debt value, both in the wrapped currency.

use alloy::primitives::U256;
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use liquidator_core::{
    fixed_math, reference_value, AccountId, BlockHeader, BorrowPosition, ChainBalance, ChainError,
    ChainResult, CollateralPosition, Currency, CurrencyId, ExchangeRate, LendingChain,
    LiquidationEvent, LoansMarket, MonetaryAmount, UndercollateralizedPosition,
};

use crate::scenario::ResolvedScenario;

/// Mutable borrower state behind the risk engine.
#[derive(Debug, Clone)]
struct BorrowerState {
    account: AccountId,
    collateral: Vec<MonetaryAmount>,
    borrows: Vec<BorrowPosition>,
}

pub struct SimChain {
    wrapped: Currency,
    governance: Currency,
    relay: Currency,
    /// The bot's signing account; all submissions are attributed to it.
    signer: AccountId,
    foreign: RwLock<Vec<Currency>>,
    balances: DashMap<(AccountId, CurrencyId), MonetaryAmount>,
    rates: DashMap<CurrencyId, U256>,
    markets: DashMap<CurrencyId, LoansMarket>,
    borrowers: RwLock<Vec<BorrowerState>>,
    head_subscribers: Mutex<Vec<mpsc::Sender<BlockHeader>>>,
    event_subscribers: Mutex<Vec<mpsc::UnboundedSender<LiquidationEvent>>>,
    block_number: AtomicU64,
}

impl SimChain {
    pub fn from_scenario(scenario: ResolvedScenario) -> Arc<Self> {
        let chain = Self {
            wrapped: scenario.wrapped,
            governance: scenario.governance,
            relay: scenario.relay,
            signer: scenario.liquidator_account,
            foreign: RwLock::new(scenario.foreign_assets),
            balances: DashMap::new(),
            rates: DashMap::new(),
            markets: DashMap::new(),
            borrowers: RwLock::new(Vec::new()),
            head_subscribers: Mutex::new(Vec::new()),
            event_subscribers: Mutex::new(Vec::new()),
            block_number: AtomicU64::new(0),
        };

        for free in scenario.liquidator_balances {
            chain.balances.insert(
                (scenario.liquidator_account, free.currency().id().clone()),
                free,
            );
        }
        for (currency, market) in scenario.markets {
            chain.markets.insert(currency.id().clone(), market);
        }
        for (currency, rate_wad) in scenario.rates {
            chain.rates.insert(currency.id().clone(), rate_wad);
        }
        {
            let mut borrowers = chain.borrowers.write();
            for position in scenario.borrowers {
                borrowers.push(BorrowerState {
                    account: position.account_id,
                    collateral: position
                        .collateral_positions
                        .into_iter()
                        .map(|c| c.amount)
                        .collect(),
                    borrows: position.borrow_positions.into_vec(),
                });
            }
        }

        Arc::new(chain)
    }

    /// Produce one block and notify subscribers.
    pub fn produce_block(&self) -> BlockHeader {
        let header = BlockHeader {
            number: self.block_number.fetch_add(1, Ordering::SeqCst) + 1,
        };
        self.head_subscribers.lock().retain(|sender| {
            // A full buffer is a slow subscriber, not a dead one
            !matches!(
                sender.try_send(header),
                Err(mpsc::error::TrySendError::Closed(_))
            )
        });
        header
    }

    /// Produce blocks on a fixed interval until the task is aborted.
    pub fn spawn_block_producer(self: &Arc<Self>, block_time: Duration) -> JoinHandle<()> {
        let chain = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(block_time);
            loop {
                ticker.tick().await;
                let header = chain.produce_block();
                debug!(block = header.number, "Produced block");
            }
        })
    }

    /// Replace the oracle rate for a currency (atomic-per-atomic WAD
    /// ratio into the wrapped currency).
    pub fn set_exchange_rate(&self, currency: &Currency, rate_wad: U256) {
        self.rates.insert(currency.id().clone(), rate_wad);
    }

    /// Remove a currency's oracle price entirely.
    pub fn clear_exchange_rate(&self, currency: &Currency) {
        self.rates.remove(currency.id());
    }

    /// Register a bridged asset at runtime.
    pub fn register_foreign_asset(&self, currency: Currency) {
        self.foreign.write().push(currency);
    }

    pub fn free_balance(&self, account: &AccountId, currency: &Currency) -> MonetaryAmount {
        self.balances
            .get(&(*account, currency.id().clone()))
            .map(|entry| entry.value().clone())
            .unwrap_or_else(|| MonetaryAmount::zero(currency.clone()))
    }

    fn rate_for(&self, currency: &Currency) -> Option<ExchangeRate> {
        self.rates.get(currency.id()).map(|entry| {
            ExchangeRate::new(currency.clone(), self.wrapped.clone(), *entry.value())
        })
    }

    /// Threshold-adjusted collateral value minus check against debt
    /// value, the protocol's liquidation condition.
    fn is_undercollateralized(&self, state: &BorrowerState) -> bool {
        let mut adjusted_collateral = U256::ZERO;
        for amount in &state.collateral {
            let value = reference_value(
                amount,
                self.rate_for(amount.currency()).as_ref(),
                &self.wrapped,
            );
            let threshold = self
                .markets
                .get(amount.currency().id())
                .map(|market| market.liquidation_threshold.parts())
                .unwrap_or(0);
            adjusted_collateral += fixed_math::permill_mul(value.amount(), threshold);
        }

        let mut debt = U256::ZERO;
        for borrow in &state.borrows {
            let Ok(total) = borrow.total_debt() else {
                continue;
            };
            let value = reference_value(
                &total,
                self.rate_for(total.currency()).as_ref(),
                &self.wrapped,
            );
            debt += value.amount();
        }

        !debt.is_zero() && adjusted_collateral < debt
    }

    fn credit(&self, account: &AccountId, amount: &MonetaryAmount) {
        let key = (*account, amount.currency().id().clone());
        let current = self
            .balances
            .get(&key)
            .map(|entry| entry.value().amount())
            .unwrap_or(U256::ZERO);
        self.balances.insert(
            key,
            MonetaryAmount::new(amount.currency().clone(), current + amount.amount()),
        );
    }

    fn emit(&self, event: LiquidationEvent) {
        self.event_subscribers
            .lock()
            .retain(|sender| sender.send(event.clone()).is_ok());
    }
}

#[async_trait]
impl LendingChain for SimChain {
    fn wrapped_currency(&self) -> Currency {
        self.wrapped.clone()
    }

    fn governance_currency(&self) -> Currency {
        self.governance.clone()
    }

    fn relay_chain_currency(&self) -> Currency {
        self.relay.clone()
    }

    async fn foreign_assets(&self) -> ChainResult<Vec<Currency>> {
        Ok(self.foreign.read().clone())
    }

    async fn balance(
        &self,
        currency: &Currency,
        account: &AccountId,
    ) -> ChainResult<ChainBalance> {
        Ok(ChainBalance::from_free(self.free_balance(account, currency)))
    }

    async fn exchange_rate(&self, currency: &Currency) -> ChainResult<Option<ExchangeRate>> {
        Ok(self.rate_for(currency))
    }

    async fn undercollateralized_borrowers(
        &self,
    ) -> ChainResult<Vec<UndercollateralizedPosition>> {
        let borrowers = self.borrowers.read();
        Ok(borrowers
            .iter()
            .filter(|state| self.is_undercollateralized(state))
            .map(|state| {
                UndercollateralizedPosition::new(
                    state.account,
                    state
                        .collateral
                        .iter()
                        .cloned()
                        .map(CollateralPosition::new),
                    state.borrows.iter().cloned(),
                )
            })
            .collect())
    }

    async fn loans_markets(&self) -> ChainResult<Vec<(CurrencyId, LoansMarket)>> {
        Ok(self
            .markets
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect())
    }

    async fn liquidate_borrow_position(
        &self,
        borrower: &AccountId,
        amount: MonetaryAmount,
        collateral_currency: &Currency,
    ) -> ChainResult<()> {
        let liquidator = self.signer;

        let borrowers = self.borrowers.read();
        // Re-run the risk check at execution time: a competing
        // liquidation or a price move may have healed the position.
        let snapshot = borrowers
            .iter()
            .find(|state| state.account == *borrower)
            .cloned()
            .ok_or_else(|| ChainError::Rejected("unknown borrower".to_string()))?;
        drop(borrowers);
        if !self.is_undercollateralized(&snapshot) {
            return Err(ChainError::Rejected("borrower not liquidatable".to_string()));
        }

        let mut borrowers = self.borrowers.write();
        let state = borrowers
            .iter_mut()
            .find(|state| state.account == *borrower)
            .ok_or_else(|| ChainError::Rejected("unknown borrower".to_string()))?;

        let market = self
            .markets
            .get(amount.currency().id())
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ChainError::Rejected("no market for debt currency".to_string()))?;

        // Debit the repayment from the liquidator.
        let free = self.free_balance(&liquidator, amount.currency());
        if free.amount() < amount.amount() {
            return Err(ChainError::Rejected("insufficient balance".to_string()));
        }
        self.balances.insert(
            (liquidator, amount.currency().id().clone()),
            MonetaryAmount::new(amount.currency().clone(), free.amount() - amount.amount()),
        );

        // Reduce the borrower's debt, interest first.
        let mut remaining = amount.amount();
        for borrow in state
            .borrows
            .iter_mut()
            .filter(|b| b.amount.currency() == amount.currency())
        {
            let accrued = borrow.accumulated_debt.amount();
            let from_accrued = fixed_math::min(accrued, remaining);
            borrow.accumulated_debt = MonetaryAmount::new(
                amount.currency().clone(),
                accrued - from_accrued,
            );
            remaining -= from_accrued;

            let principal = borrow.amount.amount();
            let from_principal = fixed_math::min(principal, remaining);
            borrow.amount = MonetaryAmount::new(
                amount.currency().clone(),
                principal - from_principal,
            );
            remaining -= from_principal;
        }

        // Seize premium-adjusted collateral at current prices.
        let repaid_value = reference_value(
            &amount,
            self.rate_for(amount.currency()).as_ref(),
            &self.wrapped,
        );
        let premium_value =
            fixed_math::wad_mul(repaid_value.amount(), market.liquidation_incentive);
        let collateral_rate = self
            .rates
            .get(collateral_currency.id())
            .map(|entry| *entry.value())
            .ok_or_else(|| ChainError::Rejected("no price for collateral".to_string()))?;
        let seize_target = fixed_math::wad_div(premium_value, collateral_rate);

        let seized = state
            .collateral
            .iter_mut()
            .find(|c| c.currency() == collateral_currency)
            .map(|held| {
                let take = fixed_math::min(held.amount(), seize_target);
                *held = MonetaryAmount::new(collateral_currency.clone(), held.amount() - take);
                MonetaryAmount::new(collateral_currency.clone(), take)
            })
            .ok_or_else(|| ChainError::Rejected("borrower holds no such collateral".to_string()))?;
        self.credit(&liquidator, &seized);
        drop(borrowers);

        info!(
            borrower = %borrower,
            repaid = %amount,
            seized = %seized,
            "Simulated liquidation"
        );
        self.emit(LiquidationEvent {
            borrower: *borrower,
            liquidator,
            repaid: amount,
            collateral_currency: collateral_currency.clone(),
        });
        Ok(())
    }

    async fn subscribe_new_heads(&self) -> ChainResult<mpsc::Receiver<BlockHeader>> {
        let (sender, receiver) = mpsc::channel(64);
        self.head_subscribers.lock().push(sender);
        Ok(receiver)
    }

    async fn subscribe_liquidations(
        &self,
    ) -> ChainResult<mpsc::UnboundedReceiver<LiquidationEvent>> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.event_subscribers.lock().push(sender);
        Ok(receiver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::Scenario;
    use liquidator_core::{fixed_math::WAD, wait_for_liquidation};

    const SCENARIO: &str = r#"
        [[currencies]]
        kind = "token"
        symbol = "WBTC"
        decimals = 8

        [[currencies]]
        kind = "token"
        symbol = "GOV"
        decimals = 12

        [[currencies]]
        kind = "token"
        symbol = "DOT"
        decimals = 10

        [[currencies]]
        kind = "foreign_asset"
        asset_id = 1
        symbol = "USDT"
        decimals = 6

        [natives]
        wrapped = "WBTC"
        governance = "GOV"
        relay = "DOT"

        [liquidator]
        account = "0x0101010101010101010101010101010101010101010101010101010101010101"

        [[liquidator.balances]]
        currency = "USDT"
        free = "1000"

        [[markets]]
        currency = "USDT"
        close_factor_ppm = 500000
        liquidation_incentive_wad = "1100000000000000000"
        liquidation_threshold_ppm = 550000

        [[markets]]
        currency = "DOT"
        close_factor_ppm = 500000
        liquidation_incentive_wad = "1100000000000000000"
        liquidation_threshold_ppm = 550000

        [[rates]]
        currency = "USDT"
        rate_wad = "1000000000000000000"

        [[rates]]
        currency = "DOT"
        rate_wad = "1000000000000000000"

        [[borrowers]]
        account = "0x0202020202020202020202020202020202020202020202020202020202020202"

        [[borrowers.collateral]]
        currency = "DOT"
        amount = "100"

        [[borrowers.borrows]]
        currency = "USDT"
        principal = "40"
    "#;

    fn dot() -> Currency {
        Currency::token("DOT", 10)
    }

    fn usdt() -> Currency {
        Currency::foreign_asset(1, "USDT", 6)
    }

    fn borrower() -> AccountId {
        AccountId::new([2u8; 32])
    }

    fn liquidator() -> AccountId {
        AccountId::new([1u8; 32])
    }

    #[tokio::test]
    async fn test_healthy_borrower_is_not_flagged() {
        // adjusted collateral 100 * 55% = 55 >= debt 40
        let chain = SimChain::from_scenario(Scenario::from_toml(SCENARIO).unwrap());
        assert!(chain.undercollateralized_borrowers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rate_crash_flags_borrower() {
        let chain = SimChain::from_scenario(Scenario::from_toml(SCENARIO).unwrap());
        // halve the DOT price: adjusted collateral 50 * 55% = 27 < 40
        chain.set_exchange_rate(&dot(), WAD / U256::from(2u64));

        let flagged = chain.undercollateralized_borrowers().await.unwrap();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].account_id, borrower());
    }

    #[tokio::test]
    async fn test_liquidation_of_healthy_borrower_is_rejected() {
        let chain = SimChain::from_scenario(Scenario::from_toml(SCENARIO).unwrap());
        let result = chain
            .liquidate_borrow_position(
                &borrower(),
                MonetaryAmount::new(usdt(), U256::from(20u64)),
                &dot(),
            )
            .await;
        assert!(matches!(result, Err(ChainError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_liquidation_moves_balances_and_emits_event() {
        let chain = SimChain::from_scenario(Scenario::from_toml(SCENARIO).unwrap());
        chain.set_exchange_rate(&dot(), WAD / U256::from(2u64));

        // Subscription is buffered, so subscribing before the call is
        // enough to observe the event afterwards.
        let mut events = chain.subscribe_liquidations().await.unwrap();

        chain
            .liquidate_borrow_position(
                &borrower(),
                MonetaryAmount::new(usdt(), U256::from(20u64)),
                &dot(),
            )
            .await
            .unwrap();

        // repayment debited
        assert_eq!(
            chain.free_balance(&liquidator(), &usdt()).amount(),
            U256::from(980u64)
        );
        // premium-adjusted collateral seized: 20 * 1.1 = 22 reference,
        // at a 0.5 rate that is 44 DOT
        assert_eq!(
            chain.free_balance(&liquidator(), &dot()).amount(),
            U256::from(44u64)
        );
        assert!(
            wait_for_liquidation(&mut events, &borrower(), Duration::from_secs(1)).await
        );
    }

    #[tokio::test]
    async fn test_produce_block_reaches_subscribers() {
        let chain = SimChain::from_scenario(Scenario::from_toml(SCENARIO).unwrap());
        let mut heads = chain.subscribe_new_heads().await.unwrap();
        let header = chain.produce_block();
        assert_eq!(heads.recv().await.unwrap(), header);
    }
}
