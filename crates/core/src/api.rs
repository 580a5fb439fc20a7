//! Boundary to the external chain client SDK.
//!
//! Everything the bot knows about the chain comes through
//! [`LendingChain`]: balance and oracle queries, the risk engine's
//! undercollateralized-borrower snapshot, market parameters, block
//! subscription, and liquidation submission. The trait is the seam
//! between the pure selection logic and whatever client implements the
//! actual wire protocol.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::account::{AccountId, ChainBalance};
use crate::currency::{Currency, CurrencyId};
use crate::market::LoansMarket;
use crate::monetary::{ExchangeRate, MonetaryAmount};
use crate::position::UndercollateralizedPosition;

/// Errors surfaced by a chain backend.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("chain connection lost")]
    Disconnected,
    #[error("rpc failure: {0}")]
    Rpc(String),
    #[error("extrinsic rejected: {0}")]
    Rejected(String),
}

pub type ChainResult<T> = Result<T, ChainError>;

/// A new chain block, as delivered by the header subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub number: u64,
}

/// On-chain event emitted when a borrow position is liquidated, by this
/// bot or by anyone else.
#[derive(Debug, Clone)]
pub struct LiquidationEvent {
    pub borrower: AccountId,
    pub liquidator: AccountId,
    pub repaid: MonetaryAmount,
    pub collateral_currency: Currency,
}

/// Client SDK surface consumed by the scheduler and executor.
///
/// All methods take `&self`; implementations are expected to be shared
/// behind an `Arc` across concurrently running evaluation cycles.
#[async_trait]
pub trait LendingChain: Send + Sync {
    /// The bridge's wrapped Bitcoin token; doubles as the reference
    /// currency for all value comparisons.
    fn wrapped_currency(&self) -> Currency;

    /// The chain's governance token.
    fn governance_currency(&self) -> Currency;

    /// The relay chain's token.
    fn relay_chain_currency(&self) -> Currency;

    /// Bridged assets currently registered on chain. New assets may
    /// appear at any time.
    async fn foreign_assets(&self) -> ChainResult<Vec<Currency>>;

    /// Free/reserved balance of `account` in `currency`.
    async fn balance(&self, currency: &Currency, account: &AccountId)
        -> ChainResult<ChainBalance>;

    /// Oracle rate from `currency` into the wrapped currency. `None`
    /// when no price is currently active, which is a valid state.
    async fn exchange_rate(&self, currency: &Currency) -> ChainResult<Option<ExchangeRate>>;

    /// Risk-engine snapshot of borrowers eligible for liquidation.
    async fn undercollateralized_borrowers(
        &self,
    ) -> ChainResult<Vec<UndercollateralizedPosition>>;

    /// Parameters of all active lending markets, keyed by underlying
    /// currency.
    async fn loans_markets(&self) -> ChainResult<Vec<(CurrencyId, LoansMarket)>>;

    /// Submit a liquidation: repay `amount` of `borrower`'s debt in
    /// `amount`'s currency, seizing collateral in `collateral_currency`.
    async fn liquidate_borrow_position(
        &self,
        borrower: &AccountId,
        amount: MonetaryAmount,
        collateral_currency: &Currency,
    ) -> ChainResult<()>;

    /// Subscribe to new block headers. The channel closing signals a
    /// lost connection and is fatal to the scheduler.
    async fn subscribe_new_heads(&self) -> ChainResult<mpsc::Receiver<BlockHeader>>;

    /// Subscribe to liquidation events. Events are buffered from the
    /// moment of subscription, so subscribing before submitting a
    /// transaction cannot miss its own event.
    async fn subscribe_liquidations(
        &self,
    ) -> ChainResult<mpsc::UnboundedReceiver<LiquidationEvent>>;
}

/// Drain a liquidation subscription until `borrower` is seen liquidated
/// or the timeout elapses. Returns whether the event was observed.
pub async fn wait_for_liquidation(
    events: &mut mpsc::UnboundedReceiver<LiquidationEvent>,
    borrower: &AccountId,
    timeout: Duration,
) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        match tokio::time::timeout_at(deadline, events.recv()).await {
            Ok(Some(event)) if event.borrower == *borrower => return true,
            Ok(Some(_)) => continue,
            // Sender gone or deadline hit
            Ok(None) | Err(_) => return false,
        }
    }
}
