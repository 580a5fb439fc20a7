//! Block-driven evaluation loop.
//!
//! One evaluation cycle per block header: fetch the snapshot (balances,
//! oracle rates, borrowers, markets) concurrently, run the pure
//! selection strategy over it, and hand at most one opportunity to the
//! executor. Cycles are spawned as independent tasks and may overlap a
//! slow predecessor; the chain itself arbitrates racing liquidations.

use anyhow::Result;
use futures::future;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::account::AccountId;
use crate::api::{BlockHeader, LendingChain};
use crate::currency::{Currency, CurrencyId};
use crate::executor::LiquidationExecutor;
use crate::market::LoansMarket;
use crate::strategy::liquidation_strategy;

pub struct Scheduler {
    chain: Arc<dyn LendingChain>,
    executor: Arc<LiquidationExecutor>,
    account: AccountId,
    /// Currencies scanned each cycle. Grows when new bridged assets are
    /// registered; the only state carried across cycles.
    chain_assets: Arc<RwLock<HashSet<Currency>>>,
}

impl Scheduler {
    pub fn new(
        chain: Arc<dyn LendingChain>,
        executor: Arc<LiquidationExecutor>,
        account: AccountId,
    ) -> Self {
        Self {
            chain,
            executor,
            account,
            chain_assets: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    /// Seed the asset set with the chain's native currencies and the
    /// currently registered bridged assets.
    pub async fn bootstrap(&self) -> Result<()> {
        let native = [
            self.chain.wrapped_currency(),
            self.chain.governance_currency(),
            self.chain.relay_chain_currency(),
        ];
        let foreign = self.chain.foreign_assets().await?;

        let mut assets = self.chain_assets.write();
        assets.extend(native);
        assets.extend(foreign);
        info!(asset_count = assets.len(), "Asset set initialized");
        Ok(())
    }

    /// Consume the block-header subscription until it closes.
    ///
    /// A closed subscription means the connection is gone; per-cycle
    /// failures are logged and the loop moves on to the next block.
    pub async fn run(&self) -> Result<()> {
        let mut heads = self.chain.subscribe_new_heads().await?;
        info!("Listening to new blocks...");

        while let Some(header) = heads.recv().await {
            let chain = Arc::clone(&self.chain);
            let executor = Arc::clone(&self.executor);
            let assets = Arc::clone(&self.chain_assets);
            let account = self.account;
            tokio::spawn(async move {
                if let Err(e) = run_cycle(chain, assets, account, executor, header).await {
                    warn!(block = header.number, error = %e, "Evaluation cycle failed");
                }
            });
        }

        info!("Block subscription ended");
        Ok(())
    }
}

/// One full evaluation over a fresh snapshot of chain state.
async fn run_cycle(
    chain: Arc<dyn LendingChain>,
    assets: Arc<RwLock<HashSet<Currency>>>,
    account: AccountId,
    executor: Arc<LiquidationExecutor>,
    header: BlockHeader,
) -> Result<()> {
    debug!(block = header.number, "Scanning block");
    let snapshot: Vec<Currency> = assets.read().iter().cloned().collect();
    let reference = chain.wrapped_currency();

    let balances_fut = future::join_all(snapshot.iter().map(|currency| {
        let chain = Arc::clone(&chain);
        async move {
            (
                currency.id().clone(),
                chain.balance(currency, &account).await,
            )
        }
    }));
    let rates_fut = future::join_all(snapshot.iter().map(|currency| {
        let chain = Arc::clone(&chain);
        async move { (currency.id().clone(), chain.exchange_rate(currency).await) }
    }));

    let (balance_results, rate_results, borrowers, markets, foreign) = tokio::join!(
        balances_fut,
        rates_fut,
        chain.undercollateralized_borrowers(),
        chain.loans_markets(),
        chain.foreign_assets(),
    );

    let mut liquidator_balance = HashMap::new();
    for (id, result) in balance_results {
        liquidator_balance.insert(id, result?);
    }
    let mut oracle_rates = HashMap::new();
    for (id, result) in rate_results {
        if let Some(rate) = result? {
            oracle_rates.insert(id, rate);
        }
    }
    let borrowers = borrowers?;
    let markets: HashMap<CurrencyId, LoansMarket> = markets?.into_iter().collect();

    info!(
        block = header.number,
        undercollateralized = borrowers.len(),
        "Scanned block"
    );

    if let Some(opportunity) = liquidation_strategy(
        &liquidator_balance,
        &oracle_rates,
        &borrowers,
        &markets,
        &reference,
    ) {
        info!(
            block = header.number,
            borrower = %opportunity.borrower,
            repay = %opportunity.repay,
            collateral = %opportunity.collateral_currency,
            "Liquidating"
        );
        executor.execute(&opportunity).await?;
    }

    // Pick up bridged assets registered since the last cycle.
    let foreign = foreign?;
    let mut set = assets.write();
    for currency in foreign {
        set.insert(currency);
    }

    Ok(())
}
