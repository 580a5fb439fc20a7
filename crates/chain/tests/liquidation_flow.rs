//! End-to-end liquidation flow against the simulation backend.
//!
//! Mirrors the bot's production wiring: scheduler subscribed to block
//! headers, per-block snapshot scan, executor submitting through the
//! chain boundary. A healthy borrower is left alone; crashing the
//! collateral's exchange rate makes the next block's scan liquidate it.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::U256;
use liquidator_chain::{Scenario, SimChain};
use liquidator_core::{
    fixed_math::WAD, wait_for_liquidation, AccountId, Currency, LendingChain, LiquidationExecutor,
    Scheduler,
};

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

fn liquidator() -> AccountId {
    AccountId::new([1u8; 32])
}

fn borrower() -> AccountId {
    AccountId::new([2u8; 32])
}

/// Wire the full bot against a scenario and start its block loop.
async fn spawn_bot(scenario: &str) -> (Arc<SimChain>, tokio::task::JoinHandle<anyhow::Result<()>>) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let chain = SimChain::from_scenario(Scenario::from_toml(scenario).unwrap());
    let executor = Arc::new(LiquidationExecutor::new(
        chain.clone() as Arc<dyn LendingChain>,
        Duration::from_secs(1),
    ));
    let scheduler = Scheduler::new(
        chain.clone() as Arc<dyn LendingChain>,
        executor,
        liquidator(),
    );
    scheduler.bootstrap().await.unwrap();

    let loop_handle = tokio::spawn(async move { scheduler.run().await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    (chain, loop_handle)
}

#[tokio::test]
async fn liquidates_borrower_after_rate_crash() {
    let (chain, loop_handle) = spawn_bot(SCENARIO).await;

    // Healthy borrower: a block comes and goes without a liquidation.
    chain.produce_block();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(
        chain.free_balance(&liquidator(), &usdt()).amount(),
        U256::from(1000u64)
    );

    // Crash the collateral price; the next scan must liquidate:
    // adjusted collateral 100 * 0.5 * 55% = 27 < debt 40.
    chain.set_exchange_rate(&dot(), WAD / U256::from(2u64));

    let mut events = chain.subscribe_liquidations().await.unwrap();
    chain.produce_block();

    assert!(wait_for_liquidation(&mut events, &borrower(), Duration::from_secs(5)).await);

    // Close factor caps the repayment at 20 USDT; the premium (22
    // reference units at a 0.5 rate) seizes 44 DOT.
    assert_eq!(
        chain.free_balance(&liquidator(), &usdt()).amount(),
        U256::from(980u64)
    );
    assert_eq!(
        chain.free_balance(&liquidator(), &dot()).amount(),
        U256::from(44u64)
    );

    loop_handle.abort();
}

#[tokio::test]
async fn healed_borrower_is_left_alone() {
    let (chain, loop_handle) = spawn_bot(SCENARIO).await;

    // Crash and immediately restore the price before any block is
    // produced: the position is healthy again by the time it is scanned.
    chain.set_exchange_rate(&dot(), WAD / U256::from(2u64));
    chain.set_exchange_rate(&dot(), WAD);

    chain.produce_block();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(
        chain.free_balance(&liquidator(), &usdt()).amount(),
        U256::from(1000u64)
    );

    loop_handle.abort();
}

/// Same chain, but the borrower's debt is in a bridged asset that is
/// not yet registered at bootstrap: the bot cannot repay what it does
/// not scan, until the asset registration is picked up mid-run.
const LATE_ASSET_SCENARIO: &str = r#"
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
    asset_id = 2
    symbol = "USDC"
    decimals = 6
    registered = false

    [natives]
    wrapped = "WBTC"
    governance = "GOV"
    relay = "DOT"

    [liquidator]
    account = "0x0101010101010101010101010101010101010101010101010101010101010101"

    [[liquidator.balances]]
    currency = "USDC"
    free = "1000"

    [[markets]]
    currency = "USDC"
    close_factor_ppm = 500000
    liquidation_incentive_wad = "1100000000000000000"
    liquidation_threshold_ppm = 550000

    [[markets]]
    currency = "DOT"
    close_factor_ppm = 500000
    liquidation_incentive_wad = "1100000000000000000"
    liquidation_threshold_ppm = 550000

    [[rates]]
    currency = "USDC"
    rate_wad = "1000000000000000000"

    [[rates]]
    currency = "DOT"
    rate_wad = "500000000000000000"

    [[borrowers]]
    account = "0x0202020202020202020202020202020202020202020202020202020202020202"

    [[borrowers.collateral]]
    currency = "DOT"
    amount = "100"

    [[borrowers.borrows]]
    currency = "USDC"
    principal = "40"
"#;

#[tokio::test]
async fn newly_registered_foreign_asset_is_scanned() {
    let (chain, loop_handle) = spawn_bot(LATE_ASSET_SCENARIO).await;
    let usdc = Currency::foreign_asset(2, "USDC", 6);

    // The borrower is already underwater (adjusted collateral
    // 100 * 0.5 * 55% = 27 < debt 40), but the debt currency is not in
    // the scanned set, so there is nothing the bot can repay with.
    chain.produce_block();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(
        chain.free_balance(&liquidator(), &usdc).amount(),
        U256::from(1000u64)
    );

    // Register the asset; the next cycle merges it into the scanned
    // set, and the cycle after that can finally liquidate.
    chain.register_foreign_asset(usdc.clone());
    chain.produce_block();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut events = chain.subscribe_liquidations().await.unwrap();
    chain.produce_block();

    assert!(wait_for_liquidation(&mut events, &borrower(), Duration::from_secs(5)).await);
    assert_eq!(
        chain.free_balance(&liquidator(), &usdc).amount(),
        U256::from(980u64)
    );

    loop_handle.abort();
}
