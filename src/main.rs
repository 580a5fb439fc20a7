//! Lending Liquidator Bot
//!
//! Long-running liquidation bot for the bridge chain's lending markets.
//! Per block: fetch a fresh snapshot of balances, oracle rates,
//! undercollateralized borrowers, and market parameters, pick the single
//! most profitable liquidation, and submit it. Chain access goes through
//! the `LendingChain` boundary; this binary wires the simulation backend
//! driven by a scenario file.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use liquidator_chain::{Scenario, SimChain};
use liquidator_core::{AccountId, BotConfig, LendingChain, LiquidationExecutor, Scheduler};

/// Environment variable names.
mod env {
    pub const SCENARIO: &str = "LIQUIDATOR_SCENARIO";
    pub const ACCOUNT: &str = "LIQUIDATOR_ACCOUNT";
}

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,liquidator_core=debug,liquidator_chain=debug")),
        )
        .init();

    let bot_config = BotConfig::from_env()?;
    bot_config.log_config();

    let config = load_config()?;
    info!(scenario = %config.scenario_path, "Loading chain scenario");
    let scenario = Scenario::from_path(&config.scenario_path)?;
    let account = config.account.unwrap_or(scenario.liquidator_account);
    info!(account = %account, "Bot account");

    let chain = SimChain::from_scenario(scenario);
    let _producer = chain.spawn_block_producer(bot_config.block_time());

    let executor = Arc::new(LiquidationExecutor::new(
        chain.clone() as Arc<dyn LendingChain>,
        bot_config.event_timeout(),
    ));
    let scheduler = Scheduler::new(chain as Arc<dyn LendingChain>, executor, account);

    info!("Starting lending liquidator...");
    scheduler.bootstrap().await?;
    scheduler.run().await?;

    Ok(())
}

/// Wiring loaded from environment.
struct Config {
    scenario_path: String,
    account: Option<AccountId>,
}

fn load_config() -> Result<Config> {
    let scenario_path = std::env::var(env::SCENARIO)
        .map_err(|_| anyhow::anyhow!("Missing env var: {}", env::SCENARIO))?;

    let account = match std::env::var(env::ACCOUNT) {
        Ok(raw) => Some(
            raw.parse()
                .map_err(|e| anyhow::anyhow!("Invalid {}: {}", env::ACCOUNT, e))?,
        ),
        Err(_) => None,
    };

    Ok(Config {
        scenario_path,
        account,
    })
}

/// Print startup banner.
fn print_banner() {
    println!(
        r#"
    ┬  ┌─┐┌┐┌┌┬┐┬┌┐┌┌─┐  ┬  ┬┌─┐ ┬ ┬┬┌┬┐┌─┐┌┬┐┌─┐┬─┐
    │  ├┤ │││ │││││││ ┬  │  ││─┼┐│ ││ ││├─┤ │ │ │├┬┘
    ┴─┘└─┘┘└┘─┴┘┴┘└┘└─┘  ┴─┘┴└─┘└└─┘┴─┴┘┴ ┴ ┴ └─┘┴└─
    Lending Liquidator v0.1.0
    "#
    );
}
