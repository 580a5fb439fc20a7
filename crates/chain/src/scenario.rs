//! TOML scenario files for the simulation backend.
//!
//! A scenario declares the chain's currencies, lending markets, oracle
//! rates, the liquidator's balances, and borrower positions. Amount and
//! ratio fields are decimal strings because atomic magnitudes routinely
//! exceed what TOML integers can carry.

use alloy::primitives::U256;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use liquidator_core::{
    AccountId, BorrowPosition, CollateralPosition, Currency, LoansMarket, MonetaryAmount, Permill,
    UndercollateralizedPosition,
};

#[derive(Debug, Deserialize)]
pub struct Scenario {
    pub currencies: Vec<CurrencyDef>,
    pub natives: NativesDef,
    pub liquidator: LiquidatorDef,
    #[serde(default)]
    pub markets: Vec<MarketDef>,
    #[serde(default)]
    pub rates: Vec<RateDef>,
    #[serde(default)]
    pub borrowers: Vec<BorrowerDef>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CurrencyDef {
    Token {
        symbol: String,
        decimals: u8,
    },
    ForeignAsset {
        asset_id: u32,
        symbol: String,
        decimals: u8,
        /// Whether the asset is already registered on chain at genesis.
        /// Unregistered assets only enter the bot's scanned set once
        /// `SimChain::register_foreign_asset` is called.
        #[serde(default = "default_registered")]
        registered: bool,
    },
}

fn default_registered() -> bool {
    true
}

/// The chain's native currencies, referenced by symbol.
#[derive(Debug, Deserialize)]
pub struct NativesDef {
    pub wrapped: String,
    pub governance: String,
    pub relay: String,
}

#[derive(Debug, Deserialize)]
pub struct LiquidatorDef {
    pub account: String,
    #[serde(default)]
    pub balances: Vec<BalanceDef>,
}

#[derive(Debug, Deserialize)]
pub struct BalanceDef {
    pub currency: String,
    pub free: String,
}

#[derive(Debug, Deserialize)]
pub struct MarketDef {
    pub currency: String,
    pub close_factor_ppm: u32,
    pub liquidation_incentive_wad: String,
    pub liquidation_threshold_ppm: u32,
}

/// Oracle rate into the wrapped currency, atomic-per-atomic, WAD-scaled.
#[derive(Debug, Deserialize)]
pub struct RateDef {
    pub currency: String,
    pub rate_wad: String,
}

#[derive(Debug, Deserialize)]
pub struct BorrowerDef {
    pub account: String,
    #[serde(default)]
    pub collateral: Vec<CollateralDef>,
    #[serde(default)]
    pub borrows: Vec<BorrowDef>,
}

#[derive(Debug, Deserialize)]
pub struct CollateralDef {
    pub currency: String,
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct BorrowDef {
    pub currency: String,
    pub principal: String,
    #[serde(default)]
    pub accumulated: Option<String>,
}

/// Fully resolved scenario, ready to seed the simulation backend.
#[derive(Debug)]
pub struct ResolvedScenario {
    pub wrapped: Currency,
    pub governance: Currency,
    pub relay: Currency,
    pub foreign_assets: Vec<Currency>,
    pub liquidator_account: AccountId,
    pub liquidator_balances: Vec<MonetaryAmount>,
    pub markets: Vec<(Currency, LoansMarket)>,
    pub rates: Vec<(Currency, U256)>,
    pub borrowers: Vec<UndercollateralizedPosition>,
}

impl Scenario {
    pub fn from_path(path: impl AsRef<Path>) -> Result<ResolvedScenario> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<ResolvedScenario> {
        let scenario: Scenario = toml::from_str(raw).context("failed to parse scenario")?;
        scenario.resolve()
    }

    fn resolve(self) -> Result<ResolvedScenario> {
        let mut by_symbol: HashMap<String, Currency> = HashMap::new();
        let mut foreign_assets = Vec::new();

        for def in &self.currencies {
            let currency = match def {
                CurrencyDef::Token { symbol, decimals } => Currency::token(symbol, *decimals),
                CurrencyDef::ForeignAsset {
                    asset_id,
                    symbol,
                    decimals,
                    registered,
                } => {
                    let currency = Currency::foreign_asset(*asset_id, symbol.clone(), *decimals);
                    if *registered {
                        foreign_assets.push(currency.clone());
                    }
                    currency
                }
            };
            let symbol = currency.symbol().to_string();
            if by_symbol.insert(symbol.clone(), currency).is_some() {
                bail!("duplicate currency symbol {symbol:?}");
            }
        }

        let lookup = |symbol: &str| -> Result<Currency> {
            by_symbol
                .get(symbol)
                .cloned()
                .with_context(|| format!("unknown currency {symbol:?}"))
        };

        let wrapped = lookup(&self.natives.wrapped)?;
        let governance = lookup(&self.natives.governance)?;
        let relay = lookup(&self.natives.relay)?;

        let liquidator_account = parse_account(&self.liquidator.account)?;
        let liquidator_balances = self
            .liquidator
            .balances
            .iter()
            .map(|b| Ok(MonetaryAmount::new(lookup(&b.currency)?, parse_u256(&b.free)?)))
            .collect::<Result<Vec<_>>>()?;

        let markets = self
            .markets
            .iter()
            .map(|m| {
                Ok((
                    lookup(&m.currency)?,
                    LoansMarket::new(
                        Permill::from_parts(m.close_factor_ppm),
                        parse_u256(&m.liquidation_incentive_wad)?,
                        Permill::from_parts(m.liquidation_threshold_ppm),
                    ),
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        let rates = self
            .rates
            .iter()
            .map(|r| Ok((lookup(&r.currency)?, parse_u256(&r.rate_wad)?)))
            .collect::<Result<Vec<_>>>()?;

        let borrowers = self
            .borrowers
            .iter()
            .map(|b| {
                let collateral = b
                    .collateral
                    .iter()
                    .map(|c| {
                        Ok(CollateralPosition::new(MonetaryAmount::new(
                            lookup(&c.currency)?,
                            parse_u256(&c.amount)?,
                        )))
                    })
                    .collect::<Result<Vec<_>>>()?;
                let borrows = b
                    .borrows
                    .iter()
                    .map(|l| {
                        let currency = lookup(&l.currency)?;
                        let accumulated = match &l.accumulated {
                            Some(raw) => parse_u256(raw)?,
                            None => U256::ZERO,
                        };
                        Ok(BorrowPosition::new(
                            MonetaryAmount::new(currency.clone(), parse_u256(&l.principal)?),
                            MonetaryAmount::new(currency, accumulated),
                        ))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(UndercollateralizedPosition::new(
                    parse_account(&b.account)?,
                    collateral,
                    borrows,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ResolvedScenario {
            wrapped,
            governance,
            relay,
            foreign_assets,
            liquidator_account,
            liquidator_balances,
            markets,
            rates,
            borrowers,
        })
    }
}

fn parse_u256(raw: &str) -> Result<U256> {
    U256::from_str_radix(raw, 10).with_context(|| format!("invalid amount {raw:?}"))
}

fn parse_account(raw: &str) -> Result<AccountId> {
    raw.parse()
        .map_err(|e| anyhow::anyhow!("invalid account {raw:?}: {e}"))
}
