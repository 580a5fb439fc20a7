//! Currency identities and metadata.
//!
//! The chain's own history of keying maps interchangeably by object
//! identity and by ticker string is a known bug source, so identity is
//! made explicit here: every currency carries a canonical [`CurrencyId`]
//! and all maps are keyed by it. Symbol and decimals are display
//! metadata only.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical currency identity, mirroring the chain's currency registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CurrencyId {
    /// Native chain token, identified by ticker
    Token(String),
    /// Bridged asset registered at runtime
    ForeignAsset(u32),
    /// Interest-bearing deposit token of a lending market
    LendToken(u32),
}

impl fmt::Display for CurrencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token(ticker) => write!(f, "{ticker}"),
            Self::ForeignAsset(id) => write!(f, "fa:{id}"),
            Self::LendToken(id) => write!(f, "lend:{id}"),
        }
    }
}

/// A fungible asset known to the bot.
///
/// Equality and hashing delegate to the canonical id so a currency can be
/// used directly in sets regardless of where its metadata was fetched.
#[derive(Debug, Clone)]
pub struct Currency {
    id: CurrencyId,
    symbol: String,
    decimals: u8,
}

impl Currency {
    pub fn new(id: CurrencyId, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            id,
            symbol: symbol.into(),
            decimals,
        }
    }

    /// Native token constructor; the ticker doubles as the identity.
    pub fn token(ticker: &str, decimals: u8) -> Self {
        Self::new(CurrencyId::Token(ticker.to_string()), ticker, decimals)
    }

    /// Bridged asset constructor.
    pub fn foreign_asset(id: u32, symbol: impl Into<String>, decimals: u8) -> Self {
        Self::new(CurrencyId::ForeignAsset(id), symbol, decimals)
    }

    pub fn id(&self) -> &CurrencyId {
        &self.id
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }
}

impl PartialEq for Currency {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Currency {}

impl std::hash::Hash for Currency {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol)
    }
}
