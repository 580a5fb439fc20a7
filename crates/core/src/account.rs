//! Account identities and per-account token balances.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::monetary::MonetaryAmount;

/// Opaque 32-byte on-chain account identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId([u8; 32]);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid account id: {0}")]
pub struct ParseAccountError(String);

impl AccountId {
    pub fn new(raw: [u8; 32]) -> Self {
        Self(raw)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for AccountId {
    type Err = ParseAccountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped).map_err(|e| ParseAccountError(e.to_string()))?;
        let raw: [u8; 32] = bytes
            .try_into()
            .map_err(|_| ParseAccountError(format!("expected 32 bytes, got {s:?}")))?;
        Ok(Self(raw))
    }
}

/// Free and reserved balance of one account in one currency.
///
/// Only the free portion is spendable, and therefore only the free
/// portion bounds how much debt the liquidator can repay.
#[derive(Debug, Clone)]
pub struct ChainBalance {
    pub free: MonetaryAmount,
    pub reserved: MonetaryAmount,
}

impl ChainBalance {
    pub fn new(free: MonetaryAmount, reserved: MonetaryAmount) -> Self {
        Self { free, reserved }
    }

    /// Balance with the full amount spendable.
    pub fn from_free(free: MonetaryAmount) -> Self {
        let reserved = MonetaryAmount::zero(free.currency().clone());
        Self { free, reserved }
    }
}
