//! Chain backends for the lending liquidator.
//!
//! The real chain is reached through an external client SDK behind the
//! `LendingChain` trait defined in `liquidator-core`. This crate
//! provides:
//! - TOML scenario files describing markets, rates, balances, and
//!   borrower positions
//! - An in-memory simulation backend implementing the full boundary,
//!   used by the binary's local mode and the integration tests

mod scenario;
mod sim;

pub use scenario::{ResolvedScenario, Scenario};
pub use sim::SimChain;
