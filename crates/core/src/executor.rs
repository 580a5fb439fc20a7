//! Liquidation submission over the chain boundary.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

use crate::api::{wait_for_liquidation, LendingChain};
use crate::strategy::LiquidationOpportunity;

/// Executes the strategy's chosen liquidation through the client SDK.
///
/// Submission and event observation run concurrently: either our
/// liquidation goes through, or someone else's does and we still see the
/// borrower liquidated. The event is confirmation telemetry; a missing
/// event within the timeout is logged, not fatal.
pub struct LiquidationExecutor {
    chain: Arc<dyn LendingChain>,
    event_timeout: Duration,
}

impl LiquidationExecutor {
    pub fn new(chain: Arc<dyn LendingChain>, event_timeout: Duration) -> Self {
        Self {
            chain,
            event_timeout,
        }
    }

    #[instrument(skip(self, opportunity), fields(borrower = %opportunity.borrower))]
    pub async fn execute(&self, opportunity: &LiquidationOpportunity) -> Result<()> {
        info!(
            repay = %opportunity.repay,
            collateral = %opportunity.collateral_currency,
            "Submitting liquidation"
        );

        // Subscribe before submitting so our own event cannot be missed.
        let mut events = self.chain.subscribe_liquidations().await?;

        let submit = async {
            self.chain
                .liquidate_borrow_position(
                    &opportunity.borrower,
                    opportunity.repay.clone(),
                    &opportunity.collateral_currency,
                )
                .await
                .map_err(anyhow::Error::from)
        };
        let confirm = async {
            Ok::<_, anyhow::Error>(
                wait_for_liquidation(&mut events, &opportunity.borrower, self.event_timeout).await,
            )
        };

        // A failed submission aborts immediately; a successful one is
        // held until its event is seen or the timeout passes.
        let ((), observed) = tokio::try_join!(submit, confirm)?;

        if observed {
            info!("Liquidation event observed");
        } else {
            warn!(
                timeout_ms = self.event_timeout.as_millis() as u64,
                "No liquidation event within timeout"
            );
        }

        Ok(())
    }
}
