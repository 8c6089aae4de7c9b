//! Vote weight policy.
//!
//! The engine asks a [`WeightPolicy`] for every vote's weight. The default,
//! [`LiveBalanceWeight`], samples the voter's holdings at call time, so a
//! balance moved between votes is counted again by its new holder. A
//! snapshot-at-creation policy can be dropped in without touching the engine.

use std::time::Duration;

use async_trait::async_trait;
use gavel_types::EntityId;

use crate::error::GovernanceError;
use crate::oracle::{BalanceOracle, OracleError};
use crate::proposal::Proposal;

#[async_trait]
pub trait WeightPolicy: Send + Sync {
    /// Weight `voter` carries on `proposal`.
    async fn weight(
        &self,
        oracle: &dyn BalanceOracle,
        proposal: &Proposal,
        voter: &EntityId,
        timeout: Duration,
    ) -> Result<u64, GovernanceError>;
}

/// Weight equals the voter's eligibility-token balance at the time of voting.
#[derive(Clone, Copy, Debug, Default)]
pub struct LiveBalanceWeight;

#[async_trait]
impl WeightPolicy for LiveBalanceWeight {
    async fn weight(
        &self,
        oracle: &dyn BalanceOracle,
        _proposal: &Proposal,
        voter: &EntityId,
        timeout: Duration,
    ) -> Result<u64, GovernanceError> {
        sample_balance(oracle, voter, timeout).await
    }
}

/// Query the oracle with a timeout.
///
/// `Unavailable` and timeouts surface as `OracleUnavailable`; any other
/// oracle failure reads as a zero balance.
pub async fn sample_balance(
    oracle: &dyn BalanceOracle,
    entity: &EntityId,
    timeout: Duration,
) -> Result<u64, GovernanceError> {
    match tokio::time::timeout(timeout, oracle.balance_of(entity)).await {
        Ok(Ok(balance)) => Ok(balance),
        Ok(Err(OracleError::Unavailable(reason))) => {
            tracing::warn!(entity = %entity, %reason, "balance oracle unavailable");
            Err(GovernanceError::OracleUnavailable(reason))
        }
        Ok(Err(OracleError::LookupFailed(reason))) => {
            tracing::debug!(entity = %entity, %reason, "balance lookup failed, treating as zero");
            Ok(0)
        }
        Err(_) => {
            tracing::warn!(entity = %entity, ?timeout, "balance oracle timed out");
            Err(GovernanceError::OracleUnavailable(format!(
                "timed out after {}ms",
                timeout.as_millis()
            )))
        }
    }
}
