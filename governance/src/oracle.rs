//! Balance oracle port: read-only view of eligibility-token holdings.

use async_trait::async_trait;
use gavel_types::EntityId;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum OracleError {
    /// The oracle could not be reached; propagated to callers as
    /// `GovernanceError::OracleUnavailable`.
    #[error("oracle unavailable: {0}")]
    Unavailable(String),

    /// Any other lookup failure; callers treat the balance as zero.
    #[error("balance lookup failed: {0}")]
    LookupFailed(String),
}

/// Answers "how many eligibility tokens does this entity hold right now?".
///
/// Implementations must be free of side effects. Calls may suspend
/// (network-bound); the engine never holds a lock across one.
#[async_trait]
pub trait BalanceOracle: Send + Sync {
    async fn balance_of(&self, entity: &EntityId) -> Result<u64, OracleError>;
}

/// Fixed balances from configuration; unknown entities hold nothing.
#[derive(Clone, Debug, Default)]
pub struct StaticBalanceOracle {
    balances: HashMap<EntityId, u64>,
}

impl StaticBalanceOracle {
    pub fn new(balances: HashMap<EntityId, u64>) -> Self {
        Self { balances }
    }
}

#[async_trait]
impl BalanceOracle for StaticBalanceOracle {
    async fn balance_of(&self, entity: &EntityId) -> Result<u64, OracleError> {
        Ok(self.balances.get(entity).copied().unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_oracle_defaults_to_zero() {
        let oracle = StaticBalanceOracle::new(HashMap::from([(EntityId::new("alice"), 2)]));
        assert_eq!(oracle.balance_of(&EntityId::new("alice")).await.unwrap(), 2);
        assert_eq!(oracle.balance_of(&EntityId::new("bob")).await.unwrap(), 0);
    }
}
