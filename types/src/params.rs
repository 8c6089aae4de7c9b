//! Governance parameters: voting window, purchase pricing, collaborator timeouts.

use crate::amount::UNIT;
use crate::Amount;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for one governance instance.
///
/// Every field has a serde default so a partial TOML table is accepted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceParams {
    /// Length of the voting window in seconds. `deadline = created_at + voting_period_secs`.
    pub voting_period_secs: u64,

    /// Upper bound passed to the marketplace when buying a proposal's target.
    /// Default: 0.1 whole units.
    pub purchase_price: Amount,

    /// Funds deposited into the treasury at initialization. Default: 1 whole unit.
    pub initial_treasury: Amount,

    /// Minimum eligibility-token balance needed to propose or vote.
    pub min_eligibility_balance: u64,

    /// Timeout applied to each balance oracle call, in milliseconds.
    pub oracle_timeout_ms: u64,

    /// Timeout applied to each marketplace call, in milliseconds.
    pub marketplace_timeout_ms: u64,

    /// Refuse proposals whose target the marketplace reports as not for sale.
    pub check_listing_on_create: bool,
}

impl GovernanceParams {
    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_millis(self.oracle_timeout_ms)
    }

    pub fn marketplace_timeout(&self) -> Duration {
        Duration::from_millis(self.marketplace_timeout_ms)
    }
}

impl Default for GovernanceParams {
    fn default() -> Self {
        Self {
            voting_period_secs: 300,
            purchase_price: Amount::new(UNIT / 10),
            initial_treasury: Amount::new(UNIT),
            min_eligibility_balance: 1,
            oracle_timeout_ms: 5_000,
            marketplace_timeout_ms: 5_000,
            check_listing_on_create: false,
        }
    }
}
