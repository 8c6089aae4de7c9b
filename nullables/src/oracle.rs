//! Nullable balance oracle: scripted holdings and failures.

use async_trait::async_trait;
use gavel_governance::{BalanceOracle, OracleError};
use gavel_types::EntityId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// How the oracle answers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OracleMode {
    #[default]
    Normal,
    /// Every call fails with [`OracleError::Unavailable`].
    Unavailable,
    /// Every call fails with [`OracleError::LookupFailed`].
    LookupFailed,
}

/// An oracle whose balances are set by the test.
#[derive(Default)]
pub struct NullBalanceOracle {
    balances: Mutex<HashMap<EntityId, u64>>,
    mode: Mutex<OracleMode>,
    delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

impl NullBalanceOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balances<I, E>(balances: I) -> Self
    where
        I: IntoIterator<Item = (E, u64)>,
        E: Into<EntityId>,
    {
        let oracle = Self::new();
        for (entity, balance) in balances {
            oracle.set_balance(entity, balance);
        }
        oracle
    }

    pub fn set_balance(&self, entity: impl Into<EntityId>, balance: u64) {
        self.balances.lock().insert(entity.into(), balance);
    }

    pub fn set_mode(&self, mode: OracleMode) {
        *self.mode.lock() = mode;
    }

    /// Sleep this long before answering each call.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    /// Number of `balance_of` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BalanceOracle for NullBalanceOracle {
    async fn balance_of(&self, entity: &EntityId) -> Result<u64, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mode = *self.mode.lock();
        match mode {
            OracleMode::Normal => Ok(self.balances.lock().get(entity).copied().unwrap_or(0)),
            OracleMode::Unavailable => Err(OracleError::Unavailable("null oracle offline".into())),
            OracleMode::LookupFailed => {
                Err(OracleError::LookupFailed(format!("no record for {}", entity)))
            }
        }
    }
}
