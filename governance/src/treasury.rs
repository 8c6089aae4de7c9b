//! Pooled funds that pay for purchases, withdrawable by a single owner.
//!
//! All mutations go through one mutex covering the balance, so a withdrawal
//! and an execution debit can never both spend the same funds. Purchases
//! reserve their price before the marketplace is called; reserved funds are
//! invisible to withdrawals until the reservation is settled or released.

use std::sync::Arc;

use gavel_store::GovernanceStore;
use gavel_types::{Amount, EntityId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::codec::{decode, encode};
use crate::error::GovernanceError;

/// Persisted treasury state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryRecord {
    pub owner: EntityId,
    pub balance: Amount,
}

/// Funds moved out of the treasury to the owner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transfer {
    pub to: EntityId,
    pub amount: Amount,
}

/// Funds set aside for one in-flight purchase.
///
/// Must be handed back through [`Treasury::settle`] or [`Treasury::release`].
#[derive(Debug, PartialEq, Eq)]
#[must_use]
pub struct Reservation {
    amount: Amount,
}

impl Reservation {
    pub fn amount(&self) -> Amount {
        self.amount
    }
}

struct State {
    record: TreasuryRecord,
    reserved: Amount,
}

impl State {
    fn available(&self) -> Amount {
        self.record.balance.saturating_sub(self.reserved)
    }

    /// Take `amount` out of `spendable`. The debited record goes through
    /// `persist` first and is applied only if that succeeds.
    fn debit<F>(
        &mut self,
        amount: Amount,
        spendable: Amount,
        persist: F,
    ) -> Result<Amount, GovernanceError>
    where
        F: FnOnce(&TreasuryRecord) -> Result<(), GovernanceError>,
    {
        if amount > spendable {
            return Err(GovernanceError::InsufficientFunds {
                needed: amount,
                available: spendable,
            });
        }
        let staged = TreasuryRecord {
            owner: self.record.owner.clone(),
            balance: self.record.balance.saturating_sub(amount),
        };
        persist(&staged)?;
        self.record = staged;
        Ok(self.record.balance)
    }
}

pub struct Treasury {
    state: Mutex<State>,
    backend: Option<Arc<dyn GovernanceStore>>,
}

impl Treasury {
    /// A memory-only treasury holding `initial` for `owner`.
    pub fn new(owner: EntityId, initial: Amount) -> Self {
        Self::from_record(
            TreasuryRecord {
                owner,
                balance: initial,
            },
            None,
        )
    }

    /// Create a treasury and write its first record to `backend`.
    ///
    /// Fails with `AlreadyInitialized` if `backend` already holds one.
    pub fn initialize(
        owner: EntityId,
        initial: Amount,
        backend: Arc<dyn GovernanceStore>,
    ) -> Result<Self, GovernanceError> {
        if backend.get_treasury()?.is_some() {
            return Err(GovernanceError::AlreadyInitialized);
        }
        let record = TreasuryRecord {
            owner,
            balance: initial,
        };
        backend.put_treasury(&encode(&record)?)?;
        tracing::info!(owner = %record.owner, balance = %record.balance, "treasury initialized");
        Ok(Self::from_record(record, Some(backend)))
    }

    /// Reload the treasury persisted in `backend`.
    pub fn load(backend: Arc<dyn GovernanceStore>) -> Result<Self, GovernanceError> {
        let bytes = backend
            .get_treasury()?
            .ok_or(GovernanceError::NotInitialized)?;
        let record: TreasuryRecord = decode(&bytes)?;
        Ok(Self::from_record(record, Some(backend)))
    }

    fn from_record(record: TreasuryRecord, backend: Option<Arc<dyn GovernanceStore>>) -> Self {
        Self {
            state: Mutex::new(State {
                record,
                reserved: Amount::ZERO,
            }),
            backend,
        }
    }

    pub fn owner(&self) -> EntityId {
        self.state.lock().record.owner.clone()
    }

    pub fn is_owner(&self, entity: &EntityId) -> bool {
        &self.state.lock().record.owner == entity
    }

    /// Total funds held, including reservations.
    pub fn balance(&self) -> Amount {
        self.state.lock().record.balance
    }

    /// Funds not set aside for an in-flight purchase.
    pub fn available(&self) -> Amount {
        self.state.lock().available()
    }

    pub fn record(&self) -> TreasuryRecord {
        self.state.lock().record.clone()
    }

    /// Deposit `amount`. Any entity may fund the treasury.
    pub fn fund(&self, amount: Amount) -> Result<Amount, GovernanceError> {
        let mut state = self.state.lock();
        let balance = state.record.balance.saturating_add(amount);
        self.commit(&mut state, balance)?;
        tracing::info!(%amount, %balance, "treasury funded");
        Ok(balance)
    }

    /// Owner-only withdrawal of `amount` to the owner.
    pub fn withdraw(
        &self,
        requester: &EntityId,
        amount: Amount,
    ) -> Result<Transfer, GovernanceError> {
        let mut state = self.state.lock();
        if &state.record.owner != requester {
            tracing::debug!(%requester, "withdrawal refused: not the owner");
            return Err(GovernanceError::Unauthorized(requester.clone()));
        }
        let available = state.available();
        let balance = state.debit(amount, available, |record| self.write_through(record))?;
        tracing::info!(to = %requester, %amount, %balance, "treasury withdrawal");
        Ok(Transfer {
            to: state.record.owner.clone(),
            amount,
        })
    }

    /// Owner-only withdrawal of everything available.
    ///
    /// Fails with `InsufficientFunds` when nothing is available.
    pub fn withdraw_all(&self, requester: &EntityId) -> Result<Transfer, GovernanceError> {
        let amount = {
            let state = self.state.lock();
            if &state.record.owner != requester {
                return Err(GovernanceError::Unauthorized(requester.clone()));
            }
            state.available()
        };
        if amount.is_zero() {
            return Err(GovernanceError::InsufficientFunds {
                needed: Amount::new(1),
                available: Amount::ZERO,
            });
        }
        // Re-checked under the lock: another withdrawal may have landed between.
        self.withdraw(requester, amount)
    }

    /// Set `amount` aside for a purchase.
    pub fn reserve(&self, amount: Amount) -> Result<Reservation, GovernanceError> {
        let mut state = self.state.lock();
        let available = state.available();
        if amount > available {
            return Err(GovernanceError::InsufficientFunds {
                needed: amount,
                available,
            });
        }
        state.reserved = state.reserved.saturating_add(amount);
        Ok(Reservation { amount })
    }

    /// Debit `actual` for a completed purchase and drop the reservation.
    ///
    /// `actual` is capped at the reserved amount. The settled record is
    /// handed to `persist`, which must store it durably; on failure nothing
    /// is applied and the funds stay reserved.
    pub fn settle<F>(
        &self,
        reservation: Reservation,
        actual: Amount,
        persist: F,
    ) -> Result<Amount, GovernanceError>
    where
        F: FnOnce(&TreasuryRecord) -> Result<(), GovernanceError>,
    {
        let mut state = self.state.lock();
        let charged = if actual > reservation.amount {
            tracing::warn!(
                %actual,
                reserved = %reservation.amount,
                "purchase cost more than reserved, debiting the reservation"
            );
            reservation.amount
        } else {
            actual
        };
        let spendable = state.available().saturating_add(reservation.amount);
        let balance = state.debit(charged, spendable, persist)?;
        state.reserved = state.reserved.saturating_sub(reservation.amount);
        Ok(balance)
    }

    /// Return reserved funds to the available pool.
    pub fn release(&self, reservation: Reservation) {
        let mut state = self.state.lock();
        state.reserved = state.reserved.saturating_sub(reservation.amount);
    }

    /// Persist the new balance, then apply it.
    fn commit(&self, state: &mut State, balance: Amount) -> Result<(), GovernanceError> {
        let staged = TreasuryRecord {
            owner: state.record.owner.clone(),
            balance,
        };
        self.write_through(&staged)?;
        state.record = staged;
        Ok(())
    }

    fn write_through(&self, record: &TreasuryRecord) -> Result<(), GovernanceError> {
        if let Some(backend) = &self.backend {
            backend.put_treasury(&encode(record)?)?;
        }
        Ok(())
    }
}
