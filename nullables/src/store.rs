//! Nullable store: thread-safe in-memory governance storage for testing.

use gavel_store::{GovernanceStore, StoreError};
use gavel_types::ProposalId;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// An in-memory [`GovernanceStore`].
/// Thread-safe for use with tokio's multi-threaded runtime.
#[derive(Default)]
pub struct NullGovernanceStore {
    proposals: Mutex<BTreeMap<ProposalId, Vec<u8>>>,
    treasury: Mutex<Option<Vec<u8>>>,
    fail_writes: AtomicBool,
    fail_treasury_writes: AtomicBool,
    writes: AtomicUsize,
}

impl NullGovernanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with a backend error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write touching the treasury record fail, while
    /// proposal-only writes still succeed.
    pub fn set_fail_treasury_writes(&self, fail: bool) {
        self.fail_treasury_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_writable(&self, touches_treasury: bool) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("null store: writes disabled".into()));
        }
        if touches_treasury && self.fail_treasury_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("null store: treasury writes disabled".into()));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl GovernanceStore for NullGovernanceStore {
    fn put_proposal(&self, id: ProposalId, data: &[u8]) -> Result<(), StoreError> {
        self.check_writable(false)?;
        self.proposals.lock().insert(id, data.to_vec());
        Ok(())
    }

    fn get_proposal(&self, id: ProposalId) -> Result<Vec<u8>, StoreError> {
        self.proposals
            .lock()
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn list_proposals(&self) -> Result<Vec<(ProposalId, Vec<u8>)>, StoreError> {
        Ok(self
            .proposals
            .lock()
            .iter()
            .map(|(id, data)| (*id, data.clone()))
            .collect())
    }

    fn proposal_count(&self) -> Result<u64, StoreError> {
        Ok(self.proposals.lock().len() as u64)
    }

    fn put_treasury(&self, data: &[u8]) -> Result<(), StoreError> {
        self.check_writable(true)?;
        *self.treasury.lock() = Some(data.to_vec());
        Ok(())
    }

    fn get_treasury(&self) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.treasury.lock().clone())
    }

    fn commit_execution(
        &self,
        id: ProposalId,
        proposal: &[u8],
        treasury: &[u8],
    ) -> Result<(), StoreError> {
        self.check_writable(true)?;
        // Both locks are held so no reader sees one record without the other.
        let mut proposals = self.proposals.lock();
        let mut stored = self.treasury.lock();
        proposals.insert(id, proposal.to_vec());
        *stored = Some(treasury.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_in_id_order() {
        let store = NullGovernanceStore::new();
        store.put_proposal(ProposalId::new(2), b"b").unwrap();
        store.put_proposal(ProposalId::new(1), b"a").unwrap();
        let ids: Vec<u64> = store
            .list_proposals()
            .unwrap()
            .into_iter()
            .map(|(id, _)| id.raw())
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn failing_writes_leave_contents_untouched() {
        let store = NullGovernanceStore::new();
        store.put_treasury(b"t0").unwrap();
        store.set_fail_writes(true);
        assert!(store.put_treasury(b"t1").is_err());
        assert_eq!(store.get_treasury().unwrap(), Some(b"t0".to_vec()));
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn failing_treasury_writes_reject_the_whole_execution_commit() {
        let store = NullGovernanceStore::new();
        store.put_proposal(ProposalId::new(0), b"open").unwrap();
        store.put_treasury(b"t0").unwrap();
        store.set_fail_treasury_writes(true);

        assert!(store.put_proposal(ProposalId::new(0), b"voted").is_ok());
        assert!(store
            .commit_execution(ProposalId::new(0), b"executed", b"t1")
            .is_err());
        assert_eq!(store.get_proposal(ProposalId::new(0)).unwrap(), b"voted");
        assert_eq!(store.get_treasury().unwrap(), Some(b"t0".to_vec()));
    }
}
