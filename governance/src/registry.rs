//! Authoritative collection of proposals.
//!
//! Each proposal sits behind its own mutex, so operations on different
//! proposals never contend; the outer map lock is held only long enough to
//! look up (or insert) a handle. Appends are serialized by a separate mutex
//! and write to the backend before taking the map lock. Every mutation is staged on a copy, written
//! through to the optional backend, and only then swapped in, which keeps
//! memory and disk unchanged when any step fails.

use std::collections::BTreeMap;
use std::sync::Arc;

use gavel_store::{GovernanceStore, StoreError};
use gavel_types::{EntityId, ProposalId, Timestamp};
use parking_lot::{Mutex, RwLock};

use crate::codec::{decode, encode};
use crate::error::GovernanceError;
use crate::proposal::{ExecutionOutcome, Proposal, VoteChoice};

struct Slot {
    proposal: Proposal,
    /// An execution attempt owns this proposal. Not persisted: an attempt
    /// that never committed leaves nothing behind on disk.
    execution_claimed: bool,
}

type SlotHandle = Arc<Mutex<Slot>>;

pub struct ProposalStore {
    slots: RwLock<BTreeMap<ProposalId, SlotHandle>>,
    appending: Mutex<()>,
    backend: Option<Arc<dyn GovernanceStore>>,
}

impl ProposalStore {
    /// An empty, memory-only store.
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(BTreeMap::new()),
            appending: Mutex::new(()),
            backend: None,
        }
    }

    /// Reload every proposal persisted in `backend`.
    pub fn load(backend: Arc<dyn GovernanceStore>) -> Result<Self, GovernanceError> {
        let mut slots = BTreeMap::new();
        for (id, bytes) in backend.list_proposals()? {
            let proposal: Proposal = decode(&bytes)?;
            if proposal.id != id || !proposal.tally_is_consistent() {
                return Err(StoreError::Corruption(format!("proposal record {}", id)).into());
            }
            slots.insert(
                id,
                Arc::new(Mutex::new(Slot {
                    proposal,
                    execution_claimed: false,
                })),
            );
        }
        tracing::info!(count = slots.len(), "loaded proposals");
        Ok(Self {
            slots: RwLock::new(slots),
            appending: Mutex::new(()),
            backend: Some(backend),
        })
    }

    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    pub fn contains(&self, id: ProposalId) -> bool {
        self.slots.read().contains_key(&id)
    }

    /// The id the next appended proposal will receive.
    pub fn next_id(&self) -> ProposalId {
        Self::following(&self.slots.read())
    }

    fn following(slots: &BTreeMap<ProposalId, SlotHandle>) -> ProposalId {
        slots
            .keys()
            .next_back()
            .map_or(ProposalId::FIRST, ProposalId::next)
    }

    /// Insert a proposal under its own id.
    pub fn append(&self, proposal: Proposal) -> Result<(), GovernanceError> {
        let _appending = self.appending.lock();
        self.insert_new(proposal)
    }

    /// Allocate the next id and append the proposal `build` makes for it,
    /// as one step with respect to other appends.
    pub fn append_next<F>(&self, build: F) -> Result<Proposal, GovernanceError>
    where
        F: FnOnce(ProposalId) -> Proposal,
    {
        let _appending = self.appending.lock();
        let proposal = build(self.next_id());
        self.insert_new(proposal.clone())?;
        Ok(proposal)
    }

    /// Caller holds `appending`, so no other insert can race this one.
    fn insert_new(&self, proposal: Proposal) -> Result<(), GovernanceError> {
        if self.contains(proposal.id) {
            return Err(GovernanceError::DuplicateId(proposal.id));
        }
        self.persist(&proposal)?;
        self.slots.write().insert(
            proposal.id,
            Arc::new(Mutex::new(Slot {
                proposal,
                execution_claimed: false,
            })),
        );
        Ok(())
    }

    /// Snapshot of one proposal.
    pub fn get(&self, id: ProposalId) -> Result<Proposal, GovernanceError> {
        Ok(self.slot(id)?.lock().proposal.clone())
    }

    /// Lazily yields every proposal in creation order.
    ///
    /// The set of proposals is fixed when this is called; each proposal's
    /// contents are read as the iterator reaches it. Call again to restart.
    pub fn list_all(&self) -> ProposalIter {
        let handles: Vec<SlotHandle> = self.slots.read().values().cloned().collect();
        ProposalIter {
            handles: handles.into_iter(),
        }
    }

    /// Atomically re-check the vote preconditions and add `weight` to
    /// `choice`'s side. Returns the updated proposal.
    pub fn update_tally(
        &self,
        id: ProposalId,
        voter: &EntityId,
        choice: VoteChoice,
        weight: u64,
        now: Timestamp,
    ) -> Result<Proposal, GovernanceError> {
        let handle = self.slot(id)?;
        let mut slot = handle.lock();
        let mut staged = slot.proposal.clone();
        staged.record_vote(voter, choice, weight, now)?;
        self.persist(&staged)?;
        slot.proposal = staged.clone();
        Ok(staged)
    }

    /// Take exclusive ownership of the one execution attempt a proposal gets.
    ///
    /// A second caller, whether before or after the first commits, gets
    /// `AlreadyExecuted`.
    pub fn claim_execution(
        &self,
        id: ProposalId,
        now: Timestamp,
    ) -> Result<Proposal, GovernanceError> {
        let handle = self.slot(id)?;
        let mut slot = handle.lock();
        slot.proposal.check_execute(now)?;
        if slot.execution_claimed {
            return Err(GovernanceError::AlreadyExecuted(id));
        }
        slot.execution_claimed = true;
        Ok(slot.proposal.clone())
    }

    /// Give up a claim that never reached the marketplace, so execution
    /// can be retried.
    pub fn release_claim(&self, id: ProposalId) {
        if let Ok(handle) = self.slot(id) {
            let mut slot = handle.lock();
            if !slot.proposal.executed {
                slot.execution_claimed = false;
            }
        }
    }

    /// Commit `executed = true` with its outcome.
    pub fn mark_executed(
        &self,
        id: ProposalId,
        outcome: ExecutionOutcome,
    ) -> Result<Proposal, GovernanceError> {
        self.mark_executed_with(id, outcome, |staged| self.persist(staged))
            .map(|(p, ())| p)
    }

    /// Like [`mark_executed`](Self::mark_executed), but `commit` is
    /// responsible for storing the staged proposal, together with anything
    /// that must land in the same write. It runs under the proposal's lock;
    /// memory is updated only if it succeeds.
    pub fn mark_executed_with<T, F>(
        &self,
        id: ProposalId,
        outcome: ExecutionOutcome,
        commit: F,
    ) -> Result<(Proposal, T), GovernanceError>
    where
        F: FnOnce(&Proposal) -> Result<T, GovernanceError>,
    {
        let handle = self.slot(id)?;
        let mut slot = handle.lock();
        let mut staged = slot.proposal.clone();
        staged.mark_executed(outcome)?;
        let committed = commit(&staged)?;
        slot.proposal = staged.clone();
        slot.execution_claimed = true;
        Ok((staged, committed))
    }

    fn slot(&self, id: ProposalId) -> Result<SlotHandle, GovernanceError> {
        self.slots
            .read()
            .get(&id)
            .cloned()
            .ok_or(GovernanceError::NotFound(id))
    }

    fn persist(&self, proposal: &Proposal) -> Result<(), GovernanceError> {
        if let Some(backend) = &self.backend {
            backend.put_proposal(proposal.id, &encode(proposal)?)?;
        }
        Ok(())
    }
}

impl Default for ProposalStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator returned by [`ProposalStore::list_all`].
pub struct ProposalIter {
    handles: std::vec::IntoIter<SlotHandle>,
}

impl Iterator for ProposalIter {
    type Item = Proposal;

    fn next(&mut self) -> Option<Proposal> {
        self.handles.next().map(|slot| slot.lock().proposal.clone())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.handles.size_hint()
    }
}

impl ExactSizeIterator for ProposalIter {}

#[cfg(test)]
mod tests {
    use super::*;
    use gavel_types::AssetId;

    fn build(id: ProposalId) -> Proposal {
        Proposal::new(
            id,
            AssetId::new(id.raw() + 100),
            EntityId::new("alice"),
            Timestamp::new(1_000),
            300,
        )
    }

    #[test]
    fn append_next_assigns_sequential_ids() {
        let store = ProposalStore::new();
        let a = store.append_next(build).unwrap();
        let b = store.append_next(build).unwrap();
        assert_eq!(a.id, ProposalId::new(0));
        assert_eq!(b.id, ProposalId::new(1));
        assert_eq!(store.next_id(), ProposalId::new(2));
    }

    #[test]
    fn append_rejects_duplicate_id() {
        let store = ProposalStore::new();
        store.append(build(ProposalId::new(3))).unwrap();
        let err = store.append(build(ProposalId::new(3))).unwrap_err();
        assert!(matches!(err, GovernanceError::DuplicateId(id) if id == ProposalId::new(3)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn get_unknown_is_not_found() {
        let store = ProposalStore::new();
        assert!(matches!(
            store.get(ProposalId::new(0)),
            Err(GovernanceError::NotFound(_))
        ));
    }

    #[test]
    fn list_all_is_ordered_and_restartable() {
        let store = ProposalStore::new();
        for _ in 0..3 {
            store.append_next(build).unwrap();
        }
        let first: Vec<u64> = store.list_all().map(|p| p.id.raw()).collect();
        assert_eq!(first, vec![0, 1, 2]);

        store.append_next(build).unwrap();
        assert_eq!(store.list_all().len(), 4);
    }

    #[test]
    fn list_all_reads_contents_lazily() {
        let store = ProposalStore::new();
        store.append_next(build).unwrap();
        let mut iter = store.list_all();
        store
            .update_tally(
                ProposalId::new(0),
                &EntityId::new("bob"),
                VoteChoice::Yay,
                4,
                Timestamp::new(1_001),
            )
            .unwrap();
        assert_eq!(iter.next().map(|p| p.yay_weight), Some(4));
    }

    #[test]
    fn failed_tally_update_leaves_proposal_unchanged() {
        let store = ProposalStore::new();
        store.append_next(build).unwrap();
        let id = ProposalId::new(0);
        let late = Timestamp::new(1_300);
        assert!(store
            .update_tally(id, &EntityId::new("bob"), VoteChoice::Yay, 4, late)
            .is_err());
        assert_eq!(store.get(id).unwrap().yay_weight, 0);
        assert_eq!(store.get(id).unwrap().voter_count(), 0);
    }

    #[test]
    fn claim_is_exclusive() {
        let store = ProposalStore::new();
        store.append_next(build).unwrap();
        let id = ProposalId::new(0);
        let after = Timestamp::new(1_300);
        store.claim_execution(id, after).unwrap();
        assert!(matches!(
            store.claim_execution(id, after),
            Err(GovernanceError::AlreadyExecuted(_))
        ));

        store.release_claim(id);
        assert!(store.claim_execution(id, after).is_ok());
    }

    #[test]
    fn mark_executed_commits_once() {
        let store = ProposalStore::new();
        store.append_next(build).unwrap();
        let id = ProposalId::new(0);
        let (p, seen) = store
            .mark_executed_with(id, ExecutionOutcome::Rejected, |staged| Ok(staged.executed))
            .unwrap();
        assert!(seen && p.executed);
        assert!(matches!(
            store.mark_executed(id, ExecutionOutcome::Rejected),
            Err(GovernanceError::AlreadyExecuted(_))
        ));
    }

    #[test]
    fn failed_execution_commit_leaves_proposal_open() {
        let store = ProposalStore::new();
        store.append_next(build).unwrap();
        let id = ProposalId::new(0);
        let err = store
            .mark_executed_with(id, ExecutionOutcome::Rejected, |_| {
                Err::<(), _>(StoreError::Backend("disk full".into()).into())
            })
            .unwrap_err();
        assert!(matches!(err, GovernanceError::Store(_)));
        let p = store.get(id).unwrap();
        assert!(!p.executed);
        assert_eq!(p.outcome, None);
    }

    /// Records whether the proposal map could be read while each proposal
    /// write was in progress.
    #[derive(Default)]
    struct WatchingBackend {
        watched: Mutex<Option<Arc<ProposalStore>>>,
        map_readable: Mutex<Vec<bool>>,
    }

    impl GovernanceStore for WatchingBackend {
        fn put_proposal(&self, _id: ProposalId, _data: &[u8]) -> Result<(), StoreError> {
            if let Some(store) = self.watched.lock().as_ref() {
                let readable = store.slots.try_read().is_some();
                self.map_readable.lock().push(readable);
            }
            Ok(())
        }

        fn get_proposal(&self, id: ProposalId) -> Result<Vec<u8>, StoreError> {
            Err(StoreError::NotFound(id.to_string()))
        }

        fn list_proposals(&self) -> Result<Vec<(ProposalId, Vec<u8>)>, StoreError> {
            Ok(Vec::new())
        }

        fn proposal_count(&self) -> Result<u64, StoreError> {
            Ok(0)
        }

        fn put_treasury(&self, _data: &[u8]) -> Result<(), StoreError> {
            Ok(())
        }

        fn get_treasury(&self) -> Result<Option<Vec<u8>>, StoreError> {
            Ok(None)
        }

        fn commit_execution(
            &self,
            _id: ProposalId,
            _proposal: &[u8],
            _treasury: &[u8],
        ) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[test]
    fn appends_leave_the_map_readable_while_writing() {
        let backend = Arc::new(WatchingBackend::default());
        let store = Arc::new(ProposalStore::load(backend.clone()).unwrap());
        *backend.watched.lock() = Some(Arc::clone(&store));

        store.append_next(build).unwrap();
        store.append(build(ProposalId::new(5))).unwrap();

        backend.watched.lock().take();
        assert_eq!(*backend.map_readable.lock(), vec![true, true]);
        assert_eq!(store.next_id(), ProposalId::new(6));
    }

    #[test]
    fn concurrent_appends_get_distinct_ids() {
        let store = ProposalStore::new();
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..10 {
                        store.append_next(build).unwrap();
                    }
                });
            }
        });
        let ids: Vec<u64> = store.list_all().map(|p| p.id.raw()).collect();
        assert_eq!(ids, (0..80).collect::<Vec<u64>>());
    }
}
