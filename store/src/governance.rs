//! Governance storage trait.

use crate::StoreError;
use gavel_types::ProposalId;

/// Durable home of the proposal history and the treasury record.
///
/// Values are opaque encoded records; the engine owns the encoding.
/// Implementations must be safe to call from several threads at once.
pub trait GovernanceStore: Send + Sync {
    /// Insert or overwrite a proposal record.
    fn put_proposal(&self, id: ProposalId, data: &[u8]) -> Result<(), StoreError>;

    /// Get a proposal record by id.
    fn get_proposal(&self, id: ProposalId) -> Result<Vec<u8>, StoreError>;

    /// All proposal records, ascending by id (creation order).
    fn list_proposals(&self) -> Result<Vec<(ProposalId, Vec<u8>)>, StoreError>;

    /// Number of stored proposals.
    fn proposal_count(&self) -> Result<u64, StoreError>;

    /// Overwrite the treasury record.
    fn put_treasury(&self, data: &[u8]) -> Result<(), StoreError>;

    /// The treasury record, or `None` before initialization.
    fn get_treasury(&self) -> Result<Option<Vec<u8>>, StoreError>;

    /// Write an executed proposal and the treasury record it settled as one
    /// transaction. Either both records are stored or neither is.
    fn commit_execution(
        &self,
        id: ProposalId,
        proposal: &[u8],
        treasury: &[u8],
    ) -> Result<(), StoreError>;
}
