use gavel_store::StoreError;
use gavel_types::{Amount, EntityId, ProposalId, Timestamp};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error("{entity} holds {balance} eligibility tokens, at least {required} required")]
    InsufficientEligibility {
        entity: EntityId,
        balance: u64,
        required: u64,
    },

    #[error("proposal {0} not found")]
    NotFound(ProposalId),

    #[error("voting on proposal {proposal} closed at {deadline}")]
    VotingClosed {
        proposal: ProposalId,
        deadline: Timestamp,
    },

    #[error("voting on proposal {proposal} is open until {deadline} (now {now})")]
    VotingStillOpen {
        proposal: ProposalId,
        deadline: Timestamp,
        now: Timestamp,
    },

    #[error("{voter} has already voted on proposal {proposal}")]
    AlreadyVoted {
        proposal: ProposalId,
        voter: EntityId,
    },

    #[error("proposal {0} has already been executed")]
    AlreadyExecuted(ProposalId),

    #[error("{0} is not the treasury owner")]
    Unauthorized(EntityId),

    #[error("insufficient treasury funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Amount, available: Amount },

    #[error("balance oracle unavailable: {0}")]
    OracleUnavailable(String),

    #[error("marketplace failure: {0}")]
    MarketplaceFailure(String),

    #[error("tally of proposal {0} would overflow")]
    TallyOverflow(ProposalId),

    #[error("proposal {0} already exists")]
    DuplicateId(ProposalId),

    #[error("governance state has not been initialized")]
    NotInitialized,

    #[error("governance state is already initialized")]
    AlreadyInitialized,

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl GovernanceError {
    /// Whether retrying the same request later could succeed.
    ///
    /// Only collaborator outages and storage backend failures qualify; every
    /// other kind is a deterministic rejection.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::OracleUnavailable(_)
                | Self::MarketplaceFailure(_)
                | Self::Store(StoreError::Backend(_))
        )
    }
}
