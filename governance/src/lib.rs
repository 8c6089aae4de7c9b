//! Token-gated governance over a shared treasury.
//!
//! Holders of an eligibility token propose marketplace assets for purchase,
//! vote with weight equal to their current holdings, and execute each
//! proposal exactly once after its voting window closes. An affirmative
//! outcome buys the asset from the treasury.
//!
//! Balance lookups, the marketplace, time, and persistence are all
//! collaborators injected at construction.

pub mod clock;
mod codec;
pub mod engine;
pub mod error;
pub mod marketplace;
pub mod oracle;
pub mod proposal;
pub mod registry;
pub mod treasury;
pub mod weight;

pub use clock::{Clock, SystemClock};
pub use engine::{Collaborators, GovernanceEngine};
pub use error::GovernanceError;
pub use marketplace::{FixedPriceMarketplace, MarketplaceClient, MarketplaceError, Purchase};
pub use oracle::{BalanceOracle, OracleError, StaticBalanceOracle};
pub use proposal::{
    Ballot, ExecutionOutcome, Proposal, PurchaseFailure, TallyVerdict, VoteChoice,
};
pub use registry::{ProposalIter, ProposalStore};
pub use treasury::{Reservation, Transfer, Treasury, TreasuryRecord};
pub use weight::{sample_balance, LiveBalanceWeight, WeightPolicy};
