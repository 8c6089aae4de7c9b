//! Governance proposals and their lifecycle.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use gavel_types::{Amount, AssetId, EntityId, GavelError, ProposalId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::GovernanceError;

/// A voter's choice on a proposal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteChoice {
    Yay,
    Nay,
}

impl fmt::Display for VoteChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yay => write!(f, "yay"),
            Self::Nay => write!(f, "nay"),
        }
    }
}

impl FromStr for VoteChoice {
    type Err = GavelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yay" | "yes" | "y" => Ok(Self::Yay),
            "nay" | "no" | "n" => Ok(Self::Nay),
            _ => Err(GavelError::InvalidChoice(s.to_string())),
        }
    }
}

/// One recorded vote. Created once, never updated or deleted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    pub choice: VoteChoice,
    pub weight: u64,
}

/// Why an affirmative proposal did not end in a purchase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseFailure {
    /// The treasury could not cover the purchase price.
    InsufficientFunds { needed: Amount, available: Amount },
    /// The marketplace refused or failed the purchase.
    Marketplace(String),
    /// The marketplace did not answer within the configured timeout.
    TimedOut,
}

impl fmt::Display for PurchaseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientFunds { needed, available } => {
                write!(f, "insufficient funds (need {needed}, have {available})")
            }
            Self::Marketplace(reason) => write!(f, "marketplace: {reason}"),
            Self::TimedOut => write!(f, "marketplace timed out"),
        }
    }
}

/// Terminal result of executing a proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionOutcome {
    /// Yay outweighed nay and the target asset was bought for `price`.
    Purchased { price: Amount },
    /// Yay did not outweigh nay (ties reject). The marketplace was not called.
    Rejected,
    /// Yay outweighed nay but the purchase could not be completed.
    PurchaseFailed(PurchaseFailure),
}

impl ExecutionOutcome {
    pub fn is_purchase(&self) -> bool {
        matches!(self, Self::Purchased { .. })
    }
}

impl fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Purchased { price } => write!(f, "purchased for {price}"),
            Self::Rejected => write!(f, "rejected"),
            Self::PurchaseFailed(reason) => write!(f, "rejected ({reason})"),
        }
    }
}

/// What executing a proposal would do if the tally were final now.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TallyVerdict {
    Purchase,
    Reject,
}

/// A governance proposal to buy one marketplace asset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    /// The asset proposed for purchase.
    pub target: AssetId,
    /// Who created it.
    pub proposer: EntityId,
    pub created_at: Timestamp,
    /// Votes are accepted strictly before this instant; execution at or after it.
    pub deadline: Timestamp,
    pub yay_weight: u64,
    pub nay_weight: u64,
    /// Everyone who has voted, with the weight their vote carried.
    votes: BTreeMap<EntityId, Ballot>,
    pub executed: bool,
    /// Set together with `executed`, never changed afterwards.
    pub outcome: Option<ExecutionOutcome>,
}

impl Proposal {
    pub fn new(
        id: ProposalId,
        target: AssetId,
        proposer: EntityId,
        created_at: Timestamp,
        voting_period_secs: u64,
    ) -> Self {
        Self {
            id,
            target,
            proposer,
            created_at,
            deadline: created_at.plus_secs(voting_period_secs),
            yay_weight: 0,
            nay_weight: 0,
            votes: BTreeMap::new(),
            executed: false,
            outcome: None,
        }
    }

    pub fn has_voted(&self, voter: &EntityId) -> bool {
        self.votes.contains_key(voter)
    }

    pub fn ballot(&self, voter: &EntityId) -> Option<&Ballot> {
        self.votes.get(voter)
    }

    pub fn voters(&self) -> impl Iterator<Item = &EntityId> {
        self.votes.keys()
    }

    pub fn voter_count(&self) -> usize {
        self.votes.len()
    }

    pub fn is_open(&self, now: Timestamp) -> bool {
        !self.executed && now < self.deadline
    }

    /// Yay strictly greater than nay; ties favor rejection.
    pub fn verdict(&self) -> TallyVerdict {
        if self.yay_weight > self.nay_weight {
            TallyVerdict::Purchase
        } else {
            TallyVerdict::Reject
        }
    }

    /// Vote preconditions that do not need the oracle, in their reporting order.
    pub fn check_vote(&self, voter: &EntityId, now: Timestamp) -> Result<(), GovernanceError> {
        if !self.is_open(now) {
            return Err(GovernanceError::VotingClosed {
                proposal: self.id,
                deadline: self.deadline,
            });
        }
        if self.has_voted(voter) {
            return Err(GovernanceError::AlreadyVoted {
                proposal: self.id,
                voter: voter.clone(),
            });
        }
        Ok(())
    }

    /// Add a weighted vote after re-checking the preconditions.
    pub fn record_vote(
        &mut self,
        voter: &EntityId,
        choice: VoteChoice,
        weight: u64,
        now: Timestamp,
    ) -> Result<(), GovernanceError> {
        self.check_vote(voter, now)?;
        let side = match choice {
            VoteChoice::Yay => &mut self.yay_weight,
            VoteChoice::Nay => &mut self.nay_weight,
        };
        *side = side
            .checked_add(weight)
            .ok_or(GovernanceError::TallyOverflow(self.id))?;
        self.votes.insert(voter.clone(), Ballot { choice, weight });
        Ok(())
    }

    /// Execution preconditions.
    pub fn check_execute(&self, now: Timestamp) -> Result<(), GovernanceError> {
        if now < self.deadline {
            return Err(GovernanceError::VotingStillOpen {
                proposal: self.id,
                deadline: self.deadline,
                now,
            });
        }
        if self.executed {
            return Err(GovernanceError::AlreadyExecuted(self.id));
        }
        Ok(())
    }

    /// Flip `executed` and record the outcome. Fails if already executed.
    pub fn mark_executed(&mut self, outcome: ExecutionOutcome) -> Result<(), GovernanceError> {
        if self.executed {
            return Err(GovernanceError::AlreadyExecuted(self.id));
        }
        self.executed = true;
        self.outcome = Some(outcome);
        Ok(())
    }

    /// `yay_weight + nay_weight` equals the summed ballot weights, per side.
    /// A sum that overflows is never consistent.
    pub fn tally_is_consistent(&self) -> bool {
        let sums = self
            .votes
            .values()
            .try_fold((0u64, 0u64), |(yay, nay), ballot| match ballot.choice {
                VoteChoice::Yay => Some((yay.checked_add(ballot.weight)?, nay)),
                VoteChoice::Nay => Some((yay, nay.checked_add(ballot.weight)?)),
            });
        sums == Some((self.yay_weight, self.nay_weight))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal(deadline_offset: u64) -> Proposal {
        Proposal::new(
            ProposalId::new(0),
            AssetId::new(7),
            EntityId::new("alice"),
            Timestamp::new(1_000),
            deadline_offset,
        )
    }

    #[test]
    fn deadline_is_creation_plus_period() {
        let p = proposal(300);
        assert_eq!(p.deadline, Timestamp::new(1_300));
        assert!(!p.executed);
        assert_eq!((p.yay_weight, p.nay_weight), (0, 0));
    }

    #[test]
    fn record_vote_accumulates_by_choice() {
        let mut p = proposal(300);
        let now = Timestamp::new(1_100);
        p.record_vote(&EntityId::new("bob"), VoteChoice::Yay, 3, now).unwrap();
        p.record_vote(&EntityId::new("carol"), VoteChoice::Nay, 1, now).unwrap();
        assert_eq!((p.yay_weight, p.nay_weight), (3, 1));
        assert_eq!(p.voter_count(), 2);
        assert!(p.tally_is_consistent());
    }

    #[test]
    fn second_vote_from_same_voter_is_rejected_without_change() {
        let mut p = proposal(300);
        let now = Timestamp::new(1_100);
        let bob = EntityId::new("bob");
        p.record_vote(&bob, VoteChoice::Yay, 2, now).unwrap();
        let err = p.record_vote(&bob, VoteChoice::Nay, 5, now).unwrap_err();
        assert!(matches!(err, GovernanceError::AlreadyVoted { .. }));
        assert_eq!((p.yay_weight, p.nay_weight), (2, 0));
    }

    #[test]
    fn overflowing_vote_is_refused_without_change() {
        let mut p = proposal(300);
        let now = Timestamp::new(1_100);
        p.record_vote(&EntityId::new("whale"), VoteChoice::Yay, u64::MAX, now)
            .unwrap();
        let err = p
            .record_vote(&EntityId::new("bob"), VoteChoice::Yay, 1, now)
            .unwrap_err();
        assert!(matches!(err, GovernanceError::TallyOverflow(_)));
        assert_eq!(p.yay_weight, u64::MAX);
        assert!(!p.has_voted(&EntityId::new("bob")));

        p.record_vote(&EntityId::new("carol"), VoteChoice::Nay, 1, now)
            .unwrap();
        assert!(p.tally_is_consistent());
    }

    #[test]
    fn overflowing_ballots_are_inconsistent() {
        let mut p = proposal(300);
        for voter in ["a", "b"] {
            p.votes.insert(
                EntityId::new(voter),
                Ballot {
                    choice: VoteChoice::Yay,
                    weight: u64::MAX,
                },
            );
        }
        p.yay_weight = u64::MAX;
        assert!(!p.tally_is_consistent());
    }

    #[test]
    fn voting_closes_exactly_at_deadline() {
        let mut p = proposal(300);
        let bob = EntityId::new("bob");
        assert!(p.check_vote(&bob, Timestamp::new(1_299)).is_ok());
        let err = p
            .record_vote(&bob, VoteChoice::Yay, 1, Timestamp::new(1_300))
            .unwrap_err();
        assert!(matches!(err, GovernanceError::VotingClosed { .. }));
    }

    #[test]
    fn execution_opens_exactly_at_deadline() {
        let p = proposal(300);
        assert!(matches!(
            p.check_execute(Timestamp::new(1_299)),
            Err(GovernanceError::VotingStillOpen { .. })
        ));
        assert!(p.check_execute(Timestamp::new(1_300)).is_ok());
    }

    #[test]
    fn ties_reject() {
        let mut p = proposal(300);
        let now = Timestamp::new(1_001);
        p.record_vote(&EntityId::new("a"), VoteChoice::Yay, 2, now).unwrap();
        p.record_vote(&EntityId::new("b"), VoteChoice::Nay, 2, now).unwrap();
        assert_eq!(p.verdict(), TallyVerdict::Reject);
    }

    #[test]
    fn mark_executed_is_one_shot() {
        let mut p = proposal(0);
        p.mark_executed(ExecutionOutcome::Rejected).unwrap();
        assert!(p.executed);
        let err = p
            .mark_executed(ExecutionOutcome::Purchased { price: Amount::new(1) })
            .unwrap_err();
        assert!(matches!(err, GovernanceError::AlreadyExecuted(_)));
        assert_eq!(p.outcome, Some(ExecutionOutcome::Rejected));
    }

    #[test]
    fn executed_proposal_refuses_votes() {
        let mut p = proposal(300);
        p.mark_executed(ExecutionOutcome::Rejected).unwrap();
        assert!(matches!(
            p.check_vote(&EntityId::new("bob"), Timestamp::new(1_001)),
            Err(GovernanceError::VotingClosed { .. })
        ));
    }

    #[test]
    fn vote_choice_parses_common_spellings() {
        assert_eq!("YAY".parse::<VoteChoice>().unwrap(), VoteChoice::Yay);
        assert_eq!("no".parse::<VoteChoice>().unwrap(), VoteChoice::Nay);
        assert!("abstain".parse::<VoteChoice>().is_err());
    }
}
