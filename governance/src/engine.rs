//! Core governance engine: proposal creation, weighted voting, and
//! one-shot execution against the marketplace and treasury.
//!
//! No lock is held across a collaborator call. Each operation samples what
//! it needs from the oracle or marketplace first, then performs a short
//! check-and-mutate step under the affected proposal's lock.

use std::sync::Arc;

use gavel_store::GovernanceStore;
use gavel_types::{Amount, AssetId, EntityId, GovernanceParams, ProposalId};
use gavel_utils::spans;
use tracing::Instrument;

use crate::clock::Clock;
use crate::codec::encode;
use crate::error::GovernanceError;
use crate::marketplace::MarketplaceClient;
use crate::oracle::BalanceOracle;
use crate::proposal::{ExecutionOutcome, Proposal, PurchaseFailure, TallyVerdict, VoteChoice};
use crate::registry::{ProposalIter, ProposalStore};
use crate::treasury::{Transfer, Treasury, TreasuryRecord};
use crate::weight::{sample_balance, LiveBalanceWeight, WeightPolicy};

/// External services the engine consumes but does not own.
#[derive(Clone)]
pub struct Collaborators {
    pub oracle: Arc<dyn BalanceOracle>,
    pub marketplace: Arc<dyn MarketplaceClient>,
    pub clock: Arc<dyn Clock>,
}

pub struct GovernanceEngine {
    params: GovernanceParams,
    proposals: ProposalStore,
    treasury: Treasury,
    oracle: Arc<dyn BalanceOracle>,
    marketplace: Arc<dyn MarketplaceClient>,
    clock: Arc<dyn Clock>,
    weight_policy: Arc<dyn WeightPolicy>,
    backend: Option<Arc<dyn GovernanceStore>>,
}

impl GovernanceEngine {
    /// A memory-only engine whose treasury starts with `params.initial_treasury`.
    pub fn new(params: GovernanceParams, owner: EntityId, collaborators: Collaborators) -> Self {
        let treasury = Treasury::new(owner, params.initial_treasury);
        Self::assemble(params, ProposalStore::new(), treasury, collaborators, None)
    }

    /// Set up fresh persistent state in `backend`.
    pub fn initialize(
        params: GovernanceParams,
        owner: EntityId,
        collaborators: Collaborators,
        backend: Arc<dyn GovernanceStore>,
    ) -> Result<Self, GovernanceError> {
        let treasury = Treasury::initialize(owner, params.initial_treasury, Arc::clone(&backend))?;
        let proposals = ProposalStore::load(Arc::clone(&backend))?;
        Ok(Self::assemble(params, proposals, treasury, collaborators, Some(backend)))
    }

    /// Reload persisted state from `backend`.
    pub fn restore(
        params: GovernanceParams,
        collaborators: Collaborators,
        backend: Arc<dyn GovernanceStore>,
    ) -> Result<Self, GovernanceError> {
        let treasury = Treasury::load(Arc::clone(&backend))?;
        let proposals = ProposalStore::load(Arc::clone(&backend))?;
        Ok(Self::assemble(params, proposals, treasury, collaborators, Some(backend)))
    }

    fn assemble(
        params: GovernanceParams,
        proposals: ProposalStore,
        treasury: Treasury,
        collaborators: Collaborators,
        backend: Option<Arc<dyn GovernanceStore>>,
    ) -> Self {
        Self {
            params,
            proposals,
            treasury,
            oracle: collaborators.oracle,
            marketplace: collaborators.marketplace,
            clock: collaborators.clock,
            weight_policy: Arc::new(LiveBalanceWeight),
            backend,
        }
    }

    /// Replace the vote weight policy.
    pub fn with_weight_policy(mut self, policy: Arc<dyn WeightPolicy>) -> Self {
        self.weight_policy = policy;
        self
    }

    pub fn params(&self) -> &GovernanceParams {
        &self.params
    }

    pub fn treasury(&self) -> &Treasury {
        &self.treasury
    }

    pub fn proposals(&self) -> &ProposalStore {
        &self.proposals
    }

    // ── Operations ─────────────────────────────────────────────────────

    /// Open a proposal to buy `target`. The requester must hold at least
    /// one eligibility token.
    pub async fn create_proposal(
        &self,
        target: AssetId,
        requester: &EntityId,
    ) -> Result<ProposalId, GovernanceError> {
        let span = spans::propose_span(requester.as_str(), &target.to_string());
        async {
            let balance = sample_balance(
                self.oracle.as_ref(),
                requester,
                self.params.oracle_timeout(),
            )
            .await?;
            self.require_eligible(requester, balance)?;

            if self.params.check_listing_on_create {
                self.require_listed(target).await?;
            }

            let created_at = self.clock.now();
            let period = self.params.voting_period_secs;
            let proposal = self.proposals.append_next(|id| {
                Proposal::new(id, target, requester.clone(), created_at, period)
            })?;
            tracing::info!(
                proposal_id = %proposal.id,
                asset_id = %target,
                deadline = %proposal.deadline,
                "proposal created"
            );
            Ok(proposal.id)
        }
        .instrument(span)
        .await
    }

    /// Cast `requester`'s vote, weighted by their current eligibility holdings.
    pub async fn vote(
        &self,
        id: ProposalId,
        requester: &EntityId,
        choice: VoteChoice,
    ) -> Result<(), GovernanceError> {
        let span = spans::vote_span(&id.to_string(), requester.as_str());
        async {
            let snapshot = self.proposals.get(id)?;
            if let Err(e) = snapshot.check_vote(requester, self.clock.now()) {
                tracing::debug!(error = %e, "vote refused");
                return Err(e);
            }

            let weight = self
                .weight_policy
                .weight(
                    self.oracle.as_ref(),
                    &snapshot,
                    requester,
                    self.params.oracle_timeout(),
                )
                .await?;
            self.require_eligible(requester, weight)?;

            // Preconditions are checked again under the lock: the deadline may
            // have passed or a concurrent vote from the same voter landed.
            let updated =
                self.proposals
                    .update_tally(id, requester, choice, weight, self.clock.now())?;
            tracing::info!(
                proposal_id = %id,
                voter = %requester,
                %choice,
                weight,
                yay = updated.yay_weight,
                nay = updated.nay_weight,
                "vote recorded"
            );
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Finalize a proposal whose voting window has closed.
    ///
    /// Each proposal gets exactly one attempt. A purchase that fails still
    /// marks the proposal executed and reports `PurchaseFailed`.
    pub async fn execute(&self, id: ProposalId) -> Result<ExecutionOutcome, GovernanceError> {
        let span = spans::execute_span(&id.to_string());
        self.execute_claimed(id).instrument(span).await
    }

    async fn execute_claimed(&self, id: ProposalId) -> Result<ExecutionOutcome, GovernanceError> {
        let proposal = match self.proposals.claim_execution(id, self.clock.now()) {
            Ok(proposal) => proposal,
            Err(e) => {
                tracing::debug!(error = %e, "execution refused");
                return Err(e);
            }
        };

        if proposal.verdict() == TallyVerdict::Reject {
            return self.finish_without_purchase(id, ExecutionOutcome::Rejected);
        }

        let price = self.params.purchase_price;
        let reservation = match self.treasury.reserve(price) {
            Ok(reservation) => reservation,
            Err(GovernanceError::InsufficientFunds { needed, available }) => {
                let outcome = ExecutionOutcome::PurchaseFailed(PurchaseFailure::InsufficientFunds {
                    needed,
                    available,
                });
                return self.finish_without_purchase(id, outcome);
            }
            Err(e) => {
                self.proposals.release_claim(id);
                return Err(e);
            }
        };

        let attempt = tokio::time::timeout(
            self.params.marketplace_timeout(),
            self.marketplace.purchase(proposal.target, price),
        )
        .await;

        let purchase = match attempt {
            Ok(Ok(purchase)) => purchase,
            Ok(Err(e)) => {
                self.treasury.release(reservation);
                tracing::warn!(asset_id = %proposal.target, error = %e, "purchase failed");
                return self.finish_after_failed_purchase(
                    id,
                    PurchaseFailure::Marketplace(e.to_string()),
                );
            }
            Err(_) => {
                self.treasury.release(reservation);
                tracing::warn!(
                    asset_id = %proposal.target,
                    timeout_ms = self.params.marketplace_timeout_ms,
                    "purchase timed out"
                );
                return self.finish_after_failed_purchase(id, PurchaseFailure::TimedOut);
            }
        };

        let charged = purchase.actual_price.min(price);
        let outcome = ExecutionOutcome::Purchased { price: charged };
        // The executed proposal and the debited treasury are written in one
        // transaction. If it fails neither changes, and the claim and the
        // reservation stay held.
        let (_, balance) = self
            .proposals
            .mark_executed_with(id, outcome.clone(), |executed| {
                self.treasury.settle(reservation, charged, |settled| {
                    self.write_purchase(executed, settled)
                })
            })
            .inspect_err(|e| {
                tracing::error!(error = %e, "purchase completed but could not be recorded");
            })?;
        tracing::info!(
            proposal_id = %id,
            asset_id = %proposal.target,
            price = %charged,
            treasury = %balance,
            "proposal executed: asset purchased"
        );
        Ok(outcome)
    }

    /// Store a completed purchase: the executed proposal and the settled
    /// treasury record in one backend transaction.
    fn write_purchase(
        &self,
        proposal: &Proposal,
        treasury: &TreasuryRecord,
    ) -> Result<(), GovernanceError> {
        if let Some(backend) = &self.backend {
            backend.commit_execution(proposal.id, &encode(proposal)?, &encode(treasury)?)?;
        }
        Ok(())
    }

    /// Commit an outcome that involved no marketplace call. On a storage
    /// failure the claim is released so the caller may retry.
    fn finish_without_purchase(
        &self,
        id: ProposalId,
        outcome: ExecutionOutcome,
    ) -> Result<ExecutionOutcome, GovernanceError> {
        if let Err(e) = self.proposals.mark_executed(id, outcome.clone()) {
            self.proposals.release_claim(id);
            return Err(e);
        }
        tracing::info!(proposal_id = %id, %outcome, "proposal executed");
        Ok(outcome)
    }

    /// Commit a failed purchase. The claim stays held even if the commit
    /// fails, so the marketplace is never called twice for one proposal.
    fn finish_after_failed_purchase(
        &self,
        id: ProposalId,
        failure: PurchaseFailure,
    ) -> Result<ExecutionOutcome, GovernanceError> {
        let outcome = ExecutionOutcome::PurchaseFailed(failure);
        self.proposals.mark_executed(id, outcome.clone())?;
        tracing::info!(proposal_id = %id, %outcome, "proposal executed");
        Ok(outcome)
    }

    /// Owner-only withdrawal of `amount`.
    pub fn withdraw(
        &self,
        requester: &EntityId,
        amount: Amount,
    ) -> Result<Transfer, GovernanceError> {
        let _guard = spans::withdraw_span(requester.as_str()).entered();
        self.treasury.withdraw(requester, amount)
    }

    /// Owner-only withdrawal of everything not reserved for a purchase.
    pub fn withdraw_all(&self, requester: &EntityId) -> Result<Transfer, GovernanceError> {
        let _guard = spans::withdraw_span(requester.as_str()).entered();
        self.treasury.withdraw_all(requester)
    }

    /// Deposit funds into the treasury.
    pub fn fund(&self, amount: Amount) -> Result<Amount, GovernanceError> {
        self.treasury.fund(amount)
    }

    // ── Reads ──────────────────────────────────────────────────────────

    pub fn get(&self, id: ProposalId) -> Result<Proposal, GovernanceError> {
        self.proposals.get(id)
    }

    /// Every proposal in creation order. See [`ProposalStore::list_all`].
    pub fn list_all(&self) -> ProposalIter {
        self.proposals.list_all()
    }

    pub fn proposal_count(&self) -> usize {
        self.proposals.len()
    }

    /// What executing `id` would decide from the current tally.
    pub fn preview(&self, id: ProposalId) -> Result<TallyVerdict, GovernanceError> {
        Ok(self.proposals.get(id)?.verdict())
    }

    pub fn is_owner(&self, entity: &EntityId) -> bool {
        self.treasury.is_owner(entity)
    }

    // ── Helpers ────────────────────────────────────────────────────────

    fn require_eligible(&self, entity: &EntityId, balance: u64) -> Result<u64, GovernanceError> {
        let required = self.params.min_eligibility_balance.max(1);
        if balance < required {
            tracing::debug!(%entity, balance, required, "not eligible");
            return Err(GovernanceError::InsufficientEligibility {
                entity: entity.clone(),
                balance,
                required,
            });
        }
        Ok(balance)
    }

    async fn require_listed(&self, target: AssetId) -> Result<(), GovernanceError> {
        let listed = tokio::time::timeout(
            self.params.marketplace_timeout(),
            self.marketplace.is_available(target),
        )
        .await;
        match listed {
            Ok(Ok(true)) => Ok(()),
            Ok(Ok(false)) => Err(GovernanceError::MarketplaceFailure(format!(
                "{} is not for sale",
                target
            ))),
            Ok(Err(e)) => Err(GovernanceError::MarketplaceFailure(e.to_string())),
            Err(_) => Err(GovernanceError::MarketplaceFailure(format!(
                "availability check timed out after {}ms",
                self.params.marketplace_timeout_ms
            ))),
        }
    }
}
