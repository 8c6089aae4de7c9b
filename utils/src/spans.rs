//! Pre-built [`tracing::Span`] constructors for governance operations.
//!
//! Consistent span names and field sets make it easy to correlate the log
//! lines of one operation across the engine, the treasury, and collaborators.

use tracing::{info_span, Span};

/// Span covering a single `create_proposal` call.
pub fn propose_span(requester: &str, asset: &str) -> Span {
    info_span!("propose", requester = %requester, asset = %asset)
}

/// Span covering a single vote.
pub fn vote_span(proposal: &str, voter: &str) -> Span {
    info_span!("vote", proposal = %proposal, voter = %voter)
}

/// Span covering the execution of one proposal.
pub fn execute_span(proposal: &str) -> Span {
    info_span!("execute", proposal = %proposal)
}

/// Span covering a treasury withdrawal.
pub fn withdraw_span(requester: &str) -> Span {
    info_span!("withdraw", requester = %requester)
}
