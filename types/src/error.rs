//! Top-level error type shared across crates.

use thiserror::Error;

/// Errors raised while parsing or validating the foundational types.
#[derive(Debug, Error)]
pub enum GavelError {
    #[error("invalid entity id: {0:?}")]
    InvalidEntity(String),

    #[error("invalid asset id: {0:?}")]
    InvalidAsset(String),

    #[error("invalid proposal id: {0:?}")]
    InvalidProposalId(String),

    #[error("invalid amount: {0:?}")]
    InvalidAmount(String),

    #[error("invalid vote choice: {0:?} (expected yay or nay)")]
    InvalidChoice(String),
}
