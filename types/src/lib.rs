//! Fundamental types for the Gavel governance engine.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! entity and asset identifiers, proposal ids, amounts, timestamps, and the
//! governance parameters.

pub mod address;
pub mod amount;
pub mod error;
pub mod id;
pub mod params;
pub mod time;

pub use address::EntityId;
pub use amount::Amount;
pub use error::GavelError;
pub use id::{AssetId, ProposalId};
pub use params::GovernanceParams;
pub use time::Timestamp;
