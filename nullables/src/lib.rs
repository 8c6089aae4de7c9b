//! Nullable infrastructure for deterministic testing.
//!
//! Every collaborator the governance engine consumes (clock, balance
//! oracle, marketplace, storage) has a test-friendly implementation here
//! that:
//! - Returns deterministic values
//! - Can be controlled programmatically, including failure injection
//! - Records what it was asked to do, for assertions
//! - Never touches the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod marketplace;
pub mod oracle;
pub mod store;

pub use clock::NullClock;
pub use marketplace::{MarketplaceMode, NullMarketplace};
pub use oracle::{NullBalanceOracle, OracleMode};
pub use store::NullGovernanceStore;
