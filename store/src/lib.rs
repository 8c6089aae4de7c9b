//! Abstract storage traits for the Gavel governance engine.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The engine depends only on the traits and stores opaque,
//! already-encoded records.

pub mod error;
pub mod governance;
pub mod meta;

pub use error::StoreError;
pub use governance::GovernanceStore;
pub use meta::MetaStore;
