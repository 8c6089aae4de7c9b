//! Entity identifier for token holders, voters, and the treasury owner.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::GavelError;

/// An opaque account identifier as issued by the surrounding ledger.
///
/// The engine never interprets the contents; it only compares identifiers
/// for equality (double-vote guard, owner check) and hands them to the
/// balance oracle.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(String);

impl EntityId {
    /// Create a new entity id from a raw string.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Return the raw identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate that this identifier is well-formed (non-empty, no whitespace).
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty() && !self.0.chars().any(char::is_whitespace)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl FromStr for EntityId {
    type Err = GavelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = Self::new(s.trim());
        if id.is_valid() {
            Ok(id)
        } else {
            Err(GavelError::InvalidEntity(s.to_string()))
        }
    }
}
