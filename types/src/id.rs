//! Identifiers for proposals and marketplace assets.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::GavelError;

/// Monotonically assigned proposal identifier.
///
/// Ids start at zero and are never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProposalId(u64);

impl ProposalId {
    pub const FIRST: Self = Self(0);

    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }

    /// The id that follows this one.
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Big-endian bytes, so byte-ordered stores iterate in creation order.
    pub fn to_be_bytes(&self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    pub fn from_be_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_be_bytes(bytes))
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl FromStr for ProposalId {
    type Err = GavelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .trim_start_matches('#')
            .parse::<u64>()
            .map(Self)
            .map_err(|_| GavelError::InvalidProposalId(s.to_string()))
    }
}

/// Identifier of an asset listed on the external marketplace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssetId(u64);

impl AssetId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asset:{}", self.0)
    }
}

impl FromStr for AssetId {
    type Err = GavelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .trim_start_matches("asset:")
            .parse::<u64>()
            .map(Self)
            .map_err(|_| GavelError::InvalidAsset(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proposal_id_parses_with_or_without_hash() {
        assert_eq!("#7".parse::<ProposalId>().unwrap(), ProposalId::new(7));
        assert_eq!("7".parse::<ProposalId>().unwrap(), ProposalId::new(7));
        assert!("seven".parse::<ProposalId>().is_err());
    }

    #[test]
    fn proposal_id_bytes_sort_like_numbers() {
        let a = ProposalId::new(2).to_be_bytes();
        let b = ProposalId::new(256).to_be_bytes();
        assert!(a < b);
        assert_eq!(ProposalId::from_be_bytes(b), ProposalId::new(256));
    }

    #[test]
    fn asset_id_accepts_display_form() {
        let asset = AssetId::new(42);
        assert_eq!(asset.to_string().parse::<AssetId>().unwrap(), asset);
    }
}
