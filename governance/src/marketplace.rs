//! Marketplace port and the fixed-price marketplace used by local deployments.

use std::collections::HashSet;

use async_trait::async_trait;
use gavel_types::{Amount, AssetId};
use parking_lot::Mutex;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum MarketplaceError {
    #[error("{0} is not for sale")]
    NotForSale(AssetId),

    #[error("price {price} exceeds the offered maximum {max_price}")]
    PriceExceeded { price: Amount, max_price: Amount },

    #[error("marketplace unavailable: {0}")]
    Unavailable(String),
}

/// A completed purchase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Purchase {
    pub asset: AssetId,
    pub actual_price: Amount,
}

/// The external marketplace that fulfils purchases.
///
/// Idempotency is the implementation's concern; the engine calls
/// [`MarketplaceClient::purchase`] at most once per proposal.
#[async_trait]
pub trait MarketplaceClient: Send + Sync {
    /// Current asking price.
    async fn price(&self) -> Result<Amount, MarketplaceError>;

    /// Whether `asset` can currently be bought.
    async fn is_available(&self, asset: AssetId) -> Result<bool, MarketplaceError>;

    /// Buy `asset`, paying at most `max_price`.
    async fn purchase(&self, asset: AssetId, max_price: Amount)
        -> Result<Purchase, MarketplaceError>;
}

/// Sells every asset at one fixed price, each asset at most once.
pub struct FixedPriceMarketplace {
    price: Amount,
    /// When set, only these assets are for sale.
    catalogue: Option<HashSet<AssetId>>,
    sold: Mutex<HashSet<AssetId>>,
}

impl FixedPriceMarketplace {
    pub fn new(price: Amount) -> Self {
        Self {
            price,
            catalogue: None,
            sold: Mutex::new(HashSet::new()),
        }
    }

    /// Restrict sales to the listed assets.
    pub fn with_catalogue(mut self, assets: impl IntoIterator<Item = AssetId>) -> Self {
        self.catalogue = Some(assets.into_iter().collect());
        self
    }

    /// Mark assets as already sold (e.g. reloaded from purchase history).
    pub fn with_sold(self, assets: impl IntoIterator<Item = AssetId>) -> Self {
        self.mark_sold(assets);
        self
    }

    /// Record assets sold outside this instance's lifetime.
    pub fn mark_sold(&self, assets: impl IntoIterator<Item = AssetId>) {
        self.sold.lock().extend(assets);
    }

    pub fn sold_count(&self) -> usize {
        self.sold.lock().len()
    }

    fn listed(&self, asset: AssetId) -> bool {
        self.catalogue
            .as_ref()
            .map_or(true, |catalogue| catalogue.contains(&asset))
    }
}

#[async_trait]
impl MarketplaceClient for FixedPriceMarketplace {
    async fn price(&self) -> Result<Amount, MarketplaceError> {
        Ok(self.price)
    }

    async fn is_available(&self, asset: AssetId) -> Result<bool, MarketplaceError> {
        Ok(self.listed(asset) && !self.sold.lock().contains(&asset))
    }

    async fn purchase(
        &self,
        asset: AssetId,
        max_price: Amount,
    ) -> Result<Purchase, MarketplaceError> {
        if max_price < self.price {
            return Err(MarketplaceError::PriceExceeded {
                price: self.price,
                max_price,
            });
        }
        if !self.listed(asset) || !self.sold.lock().insert(asset) {
            return Err(MarketplaceError::NotForSale(asset));
        }
        tracing::debug!(asset = %asset, price = %self.price, "asset sold");
        Ok(Purchase {
            asset,
            actual_price: self.price,
        })
    }
}
