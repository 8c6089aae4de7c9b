//! Nullable marketplace: records purchases instead of making them.

use async_trait::async_trait;
use gavel_governance::{MarketplaceClient, MarketplaceError, Purchase};
use gavel_types::{Amount, AssetId};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// How purchases are answered.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum MarketplaceMode {
    #[default]
    Normal,
    /// Every purchase fails as unavailable with this reason.
    Fail(String),
    /// Every asset is reported as not for sale.
    NothingForSale,
}

/// A marketplace that sells anything at the configured price.
pub struct NullMarketplace {
    price: Amount,
    /// Price reported on success, when different from `price`.
    actual_price: Mutex<Option<Amount>>,
    mode: Mutex<MarketplaceMode>,
    delay: Mutex<Option<Duration>>,
    purchases: Mutex<Vec<Purchase>>,
    calls: AtomicUsize,
}

impl NullMarketplace {
    pub fn new(price: Amount) -> Self {
        Self {
            price,
            actual_price: Mutex::new(None),
            mode: Mutex::new(MarketplaceMode::Normal),
            delay: Mutex::new(None),
            purchases: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_mode(&self, mode: MarketplaceMode) {
        *self.mode.lock() = mode;
    }

    /// Charge this instead of the list price on successful purchases.
    pub fn set_actual_price(&self, price: Amount) {
        *self.actual_price.lock() = Some(price);
    }

    /// Sleep this long before answering each purchase.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    /// Number of `purchase` calls, successful or not.
    pub fn purchase_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Completed purchases, in order.
    pub fn purchases(&self) -> Vec<Purchase> {
        self.purchases.lock().clone()
    }
}

#[async_trait]
impl MarketplaceClient for NullMarketplace {
    async fn price(&self) -> Result<Amount, MarketplaceError> {
        Ok(self.price)
    }

    async fn is_available(&self, _asset: AssetId) -> Result<bool, MarketplaceError> {
        let mode = self.mode.lock().clone();
        match mode {
            MarketplaceMode::Normal => Ok(true),
            MarketplaceMode::NothingForSale => Ok(false),
            MarketplaceMode::Fail(reason) => Err(MarketplaceError::Unavailable(reason)),
        }
    }

    async fn purchase(
        &self,
        asset: AssetId,
        max_price: Amount,
    ) -> Result<Purchase, MarketplaceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mode = self.mode.lock().clone();
        match mode {
            MarketplaceMode::Normal => {}
            MarketplaceMode::NothingForSale => return Err(MarketplaceError::NotForSale(asset)),
            MarketplaceMode::Fail(reason) => return Err(MarketplaceError::Unavailable(reason)),
        }
        if max_price < self.price {
            return Err(MarketplaceError::PriceExceeded {
                price: self.price,
                max_price,
            });
        }
        let actual_price = self.actual_price.lock().unwrap_or(self.price);
        let purchase = Purchase {
            asset,
            actual_price,
        };
        self.purchases.lock().push(purchase);
        Ok(purchase)
    }
}
