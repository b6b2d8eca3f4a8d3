//! Mock price source for testing without network calls.

use super::{PriceSource, PriceSourceError};
use crate::domain::{AssetId, Decimal};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Mock price source that returns predefined quotes.
#[derive(Debug, Clone, Default)]
pub struct MockPriceSource {
    prices: HashMap<AssetId, Decimal>,
    failure: Option<PriceSourceError>,
    calls: Arc<AtomicUsize>,
}

impl MockPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Quote `price` for `asset`.
    pub fn with_price(mut self, asset: &str, price: Decimal) -> Self {
        self.prices.insert(AssetId::new(asset), price);
        self
    }

    /// Make every fetch fail with `error`.
    pub fn with_failure(mut self, error: PriceSourceError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Number of fetches served so far, including failed ones.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceSource for MockPriceSource {
    async fn fetch_price(&self, asset: &AssetId) -> Result<Option<Decimal>, PriceSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        Ok(self.prices.get(asset).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_returns_configured_price() {
        let source = MockPriceSource::new().with_price("bitcoin", Decimal::from(12000));

        let price = source.fetch_price(&AssetId::new("bitcoin")).await.unwrap();
        assert_eq!(price, Some(Decimal::from(12000)));

        let missing = source.fetch_price(&AssetId::new("ethereum")).await.unwrap();
        assert_eq!(missing, None);
        assert_eq!(source.call_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let source = MockPriceSource::new().with_failure(PriceSourceError::RateLimited);
        let result = source.fetch_price(&AssetId::new("bitcoin")).await;
        assert!(matches!(result, Err(PriceSourceError::RateLimited)));
    }
}
