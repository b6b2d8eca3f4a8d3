//! Injected TTL cache for price quotes.

use super::{PriceSource, PriceSourceError};
use crate::domain::{AssetId, Decimal, TimeMs};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Quote cache keyed by asset. Callers supply `now`.
pub trait PriceCache: Send + Sync + fmt::Debug {
    fn get(&self, asset: &AssetId, now: TimeMs) -> Option<Decimal>;
    fn set(&self, asset: &AssetId, price: Decimal, now: TimeMs);
}

#[derive(Debug, Clone, Copy)]
struct CachedQuote {
    price: Decimal,
    stored_at: TimeMs,
}

/// In-memory cache whose entries expire `ttl_ms` after being stored.
#[derive(Debug)]
pub struct TtlPriceCache {
    ttl_ms: i64,
    entries: RwLock<HashMap<AssetId, CachedQuote>>,
}

impl TtlPriceCache {
    pub fn new(ttl_ms: i64) -> Self {
        Self {
            ttl_ms,
            entries: RwLock::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }
}

impl PriceCache for TtlPriceCache {
    fn get(&self, asset: &AssetId, now: TimeMs) -> Option<Decimal> {
        let entries = self.entries.read().ok()?;
        let quote = entries.get(asset)?;
        let age = now.as_ms().saturating_sub(quote.stored_at.as_ms());
        (age < self.ttl_ms).then_some(quote.price)
    }

    fn set(&self, asset: &AssetId, price: Decimal, now: TimeMs) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(
                asset.clone(),
                CachedQuote {
                    price,
                    stored_at: now,
                },
            );
        }
    }
}

/// Serves quotes from a [`PriceCache`], falling through to the inner source on a miss.
#[derive(Debug, Clone)]
pub struct CachedPriceSource {
    inner: Arc<dyn PriceSource>,
    cache: Arc<dyn PriceCache>,
}

impl CachedPriceSource {
    pub fn new(inner: Arc<dyn PriceSource>, cache: Arc<dyn PriceCache>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl PriceSource for CachedPriceSource {
    async fn fetch_price(&self, asset: &AssetId) -> Result<Option<Decimal>, PriceSourceError> {
        if let Some(price) = self.cache.get(asset, TimeMs::now()) {
            debug!(asset = %asset, price = %price, "price cache hit");
            return Ok(Some(price));
        }

        let price = self.inner.fetch_price(asset).await?;
        // "No quote" is never cached.
        if let Some(px) = price {
            self.cache.set(asset, px, TimeMs::now());
        }
        Ok(price)
    }
}
