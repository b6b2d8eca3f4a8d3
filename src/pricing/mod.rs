//! Price source abstraction for fetching current asset quotes.

use crate::domain::{AssetId, Decimal};
use async_trait::async_trait;
use std::fmt;

pub mod cache;
pub mod http;
pub mod mock;

pub use cache::{CachedPriceSource, PriceCache, TtlPriceCache};
pub use http::HttpPriceSource;
pub use mock::MockPriceSource;

/// Source of current unit prices, quoted in the same currency as transaction prices.
#[async_trait]
pub trait PriceSource: Send + Sync + fmt::Debug {
    /// Fetch the current unit price for an asset.
    ///
    /// # Returns
    /// `Ok(None)` when the source has no quote for the asset.
    async fn fetch_price(&self, asset: &AssetId) -> Result<Option<Decimal>, PriceSourceError>;
}

/// Error type for price source operations.
#[derive(Debug, Clone)]
pub enum PriceSourceError {
    /// Network error (e.g., connection timeout, DNS failure)
    NetworkError(String),
    /// HTTP error (e.g., 404, 5xx server error)
    HttpError { status: u16, message: String },
    /// Invalid JSON or malformed quote
    ParseError(String),
    /// Rate limit exceeded
    RateLimited,
}

impl fmt::Display for PriceSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceSourceError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            PriceSourceError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            PriceSourceError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            PriceSourceError::RateLimited => write!(f, "Rate limited"),
        }
    }
}

impl std::error::Error for PriceSourceError {}
