//! HTTP quote client for CoinGecko-compatible `simple/price` endpoints.

use super::{PriceSource, PriceSourceError};
use crate::domain::{AssetId, Decimal};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct HttpPriceSource {
    client: Client,
    base_url: String,
    quote_currency: String,
}

impl HttpPriceSource {
    pub fn new(base_url: String, quote_currency: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            quote_currency: quote_currency.to_lowercase(),
        }
    }

    async fn get_simple_price(&self, asset: &AssetId) -> Result<serde_json::Value, PriceSourceError> {
        let url = format!("{}/simple/price", self.base_url);
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(10)),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self
                .client
                .get(&url)
                .query(&[
                    ("ids", asset.as_str()),
                    ("vs_currencies", self.quote_currency.as_str()),
                ])
                .send()
                .await
                .map_err(|e| {
                    backoff::Error::transient(PriceSourceError::NetworkError(e.to_string()))
                })?;

            let status = response.status();
            if status == 429 {
                return Err(backoff::Error::transient(PriceSourceError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(PriceSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(PriceSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| backoff::Error::permanent(PriceSourceError::ParseError(e.to_string())))
        })
        .await
    }
}

#[async_trait]
impl PriceSource for HttpPriceSource {
    async fn fetch_price(&self, asset: &AssetId) -> Result<Option<Decimal>, PriceSourceError> {
        debug!(asset = %asset, currency = %self.quote_currency, "fetching price quote");
        let body = self.get_simple_price(asset).await?;
        parse_simple_price(&body, asset, &self.quote_currency)
    }
}

/// Extract `body[asset][currency]` from a `simple/price` response.
///
/// A missing entry is "no quote", not an error.
fn parse_simple_price(
    body: &serde_json::Value,
    asset: &AssetId,
    currency: &str,
) -> Result<Option<Decimal>, PriceSourceError> {
    let Some(quote) = body.get(asset.as_str()).and_then(|q| q.get(currency)) else {
        return Ok(None);
    };

    let raw = match quote {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => return Ok(None),
        other => {
            return Err(PriceSourceError::ParseError(format!(
                "unexpected quote value: {}",
                other
            )))
        }
    };

    Decimal::from_str_canonical(&raw)
        .map(Some)
        .map_err(|e| PriceSourceError::ParseError(format!("Invalid price {}: {}", raw, e)))
}
