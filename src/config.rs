use std::collections::HashMap;
use thiserror::Error;

pub const DEFAULT_PRICE_API_URL: &str = "https://api.coingecko.com/api/v3";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub price_api_url: String,
    pub quote_currency: String,
    pub price_cache_ttl_ms: i64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let price_api_url = env_map
            .get("PRICE_API_URL")
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| DEFAULT_PRICE_API_URL.to_string());
        if !price_api_url.starts_with("http://") && !price_api_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "PRICE_API_URL".to_string(),
                format!("must be an http(s) URL, got {}", price_api_url),
            ));
        }

        let quote_currency = env_map
            .get("QUOTE_CURRENCY")
            .map(|s| s.trim().to_lowercase())
            .unwrap_or_else(|| "usd".to_string());
        if quote_currency.is_empty() {
            return Err(ConfigError::InvalidValue(
                "QUOTE_CURRENCY".to_string(),
                "must not be empty".to_string(),
            ));
        }

        let price_cache_ttl_ms = env_map
            .get("PRICE_CACHE_TTL_MS")
            .map(|s| s.as_str())
            .unwrap_or("60000")
            .parse::<i64>()
            .ok()
            .filter(|ttl| *ttl >= 0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "PRICE_CACHE_TTL_MS".to_string(),
                    "must be a non-negative i64".to_string(),
                )
            })?;

        Ok(Config {
            port,
            database_path,
            price_api_url,
            quote_currency,
            price_cache_ttl_ms,
        })
    }
}
