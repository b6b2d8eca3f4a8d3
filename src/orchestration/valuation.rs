use crate::db::Repository;
use crate::domain::{
    is_chronological, sort_transactions_deterministic, AssetId, Decimal, TimeMs, Transaction,
};
use crate::engine::{self, CostBasisState, ProcessResult};
use crate::pricing::PriceSource;
use futures::future::join_all;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Ties the transaction store and the price source to the ledger engine.
#[derive(Clone)]
pub struct Valuator {
    repo: Arc<Repository>,
    prices: Arc<dyn PriceSource>,
}

impl Valuator {
    pub fn new(repo: Arc<Repository>, prices: Arc<dyn PriceSource>) -> Self {
        Self { repo, prices }
    }

    /// Current price for an asset, or `None` when it cannot be determined.
    /// Quote failures are logged and treated as an unknown price.
    pub async fn resolve_price(&self, asset: &AssetId) -> Option<Decimal> {
        match self.prices.fetch_price(asset).await {
            Ok(price) => price,
            Err(e) => {
                warn!(asset = %asset, error = %e, "price lookup failed, unrealized P&L unavailable");
                None
            }
        }
    }

    /// The asset's full history, oldest first with ties broken by id.
    async fn load_history(&self, asset: &AssetId) -> Result<Vec<Transaction>, ValuationError> {
        let mut transactions = self.repo.query_asset_history(asset).await?;
        if !is_chronological(&transactions) {
            sort_transactions_deterministic(&mut transactions);
        }
        Ok(transactions)
    }

    /// Recompute an asset from its full history and mark it to market.
    ///
    /// `price_override` takes precedence over the price source.
    pub async fn value_asset(
        &self,
        asset: &AssetId,
        price_override: Option<Decimal>,
    ) -> Result<ProcessResult, ValuationError> {
        let transactions = self.load_history(asset).await?;

        let price = match price_override {
            Some(px) => Some(px),
            None => self.resolve_price(asset).await,
        };

        debug!(
            asset = %asset,
            transactions = transactions.len(),
            price = ?price,
            "evaluating asset"
        );
        Ok(engine::evaluate(asset, &transactions, price))
    }

    /// Recompute and persist the cost basis of an asset after its history changed.
    ///
    /// Returns `None` (and drops the stored holding) when no transactions remain.
    pub async fn refresh_holding(
        &self,
        asset: &AssetId,
    ) -> Result<Option<CostBasisState>, ValuationError> {
        let transactions = self.load_history(asset).await?;
        if transactions.is_empty() {
            self.repo.delete_holding(asset).await?;
            info!(asset = %asset, "holding removed, no transactions left");
            return Ok(None);
        }

        let state = engine::process_transactions(asset, &transactions);
        self.repo.upsert_holding(&state, TimeMs::now()).await?;

        info!(
            asset = %asset,
            total_quantity = %state.total_quantity,
            avg_cost = %state.avg_cost,
            realized_pnl = %state.realized_pnl,
            "holding refreshed"
        );
        Ok(Some(state))
    }

    /// Recompute every stored holding from the transaction store.
    ///
    /// Returns the number of assets refreshed.
    pub async fn rebuild_holdings(&self) -> Result<usize, ValuationError> {
        let assets = self.repo.query_distinct_assets().await?;
        let mut refreshed = 0;

        for asset in &assets {
            if self.refresh_holding(asset).await?.is_some() {
                refreshed += 1;
            }
        }

        let orphaned = self
            .repo
            .query_holdings()
            .await?
            .into_iter()
            .filter(|h| !assets.contains(&h.asset_id));
        for holding in orphaned {
            self.repo.delete_holding(&holding.asset_id).await?;
            warn!(asset = %holding.asset_id, "dropped holding with no transactions");
        }

        info!(assets = refreshed, "holdings rebuilt");
        Ok(refreshed)
    }

    /// Mark every persisted holding against its current price.
    ///
    /// Quotes are fetched concurrently; each holding degrades independently
    /// when its quote is unavailable.
    pub async fn value_portfolio(&self) -> Result<Vec<ProcessResult>, ValuationError> {
        let holdings = self.repo.query_holdings().await?;
        let prices = join_all(holdings.iter().map(|h| self.resolve_price(&h.asset_id))).await;

        Ok(holdings
            .into_iter()
            .zip(prices)
            .map(|(state, price)| engine::compute_unrealized(state, price))
            .collect())
    }
}

#[derive(Debug, Error)]
pub enum ValuationError {
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}
