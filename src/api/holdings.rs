use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::domain::{AssetId, Decimal};
use crate::engine::ProcessResult;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct HoldingQuery {
    pub price: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingDto {
    pub asset_id: String,
    pub total_quantity: String,
    pub avg_cost: String,
    pub realized_pnl: String,
    pub fees: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unrealized_pnl: Option<String>,
}

impl From<ProcessResult> for HoldingDto {
    fn from(result: ProcessResult) -> Self {
        let state = result.state;
        Self {
            asset_id: state.asset_id.to_string(),
            total_quantity: state.total_quantity.to_canonical_string(),
            avg_cost: state.avg_cost.to_canonical_string(),
            realized_pnl: state.realized_pnl.to_canonical_string(),
            fees: state.fees.to_canonical_string(),
            unrealized_pnl: result.unrealized_pnl.map(|p| p.to_canonical_string()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingsResponse {
    pub holdings: Vec<HoldingDto>,
    pub total_realized_pnl: String,
    pub total_fees: String,
}

fn parse_price_override(raw: Option<&str>) -> Result<Option<Decimal>, AppError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    Decimal::from_str_canonical(raw)
        .ok()
        .and_then(Decimal::positive)
        .map(Some)
        .ok_or_else(|| AppError::BadRequest("price must be a positive number".to_string()))
}

/// Full recompute of one asset from its transaction history.
pub async fn get_holding(
    Path(asset_id): Path<String>,
    Query(params): Query<HoldingQuery>,
    State(state): State<AppState>,
) -> Result<Json<HoldingDto>, AppError> {
    let asset = AssetId::normalize(&asset_id);
    if asset.is_empty() {
        return Err(AppError::BadRequest("Invalid asset id".to_string()));
    }
    let price_override = parse_price_override(params.price.as_deref())?;

    let result = state.valuator.value_asset(&asset, price_override).await?;
    Ok(Json(HoldingDto::from(result)))
}

/// Persisted holdings marked to market.
pub async fn list_holdings(State(state): State<AppState>) -> Result<Json<HoldingsResponse>, AppError> {
    let results = state.valuator.value_portfolio().await?;

    let mut total_realized_pnl = Decimal::zero();
    let mut total_fees = Decimal::zero();
    for result in &results {
        total_realized_pnl = total_realized_pnl
            .checked_add(result.state.realized_pnl)
            .ok_or_else(|| AppError::Internal("portfolio realized P&L overflows".to_string()))?;
        total_fees = total_fees
            .checked_add(result.state.fees)
            .ok_or_else(|| AppError::Internal("portfolio fees overflow".to_string()))?;
    }

    Ok(Json(HoldingsResponse {
        holdings: results.into_iter().map(HoldingDto::from).collect(),
        total_realized_pnl: total_realized_pnl.to_canonical_string(),
        total_fees: total_fees.to_canonical_string(),
    }))
}
