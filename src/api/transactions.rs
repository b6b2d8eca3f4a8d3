use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::AppState;
use crate::domain::{AssetId, NewTransaction, TimeMs, Transaction, TransactionId};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsQuery {
    pub asset_id: Option<String>,
    pub from_ms: Option<i64>,
    pub to_ms: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsResponse {
    pub transactions: Vec<TransactionDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDto {
    pub id: String,
    pub asset_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub quantity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    pub created_at: i64,
}

impl From<Transaction> for TransactionDto {
    fn from(tx: Transaction) -> Self {
        Self {
            id: tx.id.to_string(),
            asset_id: tx.asset_id.to_string(),
            kind: tx.kind.as_str().to_string(),
            quantity: tx.quantity.to_canonical_string(),
            price: tx.price.map(|p| p.to_canonical_string()),
            created_at: tx.created_at.as_ms(),
        }
    }
}

pub async fn create_transaction(
    State(state): State<AppState>,
    payload: Result<Json<NewTransaction>, JsonRejection>,
) -> Result<(StatusCode, Json<TransactionDto>), AppError> {
    let Json(new_tx) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let tx = new_tx.validate(TimeMs::now())?;

    state.repo.insert_transaction(&tx).await?;
    state.valuator.refresh_holding(&tx.asset_id).await?;

    info!(tx_id = %tx.id, asset = %tx.asset_id, kind = %tx.kind, "transaction recorded");
    Ok((StatusCode::CREATED, Json(TransactionDto::from(tx))))
}

pub async fn list_transactions(
    Query(params): Query<TransactionsQuery>,
    State(state): State<AppState>,
) -> Result<Json<TransactionsResponse>, AppError> {
    let asset = params
        .asset_id
        .as_deref()
        .map(AssetId::normalize)
        .filter(|a| !a.is_empty());

    let from_ms = params.from_ms.map(TimeMs::new);
    let to_ms = params.to_ms.map(TimeMs::new);
    if let (Some(from), Some(to)) = (from_ms, to_ms) {
        if from > to {
            return Err(AppError::BadRequest("fromMs must be <= toMs".to_string()));
        }
    }

    let transactions = state
        .repo
        .query_transactions(asset.as_ref(), from_ms, to_ms)
        .await?;

    Ok(Json(TransactionsResponse {
        transactions: transactions.into_iter().map(TransactionDto::from).collect(),
    }))
}

pub async fn delete_transaction(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<TransactionDto>, AppError> {
    let id = TransactionId::new(id);
    let removed = state
        .repo
        .delete_transaction(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("transaction {}", id)))?;

    state.valuator.refresh_holding(&removed.asset_id).await?;

    info!(tx_id = %removed.id, asset = %removed.asset_id, "transaction deleted");
    Ok(Json(TransactionDto::from(removed)))
}
