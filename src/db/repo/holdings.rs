//! Persisted cost-basis states.

use crate::domain::{AssetId, TimeMs};
use crate::engine::CostBasisState;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::warn;

use super::{parse_decimal_column, Repository};

impl Repository {
    /// Store the latest recomputed state for an asset, replacing any previous one.
    ///
    /// # Errors
    /// Returns an error if the upsert fails.
    pub async fn upsert_holding(
        &self,
        state: &CostBasisState,
        updated_at: TimeMs,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO holdings (asset_id, total_quantity, avg_cost, realized_pnl, fees, updated_ms)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(asset_id) DO UPDATE SET
                total_quantity = excluded.total_quantity,
                avg_cost = excluded.avg_cost,
                realized_pnl = excluded.realized_pnl,
                fees = excluded.fees,
                updated_ms = excluded.updated_ms
            "#,
        )
        .bind(state.asset_id.as_str())
        .bind(state.total_quantity.to_canonical_string())
        .bind(state.avg_cost.to_canonical_string())
        .bind(state.realized_pnl.to_canonical_string())
        .bind(state.fees.to_canonical_string())
        .bind(updated_at.as_ms())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// # Errors
    /// Returns an error if the query fails.
    pub async fn get_holding(&self, asset: &AssetId) -> Result<Option<CostBasisState>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT asset_id, total_quantity, avg_cost, realized_pnl, fees
            FROM holdings
            WHERE asset_id = ?
            "#,
        )
        .bind(asset.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().and_then(row_to_state))
    }

    /// All persisted holdings ordered by asset id.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn query_holdings(&self) -> Result<Vec<CostBasisState>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT asset_id, total_quantity, avg_cost, realized_pnl, fees
            FROM holdings
            ORDER BY asset_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().filter_map(row_to_state).collect())
    }

    /// # Errors
    /// Returns an error if the delete fails.
    pub async fn delete_holding(&self, asset: &AssetId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM holdings WHERE asset_id = ?")
            .bind(asset.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn row_to_state(row: &SqliteRow) -> Option<CostBasisState> {
    let asset_id: String = row.get("asset_id");

    let column = |name: &str| {
        let raw: String = row.get(name);
        parse_decimal_column(&raw)
            .map_err(|e| {
                warn!(asset = %asset_id, column = name, value = %raw, error = %e, "unreadable holding column");
            })
            .ok()
    };

    Some(CostBasisState {
        total_quantity: column("total_quantity")?,
        avg_cost: column("avg_cost")?,
        realized_pnl: column("realized_pnl")?,
        fees: column("fees")?,
        asset_id: AssetId::new(asset_id.clone()),
    })
}
