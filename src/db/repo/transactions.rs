//! Transaction store operations for the repository.

use crate::domain::{AssetId, TimeMs, Transaction, TransactionId, TransactionKind};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::str::FromStr;
use tracing::warn;

use super::{parse_decimal_column, Repository};

const INSERT_TRANSACTION_SQL: &str = r#"
    INSERT INTO transactions (id, asset_id, kind, quantity, price, created_at_ms)
    VALUES (?, ?, ?, ?, ?, ?)
    ON CONFLICT(id) DO NOTHING
"#;

impl Repository {
    /// Insert a transaction idempotently.
    ///
    /// Returns false when a transaction with the same id already exists.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_transaction(&self, tx: &Transaction) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(INSERT_TRANSACTION_SQL)
            .bind(tx.id.as_str())
            .bind(tx.asset_id.as_str())
            .bind(tx.kind.as_str())
            .bind(tx.quantity.to_canonical_string())
            .bind(tx.price.map(|p| p.to_canonical_string()))
            .bind(tx.created_at.as_ms())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Insert multiple transactions in a single SQL transaction.
    ///
    /// Returns the number of newly inserted rows (excludes duplicates).
    ///
    /// # Errors
    /// Returns an error if the transaction fails.
    pub async fn insert_transactions_batch(
        &self,
        transactions: &[Transaction],
    ) -> Result<usize, sqlx::Error> {
        if transactions.is_empty() {
            return Ok(0);
        }

        let mut total_inserted = 0usize;
        let mut db_tx = self.pool.begin().await?;

        for tx in transactions {
            let result = sqlx::query(INSERT_TRANSACTION_SQL)
                .bind(tx.id.as_str())
                .bind(tx.asset_id.as_str())
                .bind(tx.kind.as_str())
                .bind(tx.quantity.to_canonical_string())
                .bind(tx.price.map(|p| p.to_canonical_string()))
                .bind(tx.created_at.as_ms())
                .execute(&mut *db_tx)
                .await?;

            if result.rows_affected() > 0 {
                total_inserted += 1;
            }
        }

        db_tx.commit().await?;
        Ok(total_inserted)
    }

    /// # Errors
    /// Returns an error if the query fails.
    pub async fn get_transaction(
        &self,
        id: &TransactionId,
    ) -> Result<Option<Transaction>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, asset_id, kind, quantity, price, created_at_ms
            FROM transactions
            WHERE id = ?
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().and_then(row_to_transaction))
    }

    /// Delete a transaction, returning the removed row if it existed.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn delete_transaction(
        &self,
        id: &TransactionId,
    ) -> Result<Option<Transaction>, sqlx::Error> {
        let existing = self.get_transaction(id).await?;
        if existing.is_some() {
            sqlx::query("DELETE FROM transactions WHERE id = ?")
                .bind(id.as_str())
                .execute(&self.pool)
                .await?;
        }
        Ok(existing)
    }

    /// Query transactions with optional asset and time window, oldest first.
    ///
    /// Rows that cannot be decoded are skipped with a warning.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn query_transactions(
        &self,
        asset: Option<&AssetId>,
        from_ms: Option<TimeMs>,
        to_ms: Option<TimeMs>,
    ) -> Result<Vec<Transaction>, sqlx::Error> {
        let from_ms = from_ms.unwrap_or(TimeMs::new(0)).as_ms();
        let to_ms = to_ms.unwrap_or(TimeMs::new(i64::MAX)).as_ms();

        let rows = match asset {
            Some(asset) => {
                sqlx::query(
                    r#"
                    SELECT id, asset_id, kind, quantity, price, created_at_ms
                    FROM transactions
                    WHERE asset_id = ? AND created_at_ms >= ? AND created_at_ms <= ?
                    ORDER BY created_at_ms ASC, id ASC
                    "#,
                )
                .bind(asset.as_str())
                .bind(from_ms)
                .bind(to_ms)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT id, asset_id, kind, quantity, price, created_at_ms
                    FROM transactions
                    WHERE created_at_ms >= ? AND created_at_ms <= ?
                    ORDER BY created_at_ms ASC, id ASC
                    "#,
                )
                .bind(from_ms)
                .bind(to_ms)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.iter().filter_map(row_to_transaction).collect())
    }

    /// Full history of one asset, in the order the ledger engine expects.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn query_asset_history(&self, asset: &AssetId) -> Result<Vec<Transaction>, sqlx::Error> {
        self.query_transactions(Some(asset), None, None).await
    }

    /// # Errors
    /// Returns an error if the query fails.
    pub async fn query_distinct_assets(&self) -> Result<Vec<AssetId>, sqlx::Error> {
        let rows = sqlx::query("SELECT DISTINCT asset_id FROM transactions ORDER BY asset_id ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| AssetId::new(row.get::<String, _>("asset_id")))
            .collect())
    }
}

fn row_to_transaction(row: &SqliteRow) -> Option<Transaction> {
    let id: String = row.get("id");
    let asset_id: String = row.get("asset_id");
    let kind_str: String = row.get("kind");
    let quantity_str: String = row.get("quantity");
    let price_str: Option<String> = row.get("price");
    let created_at_ms: i64 = row.get("created_at_ms");

    let kind = match TransactionKind::from_str(&kind_str) {
        Ok(kind) => kind,
        Err(e) => {
            warn!(tx_id = %id, error = %e, "skipping stored transaction with unknown type");
            return None;
        }
    };

    let quantity = match parse_decimal_column(&quantity_str) {
        Ok(q) => q,
        Err(e) => {
            warn!(tx_id = %id, quantity = %quantity_str, error = %e, "skipping stored transaction with bad quantity");
            return None;
        }
    };

    // An unreadable price degrades to "unknown" rather than dropping the quantity.
    let price = price_str.and_then(|raw| match parse_decimal_column(&raw) {
        Ok(p) => Some(p),
        Err(e) => {
            warn!(tx_id = %id, price = %raw, error = %e, "ignoring unparsable stored price");
            None
        }
    });

    Some(Transaction::new(
        TransactionId::new(id),
        AssetId::new(asset_id),
        kind,
        quantity,
        price,
        TimeMs::new(created_at_ms),
    ))
}
