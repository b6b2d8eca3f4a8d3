//! Repository layer for database operations.
//!
//! Methods are organized across submodules by domain:
//! - `transactions.rs` - the transaction store
//! - `holdings.rs` - persisted cost-basis states

mod holdings;
mod transactions;

use crate::domain::Decimal;
use sqlx::sqlite::SqlitePool;
use std::str::FromStr;

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Decimals are stored as canonical TEXT to stay lossless; SQLite REAL would round.
fn parse_decimal_column(raw: &str) -> Result<Decimal, rust_decimal::Error> {
    Decimal::from_str(raw)
}
