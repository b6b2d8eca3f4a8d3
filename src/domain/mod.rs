//! Domain types for the portfolio ledger.
//!
//! This module provides:
//! - Lossless numeric handling via Decimal wrapper
//! - Domain primitives: TimeMs, AssetId, TransactionId
//! - The closed TransactionKind set and boundary validation for new transactions
//! - Stable transaction ordering for deterministic evaluation

pub mod decimal;
pub mod ordering;
pub mod primitives;
pub mod transaction;

pub use decimal::Decimal;
pub use ordering::{is_chronological, sort_transactions_deterministic, TransactionOrderingKey};
pub use primitives::{AssetId, TimeMs, TransactionId};
pub use transaction::{
    NewTransaction, Transaction, TransactionKind, TransactionValidationError, UnknownKind,
};
