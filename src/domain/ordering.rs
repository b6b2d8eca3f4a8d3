//! Stable transaction ordering for deterministic cost-basis evaluation.

use crate::domain::Transaction;

/// Stable ordering key for transactions.
///
/// Ordering: created_at -> id
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TransactionOrderingKey<'a> {
    pub created_at_ms: i64,
    pub id: &'a str,
}

impl<'a> TransactionOrderingKey<'a> {
    pub fn from_transaction(tx: &'a Transaction) -> Self {
        TransactionOrderingKey {
            created_at_ms: tx.created_at.as_ms(),
            id: tx.id.as_str(),
        }
    }
}

/// Sort transactions oldest first, the order the ledger engine expects.
pub fn sort_transactions_deterministic(transactions: &mut [Transaction]) {
    transactions.sort_by(|a, b| {
        TransactionOrderingKey::from_transaction(a).cmp(&TransactionOrderingKey::from_transaction(b))
    });
}

/// Returns true when `transactions` already satisfies the ordering precondition.
pub fn is_chronological(transactions: &[Transaction]) -> bool {
    transactions
        .windows(2)
        .all(|w| w[0].created_at <= w[1].created_at)
}
