//! Ledger transactions and validation at the ingestion boundary.

use crate::domain::{AssetId, Decimal, TimeMs, TransactionId};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// The closed set of ledger movements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    Buy,
    Sell,
    Deposit,
    Withdraw,
    Fee,
    Adjust,
}

impl TransactionKind {
    pub const ALL: [TransactionKind; 6] = [
        TransactionKind::Buy,
        TransactionKind::Sell,
        TransactionKind::Deposit,
        TransactionKind::Withdraw,
        TransactionKind::Fee,
        TransactionKind::Adjust,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Buy => "BUY",
            TransactionKind::Sell => "SELL",
            TransactionKind::Deposit => "DEPOSIT",
            TransactionKind::Withdraw => "WITHDRAW",
            TransactionKind::Fee => "FEE",
            TransactionKind::Adjust => "ADJUST",
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown transaction type: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for TransactionKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        TransactionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == upper)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// A single recorded ledger movement for one asset.
///
/// `quantity` is an absolute magnitude; direction is implied by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    pub asset_id: AssetId,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub quantity: Decimal,
    /// Per-unit value in the quote currency; `None` means the cost of this leg is unknown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    pub created_at: TimeMs,
}

impl Transaction {
    pub fn new(
        id: TransactionId,
        asset_id: AssetId,
        kind: TransactionKind,
        quantity: Decimal,
        price: Option<Decimal>,
        created_at: TimeMs,
    ) -> Self {
        Self {
            id,
            asset_id,
            kind,
            quantity,
            price,
            created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionValidationError {
    #[error("assetId must not be empty")]
    EmptyAsset,
    #[error(transparent)]
    UnknownKind(#[from] UnknownKind),
    #[error("quantity must be positive")]
    NonPositiveQuantity,
    #[error("price must not be negative")]
    NegativePrice,
    #[error("createdAt must not be negative")]
    NegativeTimestamp,
    #[error("quantity * price exceeds the supported range")]
    ValueOverflow,
}

/// An unvalidated transaction as submitted by a client.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    pub asset_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub created_at: Option<i64>,
}

impl NewTransaction {
    /// Reject structurally invalid input before it can reach the ledger.
    ///
    /// A missing `createdAt` is stamped with `now`.
    pub fn validate(self, now: TimeMs) -> Result<Transaction, TransactionValidationError> {
        let asset_id = AssetId::normalize(&self.asset_id);
        if asset_id.is_empty() {
            return Err(TransactionValidationError::EmptyAsset);
        }

        let kind = TransactionKind::from_str(&self.kind)?;

        if !self.quantity.is_positive() {
            return Err(TransactionValidationError::NonPositiveQuantity);
        }

        if self.price.is_some_and(|p| p.is_negative()) {
            return Err(TransactionValidationError::NegativePrice);
        }

        if let Some(px) = self.price {
            if self.quantity.checked_mul(px).is_none() {
                return Err(TransactionValidationError::ValueOverflow);
            }
        }

        let created_at = match self.created_at {
            Some(ms) if ms < 0 => return Err(TransactionValidationError::NegativeTimestamp),
            Some(ms) => TimeMs::new(ms),
            None => now,
        };

        Ok(Transaction::new(
            TransactionId::generate(),
            asset_id,
            kind,
            self.quantity,
            self.price,
            created_at,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn new_tx(kind: &str, quantity: &str, price: Option<&str>) -> NewTransaction {
        NewTransaction {
            asset_id: "Bitcoin".to_string(),
            kind: kind.to_string(),
            quantity: d(quantity),
            price: price.map(d),
            created_at: Some(1000),
        }
    }

    #[test]
    fn test_kind_parse_is_case_insensitive() {
        assert_eq!("buy".parse::<TransactionKind>(), Ok(TransactionKind::Buy));
        assert_eq!(" Withdraw ".parse::<TransactionKind>(), Ok(TransactionKind::Withdraw));
        assert!("TRANSFER".parse::<TransactionKind>().is_err());
    }

    #[test]
    fn test_kind_wire_form() {
        for kind in TransactionKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_validate_normalizes_asset() {
        let tx = new_tx("BUY", "1.5", Some("20000")).validate(TimeMs::new(5)).unwrap();
        assert_eq!(tx.asset_id.as_str(), "bitcoin");
        assert_eq!(tx.kind, TransactionKind::Buy);
        assert_eq!(tx.created_at, TimeMs::new(1000));
    }

    #[test]
    fn test_validate_defaults_created_at() {
        let mut input = new_tx("DEPOSIT", "1", None);
        input.created_at = None;
        let tx = input.validate(TimeMs::new(42)).unwrap();
        assert_eq!(tx.created_at, TimeMs::new(42));
        assert_eq!(tx.price, None);
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        let now = TimeMs::new(0);
        assert_eq!(
            new_tx("BUY", "0", None).validate(now),
            Err(TransactionValidationError::NonPositiveQuantity)
        );
        assert_eq!(
            new_tx("BUY", "-2", None).validate(now),
            Err(TransactionValidationError::NonPositiveQuantity)
        );
        assert_eq!(
            new_tx("SELL", "1", Some("-5")).validate(now),
            Err(TransactionValidationError::NegativePrice)
        );
        assert!(matches!(
            new_tx("SWAP", "1", None).validate(now),
            Err(TransactionValidationError::UnknownKind(_))
        ));

        let mut blank = new_tx("BUY", "1", None);
        blank.asset_id = "  ".to_string();
        assert_eq!(blank.validate(now), Err(TransactionValidationError::EmptyAsset));

        let mut early = new_tx("BUY", "1", None);
        early.created_at = Some(-1);
        assert_eq!(
            early.validate(now),
            Err(TransactionValidationError::NegativeTimestamp)
        );
    }

    #[test]
    fn test_validate_rejects_unrepresentable_lot_value() {
        let huge = new_tx("BUY", "100000000000000000000", Some("10000000000"));
        assert_eq!(
            huge.validate(TimeMs::new(0)),
            Err(TransactionValidationError::ValueOverflow)
        );

        let unpriced = new_tx("DEPOSIT", "100000000000000000000", None);
        assert!(unpriced.validate(TimeMs::new(0)).is_ok());
    }

    #[test]
    fn test_new_transaction_keeps_full_precision() {
        let input: NewTransaction = serde_json::from_str(
            r#"{"assetId":"bitcoin","type":"BUY","quantity":0.12345678901234567891,"price":"64250.123456789"}"#,
        )
        .unwrap();
        let tx = input.validate(TimeMs::new(0)).unwrap();
        assert_eq!(tx.quantity.to_canonical_string(), "0.12345678901234567891");
        assert_eq!(tx.price, Some(d("64250.123456789")));
    }

    #[test]
    fn test_zero_price_is_allowed() {
        let tx = new_tx("DEPOSIT", "1", Some("0")).validate(TimeMs::new(0)).unwrap();
        assert_eq!(tx.price, Some(Decimal::zero()));
    }

    #[test]
    fn test_new_transaction_from_json() {
        let input: NewTransaction = serde_json::from_str(
            r#"{"assetId":"ethereum","type":"sell","quantity":0.5,"price":3000}"#,
        )
        .unwrap();
        let tx = input.validate(TimeMs::new(9)).unwrap();
        assert_eq!(tx.kind, TransactionKind::Sell);
        assert_eq!(tx.quantity, d("0.5"));
        assert_eq!(tx.price, Some(d("3000")));
    }
}
