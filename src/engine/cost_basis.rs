use crate::domain::{AssetId, Decimal, Transaction, TransactionKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// Weighted-average-cost inventory for one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBasisState {
    pub asset_id: AssetId,

    /// Units currently held. Never negative.
    pub total_quantity: Decimal,

    /// Average unit cost of the held quantity (stale when total_quantity is zero).
    pub avg_cost: Decimal,

    /// Cumulative profit/loss recognized on disposals.
    pub realized_pnl: Decimal,

    /// Cumulative cost of FEE transactions. Never negative.
    pub fees: Decimal,
}

impl CostBasisState {
    pub fn new(asset_id: AssetId) -> Self {
        Self {
            asset_id,
            total_quantity: Decimal::zero(),
            avg_cost: Decimal::zero(),
            realized_pnl: Decimal::zero(),
            fees: Decimal::zero(),
        }
    }

    pub fn is_flat(&self) -> bool {
        self.total_quantity.is_zero()
    }

    /// Cost of the held quantity at the average cost, `None` on overflow.
    pub fn cost_basis(&self) -> Option<Decimal> {
        self.total_quantity.checked_mul(self.avg_cost)
    }
}

/// A cost-basis state marked against an optional current price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResult {
    #[serde(flatten)]
    pub state: CostBasisState,

    /// `None` means the current price is unknown, not that the position is flat.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unrealized_pnl: Option<Decimal>,
}

/// Folds a chronological transaction stream into a [`CostBasisState`].
///
/// Transactions for other assets and transactions with a non-positive
/// quantity are skipped. Disposals larger than the holding clamp at zero.
/// A transaction whose arithmetic would overflow is skipped whole, leaving
/// the state as it was before it.
pub struct CostBasisTracker {
    state: CostBasisState,
}

impl CostBasisTracker {
    pub fn new(asset_id: AssetId) -> Self {
        Self {
            state: CostBasisState::new(asset_id),
        }
    }

    /// Apply one transaction to the running state.
    ///
    /// Callers must feed transactions oldest first; ordering is not checked.
    pub fn process_transaction(&mut self, tx: &Transaction) {
        if tx.asset_id != self.state.asset_id {
            trace!(tx_id = %tx.id, asset = %tx.asset_id, "skipping transaction for other asset");
            return;
        }
        if !tx.quantity.is_positive() {
            debug!(tx_id = %tx.id, quantity = %tx.quantity, "skipping non-positive quantity");
            return;
        }

        let price = tx.price.and_then(Decimal::positive);

        let applied = match tx.kind {
            TransactionKind::Buy | TransactionKind::Deposit => self.acquire(tx.quantity, price),
            TransactionKind::Sell | TransactionKind::Withdraw => {
                self.dispose(tx, tx.quantity, price)
            }
            TransactionKind::Fee => self.charge_fee(tx, tx.quantity, price),
            TransactionKind::Adjust => {
                self.adjust(tx.quantity, price);
                Some(())
            }
        };

        if applied.is_none() {
            warn!(
                tx_id = %tx.id,
                kind = %tx.kind,
                quantity = %tx.quantity,
                price = ?price,
                "arithmetic overflow, skipping transaction"
            );
        }
    }

    /// Add units; blend the average cost only when the lot has a known price.
    fn acquire(&mut self, quantity: Decimal, price: Option<Decimal>) -> Option<()> {
        let old_qty = self.state.total_quantity;
        let new_qty = old_qty.checked_add(quantity)?;

        let avg_cost = match price {
            Some(px) => {
                let old_value = self.state.avg_cost.checked_mul(old_qty)?;
                let lot_value = px.checked_mul(quantity)?;
                old_value.checked_add(lot_value)?.checked_div(new_qty)?
            }
            None => self.state.avg_cost,
        };

        self.state.total_quantity = new_qty;
        self.state.avg_cost = avg_cost;
        Some(())
    }

    /// Remove units and recognize P&L against the average cost.
    /// The average cost of what remains is unchanged.
    fn dispose(
        &mut self,
        tx: &Transaction,
        quantity: Decimal,
        price: Option<Decimal>,
    ) -> Option<()> {
        let sold = self.clamped(tx, quantity);

        let realized_pnl = match price.filter(|_| sold.is_positive()) {
            Some(px) => {
                let gain = px.checked_sub(self.state.avg_cost)?.checked_mul(sold)?;
                self.state.realized_pnl.checked_add(gain)?
            }
            None => self.state.realized_pnl,
        };

        self.state.total_quantity -= sold;
        self.state.realized_pnl = realized_pnl;
        Some(())
    }

    /// Remove units spent on fees. Without a price the fee is valued at the
    /// average cost.
    fn charge_fee(
        &mut self,
        tx: &Transaction,
        quantity: Decimal,
        price: Option<Decimal>,
    ) -> Option<()> {
        let fee_qty = self.clamped(tx, quantity);
        let unit_cost = price.unwrap_or(self.state.avg_cost);
        let fees = self.state.fees.checked_add(fee_qty.checked_mul(unit_cost)?)?;

        self.state.total_quantity -= fee_qty;
        self.state.fees = fees;
        Some(())
    }

    /// Replace the holding outright. Realized P&L and fees are kept.
    fn adjust(&mut self, quantity: Decimal, price: Option<Decimal>) {
        self.state.total_quantity = quantity;
        if let Some(px) = price {
            self.state.avg_cost = px;
        }
    }

    fn clamped(&self, tx: &Transaction, quantity: Decimal) -> Decimal {
        let held = self.state.total_quantity;
        if quantity > held {
            debug!(
                tx_id = %tx.id,
                kind = %tx.kind,
                requested = %quantity,
                held = %held,
                "disposal exceeds holding, clamping"
            );
        }
        quantity.min(held)
    }

    pub fn state(&self) -> &CostBasisState {
        &self.state
    }

    pub fn into_state(self) -> CostBasisState {
        self.state
    }
}

/// Recompute the cost basis of `asset_id` from its full transaction history.
///
/// `transactions` must be ordered oldest first.
pub fn process_transactions(asset_id: &AssetId, transactions: &[Transaction]) -> CostBasisState {
    let mut tracker = CostBasisTracker::new(asset_id.clone());
    for tx in transactions {
        tracker.process_transaction(tx);
    }
    tracker.into_state()
}

/// Mark `state` against `current_price`. A missing, zero or negative price
/// leaves `unrealized_pnl` absent, as does a valuation too large to represent.
pub fn compute_unrealized(state: CostBasisState, current_price: Option<Decimal>) -> ProcessResult {
    let unrealized_pnl = current_price.and_then(Decimal::positive).and_then(|px| {
        let pnl = state
            .total_quantity
            .checked_mul(px)
            .zip(state.cost_basis())
            .and_then(|(market_value, cost)| market_value.checked_sub(cost));
        if pnl.is_none() {
            warn!(asset = %state.asset_id, price = %px, "unrealized P&L overflows, leaving it unknown");
        }
        pnl
    });

    ProcessResult {
        state,
        unrealized_pnl,
    }
}

pub fn evaluate(
    asset_id: &AssetId,
    transactions: &[Transaction],
    current_price: Option<Decimal>,
) -> ProcessResult {
    compute_unrealized(process_transactions(asset_id, transactions), current_price)
}
