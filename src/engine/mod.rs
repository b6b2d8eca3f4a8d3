//! Pure cost-basis computation for the portfolio ledger.
//!
//! No I/O, no shared state: every call works only on its arguments, so
//! concurrent callers need no coordination.

pub mod cost_basis;

pub use cost_basis::{
    compute_unrealized, evaluate, process_transactions, CostBasisState, CostBasisTracker,
    ProcessResult,
};
