pub mod valuation;

pub use valuation::{ValuationError, Valuator};
