pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod pricing;

pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    AssetId, Decimal, NewTransaction, TimeMs, Transaction, TransactionId, TransactionKind,
};
pub use engine::{compute_unrealized, evaluate, process_transactions, CostBasisState, ProcessResult};
pub use error::AppError;
pub use pricing::{MockPriceSource, PriceSource, PriceSourceError};
