pub mod health;
pub mod holdings;
pub mod transactions;

use crate::config::Config;
use crate::db::Repository;
use crate::orchestration::Valuator;
use axum::{
    routing::{delete, get},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Config,
    pub valuator: Arc<Valuator>,
}

impl AppState {
    pub fn new(repo: Arc<Repository>, config: Config, valuator: Arc<Valuator>) -> Self {
        Self {
            repo,
            config,
            valuator,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route(
            "/v1/transactions",
            get(transactions::list_transactions).post(transactions::create_transaction),
        )
        .route(
            "/v1/transactions/:id",
            delete(transactions::delete_transaction),
        )
        .route("/v1/holdings", get(holdings::list_holdings))
        .route("/v1/holdings/:asset_id", get(holdings::get_holding))
        .layer(cors)
        .with_state(state)
}
