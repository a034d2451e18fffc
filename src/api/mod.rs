pub mod health;
pub mod positions;
pub mod stats;
pub mod trades;

use crate::db::Repository;
use crate::domain::{Decimal, OwnerId, Symbol};
use crate::error::AppError;
use crate::orchestration::{EquityPositionLedger, SettlementEngine, StatsAggregator};
use axum::{
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub engine: SettlementEngine,
    pub ledger: EquityPositionLedger,
}

impl AppState {
    pub fn new(repo: Arc<Repository>) -> Self {
        let ledger = EquityPositionLedger::new(repo.clone());
        let engine = SettlementEngine::new(repo.clone(), ledger.clone(), StatsAggregator::new());
        Self {
            repo,
            engine,
            ledger,
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
            "/v1/trades",
            get(trades::list_trades).post(trades::create_trade),
        )
        .route("/v1/trades/:id", get(trades::get_trade))
        .route("/v1/trades/:id/close", post(trades::close_trade))
        .route("/v1/positions", get(positions::get_position))
        .route("/v1/positions/lots", post(positions::record_lot))
        .route("/v1/stats", get(stats::get_stats))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// A decimal accepted either as a JSON number or as a string.
///
/// JSON numbers pass through `f64` before they get here, so only the string
/// form is exact. Both forms accept exponent notation.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DecimalInput {
    Number(serde_json::Number),
    Text(String),
}

impl DecimalInput {
    pub fn parse(&self, field: &str) -> Result<Decimal, AppError> {
        let raw = match self {
            DecimalInput::Number(n) => n.to_string(),
            DecimalInput::Text(s) => s.clone(),
        };
        Decimal::from_str_scientific(&raw)
            .map_err(|_| AppError::BadRequest(format!("{} is not a decimal: {}", field, raw)))
    }
}

pub(crate) fn parse_owner(raw: &str) -> Result<OwnerId, AppError> {
    OwnerId::parse(raw).ok_or_else(|| AppError::BadRequest("owner must not be empty".to_string()))
}

pub(crate) fn parse_symbol(raw: &str) -> Result<Symbol, AppError> {
    Symbol::parse(raw).ok_or_else(|| AppError::BadRequest(format!("Invalid symbol: {:?}", raw)))
}
