use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{parse_owner, parse_symbol, AppState, DecimalInput};
use crate::domain::{EquityPosition, LotEvent};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct PositionQuery {
    pub owner: String,
    pub symbol: String,
}

#[derive(Debug, Deserialize)]
pub struct LotRequest {
    pub owner: String,
    pub symbol: String,
    pub quantity: i64,
    pub price: DecimalInput,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionDto {
    pub id: i64,
    pub owner: String,
    pub symbol: String,
    pub quantity: i64,
    pub average_cost: String,
}

impl From<EquityPosition> for PositionDto {
    fn from(p: EquityPosition) -> Self {
        Self {
            id: p.id.0,
            owner: p.owner_id.0,
            symbol: p.symbol.0,
            quantity: p.quantity,
            average_cost: p.average_cost.to_canonical_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LotEventDto {
    pub id: i64,
    pub time_ms: i64,
    pub quantity_delta: i64,
    pub price: String,
    pub kind: String,
    pub trade_id: Option<i64>,
}

impl From<LotEvent> for LotEventDto {
    fn from(e: LotEvent) -> Self {
        Self {
            id: e.id,
            time_ms: e.time_ms.as_ms(),
            quantity_delta: e.quantity_delta,
            price: e.price.to_canonical_string(),
            kind: e.kind.as_str().to_string(),
            trade_id: e.trade_id.map(|t| t.0),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionResponse {
    pub position: PositionDto,
    pub history: Vec<LotEventDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LotResponse {
    pub position: PositionDto,
    pub event: LotEventDto,
}

pub async fn get_position(
    Query(params): Query<PositionQuery>,
    State(state): State<AppState>,
) -> Result<Json<PositionResponse>, AppError> {
    let owner = parse_owner(&params.owner)?;
    let symbol = parse_symbol(&params.symbol)?;

    let position = state
        .repo
        .get_position(&owner, &symbol)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("position {} {}", owner, symbol)))?;
    let history = state.repo.list_lot_events(position.id).await?;

    Ok(Json(PositionResponse {
        position: position.into(),
        history: history.into_iter().map(LotEventDto::from).collect(),
    }))
}

pub async fn record_lot(
    State(state): State<AppState>,
    Json(req): Json<LotRequest>,
) -> Result<(StatusCode, Json<LotResponse>), AppError> {
    let owner = parse_owner(&req.owner)?;
    let symbol = parse_symbol(&req.symbol)?;
    let price = req.price.parse("price")?;

    let (position, event) = state
        .ledger
        .record_manual_lot(&owner, &symbol, req.quantity, price)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(LotResponse {
            position: position.into(),
            event: event.into(),
        }),
    ))
}
