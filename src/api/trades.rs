use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{parse_owner, parse_symbol, AppState, DecimalInput};
use crate::domain::{parse_iso_date, CloseTrade, NewTrade, Trade, TradeCategory, TradeId};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct TradesQuery {
    pub owner: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTradeRequest {
    pub owner: String,
    pub symbol: String,
    pub category: String,
    pub strike_price: Option<DecimalInput>,
    pub premium: Option<DecimalInput>,
    pub quantity: i64,
    pub open_date: String,
    pub expiration_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseTradeRequest {
    pub close_price: DecimalInput,
    pub close_date: String,
    #[serde(default)]
    pub was_assigned: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradesResponse {
    pub trades: Vec<TradeDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeDto {
    pub id: i64,
    pub owner: String,
    pub symbol: String,
    pub category: TradeCategory,
    pub strike_price: Option<String>,
    pub premium: Option<String>,
    pub quantity: i64,
    pub open_date: String,
    pub expiration_date: Option<String>,
    pub close_date: Option<String>,
    pub close_price: Option<String>,
    pub was_assigned: bool,
    pub shares_assigned: Option<i64>,
    pub assignment_price: Option<String>,
    pub linked_position_id: Option<i64>,
    pub realized_pnl: Option<String>,
    pub is_win: Option<bool>,
    pub return_percentage: Option<String>,
}

impl From<Trade> for TradeDto {
    fn from(t: Trade) -> Self {
        Self {
            id: t.id.0,
            owner: t.owner_id.0,
            symbol: t.symbol.0,
            category: t.category,
            strike_price: t.strike_price.map(|d| d.to_canonical_string()),
            premium: t.premium.map(|d| d.to_canonical_string()),
            quantity: t.quantity,
            open_date: t.open_date.to_string(),
            expiration_date: t.expiration_date.map(|d| d.to_string()),
            close_date: t.close_date.map(|d| d.to_string()),
            close_price: t.close_price.map(|d| d.to_canonical_string()),
            was_assigned: t.was_assigned,
            shares_assigned: t.shares_assigned,
            assignment_price: t.assignment_price.map(|d| d.to_canonical_string()),
            linked_position_id: t.linked_position_id.map(|p| p.0),
            realized_pnl: t.realized_pnl.map(|d| d.to_canonical_string()),
            is_win: t.is_win,
            return_percentage: t.return_percentage.map(|d| d.to_canonical_string()),
        }
    }
}

fn parse_date(field: &str, raw: &str) -> Result<chrono::NaiveDate, AppError> {
    parse_iso_date(raw)
        .ok_or_else(|| AppError::BadRequest(format!("{} is not a valid date: {}", field, raw)))
}

pub async fn create_trade(
    State(state): State<AppState>,
    Json(req): Json<CreateTradeRequest>,
) -> Result<(StatusCode, Json<TradeDto>), AppError> {
    let category = req
        .category
        .parse::<TradeCategory>()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let new_trade = NewTrade {
        owner_id: parse_owner(&req.owner)?,
        symbol: parse_symbol(&req.symbol)?,
        category,
        strike_price: req
            .strike_price
            .as_ref()
            .map(|d| d.parse("strikePrice"))
            .transpose()?,
        premium: req
            .premium
            .as_ref()
            .map(|d| d.parse("premium"))
            .transpose()?,
        quantity: req.quantity,
        open_date: parse_date("openDate", &req.open_date)?,
        expiration_date: req
            .expiration_date
            .as_deref()
            .map(|d| parse_date("expirationDate", d))
            .transpose()?,
    };
    new_trade.validate().map_err(AppError::BadRequest)?;

    let trade = state.repo.insert_trade(&new_trade).await?;
    tracing::info!(
        trade_id = %trade.id,
        owner = %trade.owner_id,
        symbol = %trade.symbol,
        category = %trade.category,
        "Trade opened"
    );
    Ok((StatusCode::CREATED, Json(trade.into())))
}

pub async fn list_trades(
    Query(params): Query<TradesQuery>,
    State(state): State<AppState>,
) -> Result<Json<TradesResponse>, AppError> {
    let owner = parse_owner(&params.owner)?;
    let trades = state.repo.list_trades(&owner).await?;
    Ok(Json(TradesResponse {
        trades: trades.into_iter().map(TradeDto::from).collect(),
    }))
}

pub async fn get_trade(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<TradeDto>, AppError> {
    let trade = state
        .repo
        .get_trade(TradeId(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("trade {}", id)))?;
    Ok(Json(trade.into()))
}

pub async fn close_trade(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(req): Json<CloseTradeRequest>,
) -> Result<Json<TradeDto>, AppError> {
    let close = CloseTrade {
        close_price: req.close_price.parse("closePrice")?,
        close_date: parse_date("closeDate", &req.close_date)?,
        was_assigned: req.was_assigned,
    };
    let trade = state.engine.close_trade(TradeId(id), close).await?;
    Ok(Json(trade.into()))
}
