use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{parse_owner, AppState};
use crate::domain::UserStats;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub owner: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub owner: String,
    pub total_profit_loss: String,
    pub trade_count: i64,
    pub win_count: i64,
    pub average_return: String,
}

impl From<UserStats> for StatsResponse {
    fn from(s: UserStats) -> Self {
        Self {
            owner: s.owner_id.0,
            total_profit_loss: s.total_profit_loss.to_canonical_string(),
            trade_count: s.trade_count,
            win_count: s.win_count,
            average_return: s.average_return.to_canonical_string(),
        }
    }
}

/// Owners that never settled a trade report zeroes.
pub async fn get_stats(
    Query(params): Query<StatsQuery>,
    State(state): State<AppState>,
) -> Result<Json<StatsResponse>, AppError> {
    let owner = parse_owner(&params.owner)?;
    let stats = state
        .repo
        .get_user_stats(&owner)
        .await?
        .unwrap_or_else(|| UserStats::empty(owner));
    Ok(Json(stats.into()))
}
