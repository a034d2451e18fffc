//! Equity positions and their append-only lot history.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::{Decimal, OwnerId, PositionId, Symbol, TimeMs, TradeId};

/// Share holding of one symbol for one owner, at a single weighted-average cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquityPosition {
    pub id: PositionId,
    pub owner_id: OwnerId,
    pub symbol: Symbol,
    /// Shares held. Never negative.
    pub quantity: i64,
    /// Cost per share of the current quantity; zero when flat.
    pub average_cost: Decimal,
}

/// Why a lot event was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotEventKind {
    ManualEntry,
    Assignment,
    CalledAway,
}

impl LotEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LotEventKind::ManualEntry => "manual_entry",
            LotEventKind::Assignment => "assignment",
            LotEventKind::CalledAway => "called_away",
        }
    }
}

impl std::fmt::Display for LotEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LotEventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual_entry" => Ok(LotEventKind::ManualEntry),
            "assignment" => Ok(LotEventKind::Assignment),
            "called_away" => Ok(LotEventKind::CalledAway),
            other => Err(format!("unknown lot event kind: {}", other)),
        }
    }
}

/// One entry of a position's history. Ordered by `(time_ms, id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotEvent {
    pub id: i64,
    pub position_id: PositionId,
    pub time_ms: TimeMs,
    pub quantity_delta: i64,
    pub price: Decimal,
    pub kind: LotEventKind,
    /// Settling trade, when the event came from an assignment.
    pub trade_id: Option<TradeId>,
}
