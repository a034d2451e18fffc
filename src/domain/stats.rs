//! Per-owner trading rollup.

use serde::{Deserialize, Serialize};

use crate::domain::{Decimal, OwnerId};

/// Aggregate statistics derived from an owner's closed trades.
///
/// Always rebuilt from the full trade set; never edited in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub owner_id: OwnerId,
    pub total_profit_loss: Decimal,
    pub trade_count: i64,
    pub win_count: i64,
    /// `total_profit_loss / max(trade_count, 1)`.
    pub average_return: Decimal,
}

impl UserStats {
    pub fn empty(owner_id: OwnerId) -> Self {
        Self {
            owner_id,
            total_profit_loss: Decimal::zero(),
            trade_count: 0,
            win_count: 0,
            average_return: Decimal::zero(),
        }
    }
}
