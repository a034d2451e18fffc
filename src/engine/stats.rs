use thiserror::Error;

use crate::domain::{Decimal, OwnerId, UserStats};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatsError {
    #[error("total realized P&L overflows")]
    Overflow,
}

/// Fold the realized P&L of every closed trade of an owner into a rollup.
///
/// Full recomputation: the result depends only on the input set.
pub fn aggregate(owner_id: OwnerId, realized_pnls: &[Decimal]) -> Result<UserStats, StatsError> {
    let total_profit_loss = realized_pnls
        .iter()
        .try_fold(Decimal::zero(), |acc, pnl| acc.checked_add(*pnl))
        .ok_or(StatsError::Overflow)?;
    let trade_count = realized_pnls.len() as i64;
    let win_count = realized_pnls.iter().filter(|pnl| pnl.is_positive()).count() as i64;
    let average_return = total_profit_loss
        .checked_div(Decimal::from_units(trade_count.max(1)))
        .ok_or(StatsError::Overflow)?;

    Ok(UserStats {
        owner_id,
        total_profit_loss,
        trade_count,
        win_count,
        average_return,
    })
}
