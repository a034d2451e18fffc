use tracing::info;

use crate::db::UnitOfWork;
use crate::domain::{OwnerId, UserStats};
use crate::engine::aggregate;

use super::SettlementError;

/// Rebuilds an owner's rollup from every closed trade they own.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatsAggregator;

impl StatsAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Full rescan and replace, inside the caller's unit of work.
    pub async fn recompute(
        &self,
        uow: &mut UnitOfWork,
        owner: &OwnerId,
    ) -> Result<UserStats, SettlementError> {
        let realized = uow.realized_pnls(owner).await?;
        let stats = aggregate(owner.clone(), &realized)
            .map_err(|e| SettlementError::Validation(e.to_string()))?;
        uow.upsert_user_stats(&stats).await?;

        info!(
            owner = %owner,
            trade_count = stats.trade_count,
            total_profit_loss = %stats.total_profit_loss,
            "Stats recomputed"
        );
        Ok(stats)
    }
}
