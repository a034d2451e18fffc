use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::db::{NewLotEvent, Repository};
use crate::domain::{CloseTrade, TimeMs, Trade, TradeId};
use crate::engine::{compute_settlement, validate_close};

use super::{EquityPositionLedger, SettlementError, StatsAggregator};

/// Closes trades and propagates the result into positions and stats.
#[derive(Clone)]
pub struct SettlementEngine {
    repo: Arc<Repository>,
    ledger: EquityPositionLedger,
    stats: StatsAggregator,
}

impl SettlementEngine {
    pub fn new(repo: Arc<Repository>, ledger: EquityPositionLedger, stats: StatsAggregator) -> Self {
        Self {
            repo,
            ledger,
            stats,
        }
    }

    /// Close an open trade.
    ///
    /// Validation order: the trade exists, it is still open, the close date is
    /// inside its window, and the category supports the requested assignment.
    /// The trade update, any lot event and the stats rebuild then commit as one
    /// unit of work, or not at all.
    pub async fn close_trade(
        &self,
        trade_id: TradeId,
        close: CloseTrade,
    ) -> Result<Trade, SettlementError> {
        let result = self.settle(trade_id, &close).await;
        if let Err(err) = &result {
            warn!(
                trade_id = %trade_id,
                kind = err.kind(),
                error = %err,
                "Settlement rejected"
            );
        }
        result
    }

    async fn settle(&self, trade_id: TradeId, close: &CloseTrade) -> Result<Trade, SettlementError> {
        let trade = self
            .repo
            .get_trade(trade_id)
            .await?
            .ok_or_else(|| SettlementError::NotFound(format!("trade {}", trade_id)))?;
        if trade.is_closed() {
            return Err(SettlementError::AlreadyClosed(trade_id));
        }
        validate_close(&trade, close).map_err(|e| SettlementError::from_pnl(e, &trade.symbol))?;

        let mut uow = self.repo.begin().await?;

        // First statement of the unit: takes the write lock and loses cleanly
        // to a concurrent close of the same trade.
        if !uow.claim_close(trade_id, close).await? {
            return Err(SettlementError::AlreadyClosed(trade_id));
        }

        let holding = if close.was_assigned {
            uow.find_position(&trade.owner_id, &trade.symbol).await?
        } else {
            None
        };
        let settlement = compute_settlement(&trade, close, holding.as_ref())
            .map_err(|e| SettlementError::from_pnl(e, &trade.symbol))?;
        debug!(
            trade_id = %trade_id,
            realized_pnl = %settlement.realized_pnl,
            return_percentage = %settlement.return_percentage,
            "Computed settlement"
        );

        let linked_position_id = match settlement.assignment {
            Some(assignment) => {
                let event = NewLotEvent {
                    time_ms: TimeMs::now(),
                    quantity_delta: assignment.shares,
                    price: assignment.price,
                    kind: assignment.kind,
                    trade_id: Some(trade_id),
                };
                let (position, _) = self
                    .ledger
                    .apply_lot(&mut uow, &trade.owner_id, &trade.symbol, &event)
                    .await?;
                Some(position.id)
            }
            None => None,
        };

        uow.record_settlement(trade_id, &settlement, linked_position_id)
            .await?;
        self.stats.recompute(&mut uow, &trade.owner_id).await?;

        let closed = uow
            .get_trade(trade_id)
            .await?
            .ok_or_else(|| SettlementError::NotFound(format!("trade {}", trade_id)))?;
        uow.commit().await?;

        info!(
            trade_id = %trade_id,
            owner = %trade.owner_id,
            symbol = %trade.symbol,
            category = %trade.category,
            was_assigned = close.was_assigned,
            realized_pnl = %settlement.realized_pnl,
            "Trade closed"
        );
        Ok(closed)
    }
}
