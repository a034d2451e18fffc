use std::sync::Arc;
use tracing::{debug, info};

use crate::db::{NewLotEvent, Repository, UnitOfWork};
use crate::domain::{Decimal, EquityPosition, LotEvent, LotEventKind, OwnerId, Symbol, TimeMs};
use crate::engine::apply_lot;

use super::SettlementError;

/// Owns equity lots per (owner, symbol) and their history.
#[derive(Clone)]
pub struct EquityPositionLedger {
    repo: Arc<Repository>,
}

impl EquityPositionLedger {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    /// Apply a lot inside an open unit of work.
    ///
    /// The unit must already hold the database write lock (see
    /// `UnitOfWork::lock_position`, or any earlier write in the unit) so the
    /// position read here is the last committed one.
    pub async fn apply_lot(
        &self,
        uow: &mut UnitOfWork,
        owner: &OwnerId,
        symbol: &Symbol,
        event: &NewLotEvent,
    ) -> Result<(EquityPosition, LotEvent), SettlementError> {
        let current = uow.find_position(owner, symbol).await?;
        let outcome = apply_lot(current.as_ref(), event.quantity_delta, event.price)
            .map_err(|e| SettlementError::from_ledger(e, symbol))?;

        debug!(
            owner = %owner,
            symbol = %symbol,
            quantity = outcome.quantity,
            average_cost = %outcome.average_cost,
            "Computed lot outcome"
        );

        let position = match current {
            Some(mut position) => {
                uow.update_position(position.id, &outcome).await?;
                position.quantity = outcome.quantity;
                position.average_cost = outcome.average_cost;
                position
            }
            None => uow.insert_position(owner, symbol, &outcome).await?,
        };
        let recorded = uow.append_lot_event(position.id, event).await?;

        info!(
            owner = %owner,
            symbol = %symbol,
            position_id = %position.id,
            quantity_delta = event.quantity_delta,
            kind = %event.kind,
            "Lot applied"
        );
        Ok((position, recorded))
    }

    /// Record a hand-entered acquisition or disposal in its own unit of work.
    pub async fn record_manual_lot(
        &self,
        owner: &OwnerId,
        symbol: &Symbol,
        quantity_delta: i64,
        price: Decimal,
    ) -> Result<(EquityPosition, LotEvent), SettlementError> {
        let mut uow = self.repo.begin().await?;
        uow.lock_position(owner, symbol).await?;

        let event = NewLotEvent {
            time_ms: TimeMs::now(),
            quantity_delta,
            price,
            kind: LotEventKind::ManualEntry,
            trade_id: None,
        };
        let applied = self.apply_lot(&mut uow, owner, symbol, &event).await?;

        uow.commit().await?;
        Ok(applied)
    }
}
