//! Equity position and lot history operations for the repository.

use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;
use std::str::FromStr;

use crate::domain::{
    Decimal, EquityPosition, LotEvent, LotEventKind, OwnerId, PositionId, Symbol, TimeMs, TradeId,
};
use crate::engine::LotOutcome;

use super::{decimal_column, decode_error, Repository, UnitOfWork};

/// Fields of a lot event about to be appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewLotEvent {
    pub time_ms: TimeMs,
    pub quantity_delta: i64,
    pub price: Decimal,
    pub kind: LotEventKind,
    pub trade_id: Option<TradeId>,
}

impl Repository {
    /// Get the position for an owner and symbol.
    pub async fn get_position(
        &self,
        owner: &OwnerId,
        symbol: &Symbol,
    ) -> Result<Option<EquityPosition>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        fetch_position(&mut conn, owner, symbol).await
    }

    /// List all positions of an owner, by symbol.
    pub async fn list_positions(&self, owner: &OwnerId) -> Result<Vec<EquityPosition>, sqlx::Error> {
        let rows = sqlx::query("SELECT * FROM equity_positions WHERE owner_id = ? ORDER BY symbol ASC")
            .bind(owner.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(position_from_row).collect()
    }

    /// Lot history of a position in event order (time, then insertion).
    pub async fn list_lot_events(&self, position_id: PositionId) -> Result<Vec<LotEvent>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, position_id, event_time_ms, quantity_delta, price, event_kind, trade_id
            FROM lot_events
            WHERE position_id = ?
            ORDER BY event_time_ms ASC, id ASC
            "#,
        )
        .bind(position_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(lot_event_from_row).collect()
    }
}

impl UnitOfWork {
    /// Take the database write lock before reading a position.
    ///
    /// A no-op update on the position key; matching zero rows still acquires
    /// the lock, so the subsequent read sees the last committed state.
    pub async fn lock_position(&mut self, owner: &OwnerId, symbol: &Symbol) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE equity_positions SET quantity = quantity WHERE owner_id = ? AND symbol = ?")
            .bind(owner.as_str())
            .bind(symbol.as_str())
            .execute(self.conn())
            .await?;
        Ok(())
    }

    pub async fn find_position(
        &mut self,
        owner: &OwnerId,
        symbol: &Symbol,
    ) -> Result<Option<EquityPosition>, sqlx::Error> {
        fetch_position(self.conn(), owner, symbol).await
    }

    pub async fn insert_position(
        &mut self,
        owner: &OwnerId,
        symbol: &Symbol,
        outcome: &LotOutcome,
    ) -> Result<EquityPosition, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO equity_positions (owner_id, symbol, quantity, average_cost, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(owner.as_str())
        .bind(symbol.as_str())
        .bind(outcome.quantity)
        .bind(outcome.average_cost.to_canonical_string())
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(self.conn())
        .await?;

        Ok(EquityPosition {
            id: PositionId(result.last_insert_rowid()),
            owner_id: owner.clone(),
            symbol: symbol.clone(),
            quantity: outcome.quantity,
            average_cost: outcome.average_cost,
        })
    }

    pub async fn update_position(
        &mut self,
        id: PositionId,
        outcome: &LotOutcome,
    ) -> Result<(), sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE equity_positions
            SET quantity = ?, average_cost = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(outcome.quantity)
        .bind(outcome.average_cost.to_canonical_string())
        .bind(chrono::Utc::now().timestamp_millis())
        .bind(id.0)
        .execute(self.conn())
        .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }
        Ok(())
    }

    pub async fn append_lot_event(
        &mut self,
        position_id: PositionId,
        event: &NewLotEvent,
    ) -> Result<LotEvent, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO lot_events
            (position_id, event_time_ms, quantity_delta, price, event_kind, trade_id)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(position_id.0)
        .bind(event.time_ms.as_ms())
        .bind(event.quantity_delta)
        .bind(event.price.to_canonical_string())
        .bind(event.kind.as_str())
        .bind(event.trade_id.map(|t| t.0))
        .execute(self.conn())
        .await?;

        Ok(LotEvent {
            id: result.last_insert_rowid(),
            position_id,
            time_ms: event.time_ms,
            quantity_delta: event.quantity_delta,
            price: event.price,
            kind: event.kind,
            trade_id: event.trade_id,
        })
    }
}

async fn fetch_position(
    conn: &mut SqliteConnection,
    owner: &OwnerId,
    symbol: &Symbol,
) -> Result<Option<EquityPosition>, sqlx::Error> {
    let row = sqlx::query("SELECT * FROM equity_positions WHERE owner_id = ? AND symbol = ?")
        .bind(owner.as_str())
        .bind(symbol.as_str())
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(position_from_row).transpose()
}

fn position_from_row(row: &SqliteRow) -> Result<EquityPosition, sqlx::Error> {
    Ok(EquityPosition {
        id: PositionId(row.try_get("id")?),
        owner_id: OwnerId(row.try_get("owner_id")?),
        symbol: Symbol(row.try_get("symbol")?),
        quantity: row.try_get("quantity")?,
        average_cost: decimal_column(row, "average_cost")?,
    })
}

fn lot_event_from_row(row: &SqliteRow) -> Result<LotEvent, sqlx::Error> {
    let kind: String = row.try_get("event_kind")?;
    let kind = LotEventKind::from_str(&kind).map_err(|e| {
        decode_error(
            "event_kind",
            std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        )
    })?;

    Ok(LotEvent {
        id: row.try_get("id")?,
        position_id: PositionId(row.try_get("position_id")?),
        time_ms: TimeMs::new(row.try_get("event_time_ms")?),
        quantity_delta: row.try_get("quantity_delta")?,
        price: decimal_column(row, "price")?,
        kind,
        trade_id: row.try_get::<Option<i64>, _>("trade_id")?.map(TradeId),
    })
}
