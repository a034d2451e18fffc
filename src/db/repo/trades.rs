//! Trade operations for the repository.

use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;
use std::str::FromStr;

use crate::domain::{
    CloseTrade, Decimal, NewTrade, OwnerId, PositionId, Symbol, Trade, TradeCategory, TradeId,
};
use crate::engine::Settlement;

use super::{
    date_column, decimal_column, decode_error, format_date, optional_date_column,
    optional_decimal_column, Repository, UnitOfWork,
};

impl Repository {
    /// Insert an open trade and return it as stored.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_trade(&self, trade: &NewTrade) -> Result<Trade, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO trades (
                owner_id, symbol, category, strike_price, premium, quantity,
                open_date, expiration_date, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(trade.owner_id.as_str())
        .bind(trade.symbol.as_str())
        .bind(trade.category.as_str())
        .bind(trade.strike_price.map(|d| d.to_canonical_string()))
        .bind(trade.premium.map(|d| d.to_canonical_string()))
        .bind(trade.quantity)
        .bind(format_date(trade.open_date))
        .bind(trade.expiration_date.map(format_date))
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(&mut *conn)
        .await?;

        let id = TradeId(result.last_insert_rowid());
        fetch_trade(&mut conn, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Get a trade by id.
    pub async fn get_trade(&self, id: TradeId) -> Result<Option<Trade>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        fetch_trade(&mut conn, id).await
    }

    /// List an owner's trades, oldest first.
    pub async fn list_trades(&self, owner: &OwnerId) -> Result<Vec<Trade>, sqlx::Error> {
        let rows = sqlx::query("SELECT * FROM trades WHERE owner_id = ? ORDER BY id ASC")
            .bind(owner.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(trade_from_row).collect()
    }
}

impl UnitOfWork {
    pub async fn get_trade(&mut self, id: TradeId) -> Result<Option<Trade>, sqlx::Error> {
        fetch_trade(self.conn(), id).await
    }

    /// Mark an open trade closed. Returns `false` if it was already closed or
    /// does not exist.
    ///
    /// This is a compare-and-swap on `close_date IS NULL`; run it as the first
    /// statement of the unit so the write lock is held from here to commit.
    pub async fn claim_close(
        &mut self,
        id: TradeId,
        close: &CloseTrade,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE trades
            SET close_date = ?, close_price = ?, was_assigned = ?
            WHERE id = ? AND close_date IS NULL
            "#,
        )
        .bind(format_date(close.close_date))
        .bind(close.close_price.to_canonical_string())
        .bind(close.was_assigned)
        .bind(id.0)
        .execute(self.conn())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Write the derived close fields of a claimed trade.
    pub async fn record_settlement(
        &mut self,
        id: TradeId,
        settlement: &Settlement,
        linked_position_id: Option<PositionId>,
    ) -> Result<(), sqlx::Error> {
        let assignment = settlement.assignment.as_ref();

        sqlx::query(
            r#"
            UPDATE trades
            SET realized_pnl = ?, is_win = ?, return_percentage = ?,
                shares_assigned = ?, assignment_price = ?, linked_position_id = ?
            WHERE id = ?
            "#,
        )
        .bind(settlement.realized_pnl.to_canonical_string())
        .bind(settlement.is_win)
        .bind(settlement.return_percentage.to_canonical_string())
        .bind(assignment.map(|a| a.shares))
        .bind(assignment.map(|a| a.price.to_canonical_string()))
        .bind(linked_position_id.map(|p| p.0))
        .bind(id.0)
        .execute(self.conn())
        .await?;

        Ok(())
    }

    /// Realized P&L of every closed trade of an owner.
    ///
    /// Summed in Rust rather than with SQL `SUM`, which would go through REAL.
    pub async fn realized_pnls(&mut self, owner: &OwnerId) -> Result<Vec<Decimal>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT realized_pnl
            FROM trades
            WHERE owner_id = ? AND realized_pnl IS NOT NULL
            ORDER BY id ASC
            "#,
        )
        .bind(owner.as_str())
        .fetch_all(self.conn())
        .await?;

        rows.iter()
            .map(|row| decimal_column(row, "realized_pnl"))
            .collect()
    }
}

async fn fetch_trade(conn: &mut SqliteConnection, id: TradeId) -> Result<Option<Trade>, sqlx::Error> {
    let row = sqlx::query("SELECT * FROM trades WHERE id = ?")
        .bind(id.0)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(trade_from_row).transpose()
}

fn trade_from_row(row: &SqliteRow) -> Result<Trade, sqlx::Error> {
    let category: String = row.try_get("category")?;
    let category = TradeCategory::from_str(&category).map_err(|e| decode_error("category", e))?;

    Ok(Trade {
        id: TradeId(row.try_get("id")?),
        owner_id: OwnerId(row.try_get("owner_id")?),
        symbol: Symbol(row.try_get("symbol")?),
        category,
        strike_price: optional_decimal_column(row, "strike_price")?,
        premium: optional_decimal_column(row, "premium")?,
        quantity: row.try_get("quantity")?,
        open_date: date_column(row, "open_date")?,
        expiration_date: optional_date_column(row, "expiration_date")?,
        close_date: optional_date_column(row, "close_date")?,
        close_price: optional_decimal_column(row, "close_price")?,
        was_assigned: row.try_get::<i64, _>("was_assigned")? != 0,
        shares_assigned: row.try_get("shares_assigned")?,
        assignment_price: optional_decimal_column(row, "assignment_price")?,
        linked_position_id: row
            .try_get::<Option<i64>, _>("linked_position_id")?
            .map(PositionId),
        realized_pnl: optional_decimal_column(row, "realized_pnl")?,
        is_win: row.try_get::<Option<i64>, _>("is_win")?.map(|v| v != 0),
        return_percentage: optional_decimal_column(row, "return_percentage")?,
    })
}
