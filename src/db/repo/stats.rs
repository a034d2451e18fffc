//! Per-owner rollup storage.

use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::domain::{OwnerId, UserStats};

use super::{decimal_column, Repository, UnitOfWork};

impl Repository {
    /// Get the stored rollup for an owner, if any settlement has produced one.
    pub async fn get_user_stats(&self, owner: &OwnerId) -> Result<Option<UserStats>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT owner_id, total_profit_loss, trade_count, win_count, average_return
            FROM user_stats
            WHERE owner_id = ?
            "#,
        )
        .bind(owner.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(stats_from_row).transpose()
    }
}

impl UnitOfWork {
    /// Replace the owner's rollup.
    pub async fn upsert_user_stats(&mut self, stats: &UserStats) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO user_stats
            (owner_id, total_profit_loss, trade_count, win_count, average_return, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(owner_id) DO UPDATE SET
                total_profit_loss = excluded.total_profit_loss,
                trade_count = excluded.trade_count,
                win_count = excluded.win_count,
                average_return = excluded.average_return,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(stats.owner_id.as_str())
        .bind(stats.total_profit_loss.to_canonical_string())
        .bind(stats.trade_count)
        .bind(stats.win_count)
        .bind(stats.average_return.to_canonical_string())
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(self.conn())
        .await?;

        Ok(())
    }
}

fn stats_from_row(row: &SqliteRow) -> Result<UserStats, sqlx::Error> {
    Ok(UserStats {
        owner_id: OwnerId(row.try_get("owner_id")?),
        total_profit_loss: decimal_column(row, "total_profit_loss")?,
        trade_count: row.try_get("trade_count")?,
        win_count: row.try_get("win_count")?,
        average_return: decimal_column(row, "average_return")?,
    })
}
