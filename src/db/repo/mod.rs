//! Repository layer for database operations.
//!
//! `Repository` owns the pool and serves single-statement reads and trade
//! entry. `UnitOfWork` is one open transaction; settlement performs all of its
//! writes through it. Methods are organized across submodules by domain:
//! - `trades.rs` - trade entry, lookup, close claim and settlement fields
//! - `positions.rs` - equity positions and lot history
//! - `stats.rs` - per-owner rollups

mod positions;
mod stats;
mod trades;

pub use positions::NewLotEvent;

use chrono::NaiveDate;
use sqlx::sqlite::{Sqlite, SqliteConnection, SqlitePool, SqliteRow};
use sqlx::{Row, Transaction};
use std::str::FromStr;

use crate::domain::Decimal;

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    /// Open a transaction. Dropping the returned unit without `commit` rolls it back.
    pub async fn begin(&self) -> Result<UnitOfWork, sqlx::Error> {
        let tx = self.pool.begin().await?;
        Ok(UnitOfWork { tx })
    }

    /// Cheap round trip used by the readiness check.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// A single transaction spanning the trade, position and stats stores.
pub struct UnitOfWork {
    tx: Transaction<'static, Sqlite>,
}

impl UnitOfWork {
    /// Make every write in this unit durable.
    pub async fn commit(self) -> Result<(), sqlx::Error> {
        self.tx.commit().await
    }

    fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }
}

fn decode_error<E>(column: &str, source: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(source),
    }
}

fn decimal_column(row: &SqliteRow, column: &str) -> Result<Decimal, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    Decimal::from_str(&raw).map_err(|e| decode_error(column, e))
}

fn optional_decimal_column(row: &SqliteRow, column: &str) -> Result<Option<Decimal>, sqlx::Error> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|s| Decimal::from_str(&s).map_err(|e| decode_error(column, e)))
        .transpose()
}

fn optional_date_column(row: &SqliteRow, column: &str) -> Result<Option<NaiveDate>, sqlx::Error> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).map_err(|e| decode_error(column, e)))
        .transpose()
}

fn date_column(row: &SqliteRow, column: &str) -> Result<NaiveDate, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_err(|e| decode_error(column, e))
}

const DATE_FORMAT: &str = "%Y-%m-%d";

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
