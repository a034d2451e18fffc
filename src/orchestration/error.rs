use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::{Symbol, TradeCategory, TradeId};
use crate::engine::{LedgerError, PnlError};

/// Failure kinds of the settlement subsystem.
///
/// Every kind is detected before the unit of work commits, so none of them
/// leaves a partial write behind.
#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Trade {0} is already closed")]
    AlreadyClosed(TradeId),
    #[error("Close date {close_date} is outside the trade window [{open_date}, {}]", .expiration_date.map(|d| d.to_string()).unwrap_or_else(|| "open".to_string()))]
    InvalidCloseWindow {
        close_date: NaiveDate,
        open_date: NaiveDate,
        expiration_date: Option<NaiveDate>,
    },
    #[error("Assignment is not supported for {0} trades")]
    UnsupportedAssignment(TradeCategory),
    #[error("Insufficient {symbol} shares: {required} required, {held} held")]
    InsufficientShares {
        symbol: Symbol,
        held: i64,
        required: i64,
    },
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Storage failure: {0}")]
    Storage(#[from] sqlx::Error),
}

impl SettlementError {
    /// Stable snake_case name of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            SettlementError::NotFound(_) => "not_found",
            SettlementError::AlreadyClosed(_) => "already_closed",
            SettlementError::InvalidCloseWindow { .. } => "invalid_close_window",
            SettlementError::UnsupportedAssignment(_) => "unsupported_assignment",
            SettlementError::InsufficientShares { .. } => "insufficient_shares",
            SettlementError::Validation(_) => "validation_error",
            SettlementError::Storage(_) => "storage_failure",
        }
    }

    pub(crate) fn from_pnl(err: PnlError, symbol: &Symbol) -> Self {
        match err {
            PnlError::InvalidCloseWindow {
                close_date,
                open_date,
                expiration_date,
            } => SettlementError::InvalidCloseWindow {
                close_date,
                open_date,
                expiration_date,
            },
            PnlError::UnsupportedAssignment(category) => {
                SettlementError::UnsupportedAssignment(category)
            }
            PnlError::InsufficientShares { held, required } => SettlementError::InsufficientShares {
                symbol: symbol.clone(),
                held,
                required,
            },
            PnlError::Invalid(msg) => SettlementError::Validation(msg),
        }
    }

    pub(crate) fn from_ledger(err: LedgerError, symbol: &Symbol) -> Self {
        match err {
            LedgerError::InsufficientShares { held, requested } => {
                SettlementError::InsufficientShares {
                    symbol: symbol.clone(),
                    held,
                    required: requested,
                }
            }
            other => SettlementError::Validation(other.to_string()),
        }
    }
}
