//! Close validation and realized P&L per trade category.
//!
//! Everything here is pure: the caller supplies the trade, the close request
//! and (for assignments that deliver shares) the owner's current holding of the
//! underlying. Persistence and sequencing live in `orchestration::settlement`.

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::{
    CloseTrade, Decimal, EquityPosition, LotEventKind, Trade, TradeCategory, CONTRACT_MULTIPLIER,
};

/// Decimal places kept on `return_percentage`.
const RETURN_PCT_DP: u32 = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PnlError {
    #[error("close date {close_date} is outside the trade window [{open_date}, {}]", fmt_bound(.expiration_date))]
    InvalidCloseWindow {
        close_date: NaiveDate,
        open_date: NaiveDate,
        expiration_date: Option<NaiveDate>,
    },
    #[error("assignment is not supported for {0} trades")]
    UnsupportedAssignment(TradeCategory),
    #[error("insufficient shares: {required} required, {held} held")]
    InsufficientShares { held: i64, required: i64 },
    #[error("{0}")]
    Invalid(String),
}

fn fmt_bound(bound: &Option<NaiveDate>) -> String {
    bound.map(|d| d.to_string()).unwrap_or_else(|| "open".to_string())
}

/// Share movement caused by an assignment or exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    /// Signed share delta applied to the owner's position.
    pub shares: i64,
    /// Price the shares change hands at (the strike).
    pub price: Decimal,
    pub kind: LotEventKind,
}

/// Derived close values for one trade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub realized_pnl: Decimal,
    pub is_win: bool,
    pub return_percentage: Decimal,
    pub assignment: Option<Assignment>,
}

/// Validate a close request against an open trade.
///
/// Checks, in order: the close price, the close window, and whether the
/// category has a delivery path when assignment is requested. Whether the
/// trade is already closed is the caller's concern.
pub fn validate_close(trade: &Trade, close: &CloseTrade) -> Result<(), PnlError> {
    if close.close_price.is_negative() {
        return Err(PnlError::Invalid("closePrice must not be negative".to_string()));
    }

    let after_open = close.close_date >= trade.open_date;
    let before_expiry = match (trade.category.is_option(), trade.expiration_date) {
        (true, Some(expiration)) => close.close_date <= expiration,
        (true, None) => {
            return Err(PnlError::Invalid(format!(
                "trade {} has no expiration date",
                trade.id
            )))
        }
        (false, _) => true,
    };
    if !after_open || !before_expiry {
        return Err(PnlError::InvalidCloseWindow {
            close_date: close.close_date,
            open_date: trade.open_date,
            expiration_date: trade.expiration_date,
        });
    }

    if close.was_assigned && !has_delivery_path(trade.category) {
        return Err(PnlError::UnsupportedAssignment(trade.category));
    }

    Ok(())
}

fn has_delivery_path(category: TradeCategory) -> bool {
    match category {
        TradeCategory::CoveredCall
        | TradeCategory::CashSecuredPut
        | TradeCategory::LongCall
        | TradeCategory::LongPut => true,
        TradeCategory::NakedCall | TradeCategory::NakedPut | TradeCategory::Equity => false,
    }
}

/// Compute realized P&L, win flag, return and share movement for a close.
///
/// `holding` is the owner's position in the trade's symbol, if any. It is
/// consulted only by assignments that deliver shares (covered call, long put).
pub fn compute_settlement(
    trade: &Trade,
    close: &CloseTrade,
    holding: Option<&EquityPosition>,
) -> Result<Settlement, PnlError> {
    let premium = trade
        .premium
        .ok_or_else(|| PnlError::Invalid(format!("trade {} has no premium", trade.id)))?;
    let units = trade
        .quantity
        .checked_mul(trade.category.multiplier())
        .ok_or_else(|| PnlError::Invalid("quantity overflows".to_string()))?;
    let units = Decimal::from_units(units);
    let premium_total = premium.checked_mul(units).ok_or_else(overflow)?;
    let close_price = close.close_price;

    let (realized_pnl, assignment) = if close.was_assigned {
        settle_assigned(trade, close_price, premium_total, holding)?
    } else if trade.category.is_short_option() {
        let per_unit = premium.checked_sub(close_price).ok_or_else(overflow)?;
        (per_unit.checked_mul(units).ok_or_else(overflow)?, None)
    } else {
        let per_unit = close_price.checked_sub(premium).ok_or_else(overflow)?;
        (per_unit.checked_mul(units).ok_or_else(overflow)?, None)
    };

    let return_percentage = if premium_total.is_zero() {
        Decimal::zero()
    } else {
        realized_pnl
            .checked_div(premium_total.abs())
            .and_then(|ratio| ratio.checked_mul(Decimal::hundred()))
            .ok_or_else(overflow)?
            .round_dp(RETURN_PCT_DP)
    };

    Ok(Settlement {
        realized_pnl,
        is_win: realized_pnl.is_positive(),
        return_percentage,
        assignment,
    })
}

fn settle_assigned(
    trade: &Trade,
    close_price: Decimal,
    premium_total: Decimal,
    holding: Option<&EquityPosition>,
) -> Result<(Decimal, Option<Assignment>), PnlError> {
    let strike = trade
        .strike_price
        .ok_or_else(|| PnlError::Invalid(format!("trade {} has no strike price", trade.id)))?;
    let contract_shares = trade
        .quantity
        .checked_mul(CONTRACT_MULTIPLIER)
        .ok_or_else(|| PnlError::Invalid("quantity overflows".to_string()))?;
    let shares = Decimal::from_units(contract_shares);
    // (a - b) * shares, without panicking on extreme inputs
    let spread = |a: Decimal, b: Decimal| {
        a.checked_sub(b)
            .and_then(|d| d.checked_mul(shares))
            .ok_or_else(overflow)
    };

    match trade.category {
        TradeCategory::CoveredCall => {
            let position = require_shares(holding, contract_shares)?;
            let pnl = spread(strike, position.average_cost)?
                .checked_add(premium_total)
                .ok_or_else(overflow)?;
            Ok((pnl, Some(delivered(-contract_shares, strike))))
        }
        TradeCategory::CashSecuredPut => {
            let pnl = premium_total
                .checked_add(spread(close_price, strike)?)
                .ok_or_else(overflow)?;
            Ok((pnl, Some(received(contract_shares, strike))))
        }
        TradeCategory::LongCall => {
            let pnl = spread(close_price, strike)?
                .checked_sub(premium_total)
                .ok_or_else(overflow)?;
            Ok((pnl, Some(received(contract_shares, strike))))
        }
        TradeCategory::LongPut => {
            require_shares(holding, contract_shares)?;
            let pnl = spread(strike, close_price)?
                .checked_sub(premium_total)
                .ok_or_else(overflow)?;
            Ok((pnl, Some(delivered(-contract_shares, strike))))
        }
        TradeCategory::NakedCall | TradeCategory::NakedPut | TradeCategory::Equity => {
            Err(PnlError::UnsupportedAssignment(trade.category))
        }
    }
}

fn overflow() -> PnlError {
    PnlError::Invalid("settlement amount overflows".to_string())
}

fn require_shares(
    holding: Option<&EquityPosition>,
    required: i64,
) -> Result<&EquityPosition, PnlError> {
    match holding {
        Some(position) if position.quantity >= required => Ok(position),
        other => Err(PnlError::InsufficientShares {
            held: other.map(|p| p.quantity).unwrap_or(0),
            required,
        }),
    }
}

fn received(shares: i64, price: Decimal) -> Assignment {
    Assignment {
        shares,
        price,
        kind: LotEventKind::Assignment,
    }
}

fn delivered(shares: i64, price: Decimal) -> Assignment {
    Assignment {
        shares,
        price,
        kind: LotEventKind::CalledAway,
    }
}
