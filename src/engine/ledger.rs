//! Weighted-average cost basis arithmetic for equity lots.

use thiserror::Error;

use crate::domain::{Decimal, EquityPosition};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("quantity delta must be non-zero")]
    ZeroDelta,
    #[error("lot price must not be negative")]
    NegativePrice,
    #[error("insufficient shares: {requested} requested, {held} held")]
    InsufficientShares { held: i64, requested: i64 },
    #[error("position quantity overflows")]
    Overflow,
}

/// Quantity and cost basis after a lot is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LotOutcome {
    pub quantity: i64,
    pub average_cost: Decimal,
}

/// Apply a signed share delta at `price` to the current holding.
///
/// Acquisitions blend into the weighted average. Dispositions leave the
/// average of the remaining shares untouched; going flat resets it to zero.
pub fn apply_lot(
    current: Option<&EquityPosition>,
    quantity_delta: i64,
    price: Decimal,
) -> Result<LotOutcome, LedgerError> {
    if quantity_delta == 0 {
        return Err(LedgerError::ZeroDelta);
    }
    if price.is_negative() {
        return Err(LedgerError::NegativePrice);
    }

    let (held, average_cost) = current
        .map(|p| (p.quantity, p.average_cost))
        .unwrap_or((0, Decimal::zero()));

    if quantity_delta < 0 {
        let requested = quantity_delta.checked_neg().ok_or(LedgerError::Overflow)?;
        if requested > held {
            return Err(LedgerError::InsufficientShares { held, requested });
        }
        let quantity = held - requested;
        let average_cost = if quantity == 0 {
            Decimal::zero()
        } else {
            average_cost
        };
        return Ok(LotOutcome {
            quantity,
            average_cost,
        });
    }

    let quantity = held
        .checked_add(quantity_delta)
        .ok_or(LedgerError::Overflow)?;
    let carried = average_cost.checked_mul(Decimal::from_units(held));
    let acquired = price.checked_mul(Decimal::from_units(quantity_delta));
    let average_cost = carried
        .zip(acquired)
        .and_then(|(carried, acquired)| carried.checked_add(acquired))
        // quantity >= quantity_delta > 0
        .and_then(|cost| cost.checked_div(Decimal::from_units(quantity)))
        .ok_or(LedgerError::Overflow)?;

    Ok(LotOutcome {
        quantity,
        average_cost,
    })
}
