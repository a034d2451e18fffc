//! Trade records: categories, stored trades, entry and close inputs.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::domain::{Decimal, OwnerId, PositionId, Symbol, TradeId};

/// Shares controlled by one option contract.
pub const CONTRACT_MULTIPLIER: i64 = 100;

/// What kind of position a trade is. One P&L rule per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeCategory {
    LongCall,
    LongPut,
    CoveredCall,
    CashSecuredPut,
    NakedCall,
    NakedPut,
    /// Plain shares; `premium` holds the per-share entry price.
    Equity,
}

impl TradeCategory {
    pub const ALL: [TradeCategory; 7] = [
        TradeCategory::LongCall,
        TradeCategory::LongPut,
        TradeCategory::CoveredCall,
        TradeCategory::CashSecuredPut,
        TradeCategory::NakedCall,
        TradeCategory::NakedPut,
        TradeCategory::Equity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TradeCategory::LongCall => "long_call",
            TradeCategory::LongPut => "long_put",
            TradeCategory::CoveredCall => "covered_call",
            TradeCategory::CashSecuredPut => "cash_secured_put",
            TradeCategory::NakedCall => "naked_call",
            TradeCategory::NakedPut => "naked_put",
            TradeCategory::Equity => "equity",
        }
    }

    pub fn is_option(&self) -> bool {
        !matches!(self, TradeCategory::Equity)
    }

    /// Premium was collected when the trade opened.
    pub fn is_short_option(&self) -> bool {
        matches!(
            self,
            TradeCategory::CoveredCall
                | TradeCategory::CashSecuredPut
                | TradeCategory::NakedCall
                | TradeCategory::NakedPut
        )
    }

    /// Units per quantity: 100 shares per contract, 1 for plain equity.
    pub fn multiplier(&self) -> i64 {
        if self.is_option() {
            CONTRACT_MULTIPLIER
        } else {
            1
        }
    }
}

impl std::fmt::Display for TradeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown trade category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for TradeCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        TradeCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// A stored trade, open or closed.
///
/// The close block (`close_date` .. `return_percentage`) is written once by
/// settlement and is either entirely unset or entirely set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub owner_id: OwnerId,
    pub symbol: Symbol,
    pub category: TradeCategory,
    pub strike_price: Option<Decimal>,
    /// Per-contract option price, or per-share entry price for equity.
    pub premium: Option<Decimal>,
    pub quantity: i64,
    pub open_date: NaiveDate,
    pub expiration_date: Option<NaiveDate>,
    pub close_date: Option<NaiveDate>,
    pub close_price: Option<Decimal>,
    pub was_assigned: bool,
    pub shares_assigned: Option<i64>,
    pub assignment_price: Option<Decimal>,
    pub linked_position_id: Option<PositionId>,
    pub realized_pnl: Option<Decimal>,
    pub is_win: Option<bool>,
    pub return_percentage: Option<Decimal>,
}

impl Trade {
    pub fn is_closed(&self) -> bool {
        self.close_date.is_some()
    }
}

/// Input for opening a trade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTrade {
    pub owner_id: OwnerId,
    pub symbol: Symbol,
    pub category: TradeCategory,
    pub strike_price: Option<Decimal>,
    pub premium: Option<Decimal>,
    pub quantity: i64,
    pub open_date: NaiveDate,
    pub expiration_date: Option<NaiveDate>,
}

impl NewTrade {
    /// Check the field combination required by the category.
    pub fn validate(&self) -> Result<(), String> {
        if self.quantity <= 0 {
            return Err("quantity must be a positive integer".to_string());
        }

        let premium = self
            .premium
            .ok_or_else(|| format!("premium is required for {}", self.category))?;
        // Option premiums are signed; an equity entry price is not.
        if !self.category.is_option() && premium.is_negative() {
            return Err("entry price must not be negative".to_string());
        }

        if self.category.is_option() {
            let strike = self
                .strike_price
                .ok_or_else(|| format!("strikePrice is required for {}", self.category))?;
            if !strike.is_positive() {
                return Err("strikePrice must be positive".to_string());
            }
            let expiration = self
                .expiration_date
                .ok_or_else(|| format!("expirationDate is required for {}", self.category))?;
            if expiration < self.open_date {
                return Err("expirationDate must not precede openDate".to_string());
            }
        } else if self.strike_price.is_some() || self.expiration_date.is_some() {
            return Err("equity trades carry no strikePrice or expirationDate".to_string());
        }

        Ok(())
    }
}

/// Arguments of a close request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseTrade {
    pub close_price: Decimal,
    pub close_date: NaiveDate,
    pub was_assigned: bool,
}

/// Parse an ISO-8601 date, or take the date part of an RFC 3339 timestamp.
pub fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}
