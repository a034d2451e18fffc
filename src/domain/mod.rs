//! Domain types for the trade journal's settlement subsystem.
//!
//! This module provides:
//! - Lossless numeric handling via the Decimal wrapper
//! - Primitives: TimeMs, OwnerId, Symbol, TradeId, PositionId
//! - Trades and their categories, equity positions with lot history, user stats

pub mod decimal;
pub mod position;
pub mod primitives;
pub mod stats;
pub mod trade;

pub use decimal::Decimal;
pub use position::{EquityPosition, LotEvent, LotEventKind};
pub use primitives::{OwnerId, PositionId, Symbol, TimeMs, TradeId};
pub use stats::UserStats;
pub use trade::{
    parse_iso_date, CloseTrade, NewTrade, Trade, TradeCategory, UnknownCategory,
    CONTRACT_MULTIPLIER,
};
