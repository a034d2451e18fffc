pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;

pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    CloseTrade, Decimal, EquityPosition, LotEvent, LotEventKind, NewTrade, OwnerId, Symbol, Trade,
    TradeCategory, TradeId, UserStats,
};
pub use error::AppError;
pub use orchestration::{EquityPositionLedger, SettlementEngine, SettlementError, StatsAggregator};
