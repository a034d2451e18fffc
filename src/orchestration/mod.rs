//! Transactional services that sequence engine rules and store writes.

pub mod error;
pub mod ledger;
pub mod settlement;
pub mod stats;

pub use error::SettlementError;
pub use ledger::EquityPositionLedger;
pub use settlement::SettlementEngine;
pub use stats::StatsAggregator;
