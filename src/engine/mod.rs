//! Pure computation engine(s) for settlement.
//!
//! No I/O here: these functions take domain values and return derived values
//! or a rule violation. `orchestration` sequences them inside a transaction.

pub mod ledger;
pub mod pnl;
pub mod stats;

pub use ledger::{apply_lot, LedgerError, LotOutcome};
pub use pnl::{compute_settlement, validate_close, Assignment, PnlError, Settlement};
pub use stats::{aggregate, StatsError};
