//! Worker compensation ledger.
//!
//! Pure domain logic only: no IO, no persistence concerns.

pub mod ledger;
pub mod policy;

pub use ledger::{Direction, LedgerEntry, Reason, Subject, WorkerLedger};
pub use policy::CompensationPolicy;
