//! Inventory: stock lots and the allocations that consume them.
//!
//! [`StockBook`] is both the Stock Ledger (`allocate` / `release`, the only
//! mutators of a lot's on-hand quantity) and the Allocation Tracker (`draw` /
//! `undraw`, which remember which lots funded which line so reversals are
//! exact). All of it is plain in-memory state that the caller mutates inside
//! its own transaction; a failed `draw` may leave partial allocations behind
//! and relies on the caller discarding the transaction.

pub mod book;
pub mod lot;
pub mod tracker;

pub use book::{NewLot, StockBook};
pub use lot::StockLot;
pub use tracker::{AllocationRecord, Draw, LineRef};
