//! Orders: lines, assembly sales, returns, payments and settlement.
//!
//! This crate contains the order state machine and the wholesale settlement
//! rollup, implemented as deterministic domain logic (no IO, no storage).
//! Stock and compensation effects are orchestrated by `petalerp-infra`.

pub mod order;
pub mod settlement;
pub mod status;

pub use order::{
    AssemblySaleLine, AssemblySaleReturn, Order, OrderLine, OrderLineReturn, Payment,
    PaymentDirection,
};
pub use settlement::{OrderTotals, settle};
pub use status::{OrderStatus, OrderTransition};
