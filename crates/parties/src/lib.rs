//! People the back office deals with: workers (paid commissions and
//! compensation) and clients (who may earn an automatic discount tier).

pub mod client;
pub mod worker;

pub use client::{Client, DiscountTier};
pub use worker::{Worker, WorkerKind};
