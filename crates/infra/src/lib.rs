//! Back-office runtime: configuration, the transactional store, the operation
//! engine and the events it publishes after each commit.

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod store;

#[cfg(test)]
mod integration_tests;

pub use config::BackOfficeConfig;
pub use engine::{BackOffice, NewPayment};
pub use error::{BackOfficeError, BackOfficeResult, StoreError};
pub use events::{ApprovalAction, BackOfficeEvent, Envelope};
pub use store::{State, Store};
