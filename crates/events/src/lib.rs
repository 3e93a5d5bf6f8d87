//! Back-office events and their post-commit distribution.
//!
//! Events describe committed state changes (stock received, order completed,
//! approval requested, ...). They are published only after the transaction that
//! produced them has committed, so consumers such as the approval transport or
//! reporting never observe rolled-back work.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
