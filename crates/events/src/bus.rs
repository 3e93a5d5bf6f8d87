//! Publish/subscribe boundary for committed events.
//!
//! The back office hands envelopes to an `EventBus` once a transaction has
//! committed. Subscribers include the approval transport (which fans an
//! `ApprovalRequested` event out to reviewer channels and later edits or
//! removes those copies on `ApprovalResolved`) and read-only reporting.
//!
//! Delivery is at-least-once from the subscriber's point of view: the store
//! is the source of truth, and a consumer that falls behind can re-read state.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

/// Receiving end of a bus. Each subscription sees every message published
/// after it was created, in publish order.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn from_receiver(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Wait up to `timeout` for the next message.
    ///
    /// `None` means nothing arrived in time or the bus is gone.
    pub fn next_within(&self, timeout: Duration) -> Option<M> {
        match self.receiver.recv_timeout(timeout) {
            Ok(message) => Some(message),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Everything queued so far, without blocking.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }
}

/// Transport-agnostic event bus.
///
/// `publish` failures surface to the caller; the state change that produced the
/// message is already committed at that point.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + core::fmt::Display + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
