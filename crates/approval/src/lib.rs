//! Approval gate: human sign-off before destructive transitions.

pub mod gate;

pub use gate::{ApprovalBook, ApprovalKind, ApprovalRequest, ApprovalSubject};
