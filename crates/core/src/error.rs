//! Domain error model.

use thiserror::Error;

use crate::id::{ApprovalRequestId, PaymentMethodId};

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every variant is an expected business condition: the operation that hit it
/// is rejected and its enclosing transaction discarded. Infrastructure failures
/// (poisoned store, serialization) live in the infra crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. non-positive quantity).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Not enough on-hand quantity across the candidate lots.
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i64, available: i64 },

    /// A release asked for more than the line currently holds.
    #[error("insufficient allocation: requested {requested}, allocated {allocated}")]
    InsufficientAllocated { requested: i64, allocated: i64 },

    /// The subject is not in a state that permits the requested action.
    #[error("{subject} in status {from} cannot {action}")]
    InvalidStateTransition {
        subject: &'static str,
        from: String,
        action: &'static str,
    },

    /// An unanswered approval request already exists for the subject.
    #[error("an open approval request already exists for {0}")]
    DuplicateOpenRequest(String),

    /// The approval request has already been answered.
    #[error("approval request {0} was already answered")]
    AlreadyAnswered(ApprovalRequestId),

    /// The order (or one of its assembly sales) has active returns.
    #[error("order has recorded returns")]
    HasReturns,

    /// An assembly without lines cannot be finished.
    #[error("assembly has no lines")]
    EmptyAssembly,

    /// An order without lines cannot be completed.
    #[error("order has no lines")]
    EmptyOrder,

    /// The referenced entity does not exist.
    #[error("{kind} {id} not found")]
    SubjectNotFound { kind: &'static str, id: String },

    /// The payment method is not registered.
    #[error("payment method {0} not found")]
    PaymentMethodNotFound(PaymentMethodId),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(kind: &'static str, id: impl core::fmt::Display) -> Self {
        Self::SubjectNotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn invalid_transition(
        subject: &'static str,
        from: impl core::fmt::Debug,
        action: &'static str,
    ) -> Self {
        Self::InvalidStateTransition {
            subject,
            from: format!("{from:?}"),
            action,
        }
    }
}

/// Reject zero or negative quantities.
pub fn ensure_positive(quantity: i64, what: &str) -> DomainResult<()> {
    if quantity <= 0 {
        return Err(DomainError::validation(format!("{what} must be positive")));
    }
    Ok(())
}

/// Reject negative monetary amounts.
pub fn ensure_non_negative(amount: i64, what: &str) -> DomainResult<()> {
    if amount < 0 {
        return Err(DomainError::validation(format!("{what} cannot be negative")));
    }
    Ok(())
}
