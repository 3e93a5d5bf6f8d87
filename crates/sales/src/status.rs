use serde::{Deserialize, Serialize};

use petalerp_core::{DomainError, DomainResult};

/// Order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Created,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderTransition {
    Complete,
    Cancel,
    Restore,
}

impl OrderStatus {
    /// The transition table. Validated before any side effect runs.
    pub fn next(self, transition: OrderTransition) -> DomainResult<OrderStatus> {
        use OrderStatus::*;
        use OrderTransition as T;

        match (self, transition) {
            (Created, T::Complete) => Ok(Completed),
            (Created | Completed, T::Cancel) => Ok(Cancelled),
            (Cancelled, T::Restore) => Ok(Created),
            (from, t) => Err(DomainError::invalid_transition(
                "order",
                from,
                match t {
                    T::Complete => "complete",
                    T::Cancel => "cancel",
                    T::Restore => "restore",
                },
            )),
        }
    }

    /// Lines and discount can be edited.
    pub fn is_modifiable(self) -> bool {
        self == OrderStatus::Created
    }

    /// Returns can be recorded or cancelled.
    pub fn accepts_returns(self) -> bool {
        self == OrderStatus::Completed
    }
}
