use serde::{Deserialize, Serialize};

use petalerp_core::{DomainError, DomainResult};

/// Assembly status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssemblyStatus {
    Created,
    /// Waiting for a human decision on a destructive transition.
    Pending,
    Finished,
    Sold,
    WrittenOff,
}

/// Requested status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssemblyTransition {
    Finish,
    Sell,
    /// Sale reverted (order cancelled or assembly returned).
    Unsell,
    RequestWriteOff,
    RequestReturnToCreated,
    /// Approval accepted: move to the requested target.
    Approve(AssemblyStatus),
    /// Approval denied: restore the recorded pre-transition status.
    Deny(AssemblyStatus),
    WriteOff,
}

impl AssemblyTransition {
    fn action(self) -> &'static str {
        match self {
            AssemblyTransition::Finish => "finish",
            AssemblyTransition::Sell => "be sold",
            AssemblyTransition::Unsell => "revert sale",
            AssemblyTransition::RequestWriteOff => "request write-off",
            AssemblyTransition::RequestReturnToCreated => "request return to created",
            AssemblyTransition::Approve(_) => "apply approved transition",
            AssemblyTransition::Deny(_) => "restore denied transition",
            AssemblyTransition::WriteOff => "be written off",
        }
    }
}

impl AssemblyStatus {
    /// The transition table. Validated before any side effect runs.
    pub fn next(self, transition: AssemblyTransition) -> DomainResult<AssemblyStatus> {
        use AssemblyStatus::*;
        use AssemblyTransition as T;

        let next = match (self, transition) {
            (Created, T::Finish) => Finished,
            (Finished, T::Sell) => Sold,
            (Sold, T::Unsell) => Finished,
            (Finished, T::RequestWriteOff) | (Finished, T::RequestReturnToCreated) => Pending,
            (Pending, T::Approve(target @ (WrittenOff | Created))) => target,
            (Pending, T::Deny(snapshot)) if snapshot != Pending => snapshot,
            (Created | Finished | Pending, T::WriteOff) => WrittenOff,
            (from, t) => {
                return Err(DomainError::invalid_transition("assembly", from, t.action()));
            }
        };
        Ok(next)
    }

    /// Lines may be added, changed, deleted or returned.
    pub fn lines_editable(self) -> bool {
        matches!(self, AssemblyStatus::Created | AssemblyStatus::Finished)
    }

    /// Markup and creation compensation have been applied in this status.
    pub fn is_charged(self) -> bool {
        matches!(self, AssemblyStatus::Finished | AssemblyStatus::Sold)
    }
}
