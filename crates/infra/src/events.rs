//! Events published after every committed transaction.
//!
//! Consumers: the approval transport (delivers `ApprovalRequested` to reviewer
//! channels and calls back `resolve_approval`) and reporting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use petalerp_accounting::LedgerEntry;
use petalerp_approval::{ApprovalKind, ApprovalSubject};
use petalerp_assembly::AssemblyStatus;
use petalerp_core::{ApprovalRequestId, AssemblyId, LotId, OrderId, ProductId};
use petalerp_events::{Event, EventEnvelope};

use crate::error::StoreError;

/// Envelope type carried by the bus.
pub type Envelope = EventEnvelope<serde_json::Value>;

/// Reviewer answer offered by an approval notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalAction {
    Accept,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackOfficeEvent {
    LotReceived {
        lot_id: LotId,
        product_id: ProductId,
        quantity: i64,
        at: DateTime<Utc>,
    },
    StockWrittenOff {
        lot_id: LotId,
        quantity: i64,
        at: DateTime<Utc>,
    },
    AssemblyFinished {
        assembly_id: AssemblyId,
        charge: i64,
        price: i64,
        at: DateTime<Utc>,
    },
    AssemblyStatusChanged {
        assembly_id: AssemblyId,
        from: AssemblyStatus,
        to: AssemblyStatus,
        at: DateTime<Utc>,
    },
    OrderCompleted {
        order_id: OrderId,
        total: i64,
        discount: i64,
        debt: i64,
        at: DateTime<Utc>,
    },
    OrderCancelled {
        order_id: OrderId,
        at: DateTime<Utc>,
    },
    OrderRestored {
        order_id: OrderId,
        at: DateTime<Utc>,
    },
    LedgerEntryPosted {
        entry: LedgerEntry,
    },
    ApprovalRequested {
        request_id: ApprovalRequestId,
        subject: ApprovalSubject,
        kind: ApprovalKind,
        description: String,
        actions: [ApprovalAction; 2],
        at: DateTime<Utc>,
    },
    ApprovalResolved {
        request_id: ApprovalRequestId,
        subject: ApprovalSubject,
        accepted: bool,
        at: DateTime<Utc>,
    },
}

impl Event for BackOfficeEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BackOfficeEvent::LotReceived { .. } => "inventory.lot.received",
            BackOfficeEvent::StockWrittenOff { .. } => "inventory.lot.written_off",
            BackOfficeEvent::AssemblyFinished { .. } => "assembly.finished",
            BackOfficeEvent::AssemblyStatusChanged { .. } => "assembly.status_changed",
            BackOfficeEvent::OrderCompleted { .. } => "sales.order.completed",
            BackOfficeEvent::OrderCancelled { .. } => "sales.order.cancelled",
            BackOfficeEvent::OrderRestored { .. } => "sales.order.restored",
            BackOfficeEvent::LedgerEntryPosted { .. } => "accounting.ledger.entry_posted",
            BackOfficeEvent::ApprovalRequested { .. } => "approval.requested",
            BackOfficeEvent::ApprovalResolved { .. } => "approval.resolved",
        }
    }

    fn subject_type(&self) -> &'static str {
        match self {
            BackOfficeEvent::LotReceived { .. } | BackOfficeEvent::StockWrittenOff { .. } => "lot",
            BackOfficeEvent::AssemblyFinished { .. }
            | BackOfficeEvent::AssemblyStatusChanged { .. } => "assembly",
            BackOfficeEvent::OrderCompleted { .. }
            | BackOfficeEvent::OrderCancelled { .. }
            | BackOfficeEvent::OrderRestored { .. } => "order",
            BackOfficeEvent::LedgerEntryPosted { .. } => "worker",
            BackOfficeEvent::ApprovalRequested { subject, .. }
            | BackOfficeEvent::ApprovalResolved { subject, .. } => match subject {
                ApprovalSubject::Assembly(_) => "assembly",
                ApprovalSubject::Lot(_) => "lot",
            },
        }
    }

    fn subject_id(&self) -> Uuid {
        match self {
            BackOfficeEvent::LotReceived { lot_id, .. }
            | BackOfficeEvent::StockWrittenOff { lot_id, .. } => *lot_id.as_uuid(),
            BackOfficeEvent::AssemblyFinished { assembly_id, .. }
            | BackOfficeEvent::AssemblyStatusChanged { assembly_id, .. } => *assembly_id.as_uuid(),
            BackOfficeEvent::OrderCompleted { order_id, .. }
            | BackOfficeEvent::OrderCancelled { order_id, .. }
            | BackOfficeEvent::OrderRestored { order_id, .. } => *order_id.as_uuid(),
            BackOfficeEvent::LedgerEntryPosted { entry } => *entry.worker_id.as_uuid(),
            BackOfficeEvent::ApprovalRequested { subject, .. }
            | BackOfficeEvent::ApprovalResolved { subject, .. } => match subject {
                ApprovalSubject::Assembly(id) => *id.as_uuid(),
                ApprovalSubject::Lot(id) => *id.as_uuid(),
            },
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            BackOfficeEvent::LotReceived { at, .. }
            | BackOfficeEvent::StockWrittenOff { at, .. }
            | BackOfficeEvent::AssemblyFinished { at, .. }
            | BackOfficeEvent::AssemblyStatusChanged { at, .. }
            | BackOfficeEvent::OrderCompleted { at, .. }
            | BackOfficeEvent::OrderCancelled { at, .. }
            | BackOfficeEvent::OrderRestored { at, .. }
            | BackOfficeEvent::ApprovalRequested { at, .. }
            | BackOfficeEvent::ApprovalResolved { at, .. } => *at,
            BackOfficeEvent::LedgerEntryPosted { entry } => entry.created_at,
        }
    }
}

impl BackOfficeEvent {
    pub fn to_envelope(&self, commit_sequence: u64) -> Result<Envelope, StoreError> {
        let payload =
            serde_json::to_value(self).map_err(|e| StoreError::Serialize(e.to_string()))?;
        Ok(EventEnvelope::new(
            Uuid::now_v7(),
            self.event_type(),
            self.subject_id(),
            self.subject_type(),
            commit_sequence,
            payload,
        ))
    }
}
