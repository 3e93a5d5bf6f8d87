use tracing::instrument;

use petalerp_approval::{ApprovalKind, ApprovalRequest, ApprovalSubject};
use petalerp_assembly::{AssemblyStatus, AssemblyTransition};
use petalerp_core::{ApprovalRequestId, AssemblyId, DomainError, DomainResult, UserId};
use petalerp_events::EventBus;

use super::BackOffice;
use super::assemblies::{set_status, unfinish};
use super::stock::write_off_stock;
use crate::error::BackOfficeResult;
use crate::events::{ApprovalAction, BackOfficeEvent, Envelope};
use crate::store::Transaction;

/// Open a request and announce it to the approval transport.
pub(crate) fn open_request(
    tx: &mut Transaction,
    subject: ApprovalSubject,
    kind: ApprovalKind,
    initial_status: Option<AssemblyStatus>,
    actor: UserId,
) -> DomainResult<ApprovalRequestId> {
    let at = tx.now();
    let request_id = tx.state.approvals.open(subject, kind, initial_status, actor, at)?;
    tx.emit(BackOfficeEvent::ApprovalRequested {
        request_id,
        subject,
        kind,
        description: kind.describe(subject),
        actions: [ApprovalAction::Accept, ApprovalAction::Deny],
        at,
    });
    Ok(request_id)
}

/// Mark the request answered and apply its effect.
///
/// Accepting an assembly request reverses the finish-time markup and creation
/// pay when the snapshot says they were applied, then moves to the target.
/// Denying restores the snapshot status verbatim.
pub(crate) fn resolve_request(
    tx: &mut Transaction,
    request_id: ApprovalRequestId,
    accepted: bool,
    actor: UserId,
) -> DomainResult<ApprovalRequest> {
    let at = tx.now();
    let request = tx.state.approvals.resolve(request_id, accepted, actor, at)?;

    match (request.subject, request.kind) {
        (ApprovalSubject::Assembly(assembly_id), kind) => {
            let snapshot = request.initial_status.ok_or_else(|| {
                DomainError::validation("assembly approval request has no status snapshot")
            })?;
            if accepted {
                let target = kind.target_status().ok_or_else(|| {
                    DomainError::validation("approval kind does not apply to assemblies")
                })?;
                if snapshot.is_charged() {
                    unfinish(tx, assembly_id, kind.describe(request.subject).as_str())?;
                }
                set_status(tx, assembly_id, AssemblyTransition::Approve(target))?;
            } else {
                set_status(tx, assembly_id, AssemblyTransition::Deny(snapshot))?;
            }
        }
        (ApprovalSubject::Lot(lot_id), ApprovalKind::WriteOffStock { quantity }) => {
            if accepted {
                write_off_stock(tx, lot_id, quantity)?;
            }
        }
        (ApprovalSubject::Lot(_), _) => {
            return Err(DomainError::validation("approval kind does not apply to lots"));
        }
    }

    tx.emit(BackOfficeEvent::ApprovalResolved {
        request_id,
        subject: request.subject,
        accepted,
        at,
    });
    Ok(request)
}

/// Put a FINISHED assembly behind an approval request.
fn request_assembly_transition(
    tx: &mut Transaction,
    assembly_id: AssemblyId,
    kind: ApprovalKind,
    transition: AssemblyTransition,
    actor: UserId,
) -> DomainResult<ApprovalRequestId> {
    let subject = ApprovalSubject::Assembly(assembly_id);
    if tx.state.approvals.open_for(subject).is_some() {
        return Err(DomainError::DuplicateOpenRequest(subject.to_string()));
    }
    let (previous, _) = set_status(tx, assembly_id, transition)?;
    open_request(tx, subject, kind, Some(previous), actor)
}

impl<B> BackOffice<B>
where
    B: EventBus<Envelope>,
{
    /// FINISHED → PENDING, awaiting sign-off to write the assembly off.
    #[instrument(skip(self), err)]
    pub fn request_assembly_write_off(
        &self,
        assembly_id: AssemblyId,
        actor: UserId,
    ) -> BackOfficeResult<ApprovalRequestId> {
        self.run("request_assembly_write_off", |tx| {
            request_assembly_transition(
                tx,
                assembly_id,
                ApprovalKind::WriteOffAssembly,
                AssemblyTransition::RequestWriteOff,
                actor,
            )
        })
    }

    /// FINISHED → PENDING, awaiting sign-off to reopen the assembly for editing.
    #[instrument(skip(self), err)]
    pub fn request_assembly_return_to_created(
        &self,
        assembly_id: AssemblyId,
        actor: UserId,
    ) -> BackOfficeResult<ApprovalRequestId> {
        self.run("request_assembly_return_to_created", |tx| {
            request_assembly_transition(
                tx,
                assembly_id,
                ApprovalKind::ReturnAssemblyToCreated,
                AssemblyTransition::RequestReturnToCreated,
                actor,
            )
        })
    }

    /// Answer a request. A second answer fails with `AlreadyAnswered`.
    #[instrument(skip(self), err)]
    pub fn resolve_approval(
        &self,
        request_id: ApprovalRequestId,
        accepted: bool,
        actor: UserId,
    ) -> BackOfficeResult<ApprovalRequest> {
        self.run("resolve_approval", |tx| resolve_request(tx, request_id, accepted, actor))
    }

    pub fn approval(&self, request_id: ApprovalRequestId) -> BackOfficeResult<ApprovalRequest> {
        self.read(|s| s.approvals.request(request_id).cloned())
    }

    /// The unanswered request for `subject`, if any.
    pub fn open_approval(&self, subject: ApprovalSubject) -> BackOfficeResult<Option<ApprovalRequest>> {
        self.read(|s| Ok(s.approvals.open_for(subject).cloned()))
    }
}
