use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use petalerp_assembly::AssemblyStatus;
use petalerp_core::entity::find;
use petalerp_core::{
    ApprovalRequestId, AssemblyId, DomainError, DomainResult, Entity, LotId, UserId,
    ensure_positive,
};

/// What a request is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ApprovalSubject {
    Assembly(AssemblyId),
    Lot(LotId),
}

impl core::fmt::Display for ApprovalSubject {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ApprovalSubject::Assembly(id) => write!(f, "assembly {id}"),
            ApprovalSubject::Lot(id) => write!(f, "lot {id}"),
        }
    }
}

/// The transition waiting for sign-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApprovalKind {
    WriteOffAssembly,
    ReturnAssemblyToCreated,
    WriteOffStock { quantity: i64 },
}

impl ApprovalKind {
    /// Assembly status reached when the request is accepted.
    pub fn target_status(self) -> Option<AssemblyStatus> {
        match self {
            ApprovalKind::WriteOffAssembly => Some(AssemblyStatus::WrittenOff),
            ApprovalKind::ReturnAssemblyToCreated => Some(AssemblyStatus::Created),
            ApprovalKind::WriteOffStock { .. } => None,
        }
    }

    pub fn describe(self, subject: ApprovalSubject) -> String {
        match self {
            ApprovalKind::WriteOffAssembly => format!("write off {subject}"),
            ApprovalKind::ReturnAssemblyToCreated => format!("return {subject} to created"),
            ApprovalKind::WriteOffStock { quantity } => {
                format!("write off {quantity} units from {subject}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: ApprovalRequestId,
    pub subject: ApprovalSubject,
    pub kind: ApprovalKind,
    /// Status to restore on denial. Lots have none.
    pub initial_status: Option<AssemblyStatus>,
    pub is_answered: bool,
    pub is_accepted: bool,
    pub requested_by: UserId,
    pub resolved_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub answered_at: Option<DateTime<Utc>>,
}

impl Entity for ApprovalRequest {
    type Id = ApprovalRequestId;
    const KIND: &'static str = "approval request";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// All approval requests. At most one unanswered request per subject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalBook {
    requests: BTreeMap<ApprovalRequestId, ApprovalRequest>,
}

impl ApprovalBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self, id: ApprovalRequestId) -> DomainResult<&ApprovalRequest> {
        find(&self.requests, id)
    }

    pub fn requests(&self) -> impl Iterator<Item = &ApprovalRequest> {
        self.requests.values()
    }

    /// The unanswered request for `subject`, if any.
    pub fn open_for(&self, subject: ApprovalSubject) -> Option<&ApprovalRequest> {
        self.requests
            .values()
            .find(|r| r.subject == subject && !r.is_answered)
    }

    pub fn open(
        &mut self,
        subject: ApprovalSubject,
        kind: ApprovalKind,
        initial_status: Option<AssemblyStatus>,
        requested_by: UserId,
        at: DateTime<Utc>,
    ) -> DomainResult<ApprovalRequestId> {
        if let ApprovalKind::WriteOffStock { quantity } = kind {
            ensure_positive(quantity, "write-off quantity")?;
        }
        if self.open_for(subject).is_some() {
            return Err(DomainError::DuplicateOpenRequest(subject.to_string()));
        }
        let request = ApprovalRequest {
            id: ApprovalRequestId::new(),
            subject,
            kind,
            initial_status,
            is_answered: false,
            is_accepted: false,
            requested_by,
            resolved_by: None,
            created_at: at,
            answered_at: None,
        };
        let id = request.id;
        self.requests.insert(id, request);
        Ok(id)
    }

    /// Mark the request answered. A second answer fails with `AlreadyAnswered`.
    pub fn resolve(
        &mut self,
        id: ApprovalRequestId,
        accepted: bool,
        actor: UserId,
        at: DateTime<Utc>,
    ) -> DomainResult<ApprovalRequest> {
        let request = self
            .requests
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found(ApprovalRequest::KIND, id))?;
        if request.is_answered {
            return Err(DomainError::AlreadyAnswered(id));
        }
        request.is_answered = true;
        request.is_accepted = accepted;
        request.resolved_by = Some(actor);
        request.answered_at = Some(at);
        Ok(request.clone())
    }
}
