use serde::{Deserialize, Serialize};

use petalerp_core::{Entity, WorkerId};

/// Worker kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerKind {
    Salesman,
    Florist,
    /// Trainee florists may be paid a personal per-assembly rate.
    Trainee,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worker {
    pub id: WorkerId,
    pub name: String,
    pub kind: WorkerKind,
    /// Personal creation rate (smallest currency unit), honoured for trainees.
    pub assembly_rate: Option<i64>,
}

impl Worker {
    /// Creation compensation for one assembly, given the category's flat fee.
    pub fn creation_rate(&self, category_fee: i64) -> i64 {
        match (self.kind, self.assembly_rate) {
            (WorkerKind::Trainee, Some(rate)) => rate,
            _ => category_fee,
        }
    }
}

impl Entity for Worker {
    type Id = WorkerId;
    const KIND: &'static str = "worker";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
