use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use petalerp_core::entity::{find_in, find_in_mut};
use petalerp_core::{
    AssemblyCategoryId, AssemblyId, AssemblyLineId, DomainError, DomainResult, Entity, LotId,
    ReturnId, UserId, WorkerId, ensure_positive, percent_of, prorate,
};

use crate::rollup::{AssemblyTotals, rollup};
use crate::status::{AssemblyStatus, AssemblyTransition};

/// One stock-lot reference inside an assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyLine {
    pub id: AssemblyLineId,
    pub lot_id: LotId,
    pub quantity: i64,
    /// Price per unit in smallest currency unit.
    pub unit_price: i64,
    /// Lot cost snapshot per unit.
    pub unit_cost: i64,
}

impl AssemblyLine {
    pub fn price_total(&self) -> i64 {
        self.quantity * self.unit_price
    }

    pub fn cost_total(&self) -> i64 {
        self.quantity * self.unit_cost
    }
}

/// Stock returned from an assembly line back to its lot.
///
/// Cancelling the return soft-deletes it (`deleted_by` records who did).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyReturn {
    pub id: ReturnId,
    pub line_id: AssemblyLineId,
    pub quantity: i64,
    pub price_total: i64,
    pub cost_total: i64,
    pub created_at: DateTime<Utc>,
    pub deleted_by: Option<UserId>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl AssemblyReturn {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

impl Entity for AssemblyLine {
    type Id = AssemblyLineId;
    const KIND: &'static str = "assembly line";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Entity for AssemblyReturn {
    type Id = ReturnId;
    const KIND: &'static str = "assembly return";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Aggregate root: Assembly (composite product).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assembly {
    id: AssemblyId,
    name: String,
    category_id: AssemblyCategoryId,
    florist_id: Option<WorkerId>,
    status: AssemblyStatus,
    lines: Vec<AssemblyLine>,
    returns: Vec<AssemblyReturn>,
    /// Markup amount applied at finish, reversed exactly on write-off/return-to-create.
    applied_charge: i64,
    totals: AssemblyTotals,
    created_at: DateTime<Utc>,
}

impl Assembly {
    pub fn new(
        name: impl Into<String>,
        category_id: AssemblyCategoryId,
        florist_id: Option<WorkerId>,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        Ok(Self {
            id: AssemblyId::new(),
            name,
            category_id,
            florist_id,
            status: AssemblyStatus::Created,
            lines: Vec::new(),
            returns: Vec::new(),
            applied_charge: 0,
            totals: AssemblyTotals::default(),
            created_at,
        })
    }

    pub fn id_typed(&self) -> AssemblyId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category_id(&self) -> AssemblyCategoryId {
        self.category_id
    }

    pub fn florist_id(&self) -> Option<WorkerId> {
        self.florist_id
    }

    pub fn status(&self) -> AssemblyStatus {
        self.status
    }

    pub fn lines(&self) -> &[AssemblyLine] {
        &self.lines
    }

    pub fn returns(&self) -> &[AssemblyReturn] {
        &self.returns
    }

    pub fn totals(&self) -> AssemblyTotals {
        self.totals
    }

    pub fn applied_charge(&self) -> i64 {
        self.applied_charge
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn line(&self, line_id: AssemblyLineId) -> DomainResult<&AssemblyLine> {
        find_in(&self.lines, line_id)
    }

    pub fn return_record(&self, return_id: ReturnId) -> DomainResult<&AssemblyReturn> {
        find_in(&self.returns, return_id)
    }

    /// Quantity of the line not covered by active returns.
    pub fn line_remaining(&self, line_id: AssemblyLineId) -> DomainResult<i64> {
        let line = self.line(line_id)?;
        Ok(line.quantity - self.returned_quantity(line_id))
    }

    fn returned_quantity(&self, line_id: AssemblyLineId) -> i64 {
        self.returns
            .iter()
            .filter(|r| r.line_id == line_id && r.is_active())
            .map(|r| r.quantity)
            .sum()
    }

    pub fn ensure_lines_editable(&self) -> DomainResult<()> {
        if !self.status.lines_editable() {
            return Err(DomainError::invalid_transition(
                "assembly",
                self.status,
                "change lines",
            ));
        }
        Ok(())
    }

    /// Apply a status transition; returns the previous status.
    pub fn transition(&mut self, transition: AssemblyTransition) -> DomainResult<AssemblyStatus> {
        let next = self.status.next(transition)?;
        if transition == AssemblyTransition::Finish && self.lines.is_empty() {
            return Err(DomainError::EmptyAssembly);
        }
        let previous = self.status;
        self.status = next;
        Ok(previous)
    }

    pub fn add_line(&mut self, line: AssemblyLine) -> DomainResult<AssemblyLineId> {
        self.ensure_lines_editable()?;
        ensure_positive(line.quantity, "quantity")?;
        let id = line.id;
        self.lines.push(line);
        self.recompute();
        Ok(id)
    }

    /// Set a line's quantity; returns the change in stock it must hold.
    pub fn set_line_quantity(&mut self, line_id: AssemblyLineId, quantity: i64) -> DomainResult<i64> {
        self.ensure_lines_editable()?;
        ensure_positive(quantity, "quantity")?;
        let returned = self.returned_quantity(line_id);
        if quantity <= returned {
            return Err(DomainError::validation(
                "quantity must exceed the quantity already returned",
            ));
        }
        let line = find_in_mut(&mut self.lines, line_id)?;
        let delta = quantity - line.quantity;
        line.quantity = quantity;
        self.recompute();
        Ok(delta)
    }

    /// Remove a line together with its returns.
    pub fn remove_line(&mut self, line_id: AssemblyLineId) -> DomainResult<AssemblyLine> {
        self.ensure_lines_editable()?;
        let idx = self
            .lines
            .iter()
            .position(|l| l.id == line_id)
            .ok_or_else(|| DomainError::not_found(AssemblyLine::KIND, line_id))?;
        let line = self.lines.remove(idx);
        self.returns.retain(|r| r.line_id != line_id);
        self.recompute();
        Ok(line)
    }

    /// Record a return of `quantity` from a line.
    pub fn add_return(
        &mut self,
        line_id: AssemblyLineId,
        quantity: i64,
        at: DateTime<Utc>,
    ) -> DomainResult<ReturnId> {
        self.ensure_lines_editable()?;
        ensure_positive(quantity, "quantity")?;
        let remaining = self.line_remaining(line_id)?;
        if quantity > remaining {
            return Err(DomainError::InsufficientAllocated {
                requested: quantity,
                allocated: remaining,
            });
        }
        let line = self.line(line_id)?;
        let record = AssemblyReturn {
            id: ReturnId::new(),
            line_id,
            quantity,
            price_total: prorate(line.price_total(), quantity, line.quantity),
            cost_total: prorate(line.cost_total(), quantity, line.quantity),
            created_at: at,
            deleted_by: None,
            deleted_at: None,
        };
        let id = record.id;
        self.returns.push(record);
        self.recompute();
        Ok(id)
    }

    /// Soft-delete a return; returns the line and quantity to draw again.
    pub fn cancel_return(
        &mut self,
        return_id: ReturnId,
        actor: UserId,
        at: DateTime<Utc>,
    ) -> DomainResult<(AssemblyLineId, i64)> {
        self.ensure_lines_editable()?;
        let record = find_in_mut(&mut self.returns, return_id)?;
        if !record.is_active() {
            return Err(DomainError::validation("return was already cancelled"));
        }
        record.deleted_by = Some(actor);
        record.deleted_at = Some(at);
        let out = (record.line_id, record.quantity);
        self.recompute();
        Ok(out)
    }

    /// Apply the category markup to the freshly recomputed subtotal.
    pub fn apply_charge(&mut self, charge_percent: u32) -> i64 {
        self.recompute();
        self.applied_charge = percent_of(self.totals.subtotal, charge_percent);
        self.recompute();
        self.applied_charge
    }

    /// Remove the applied markup; returns the amount removed.
    pub fn reverse_charge(&mut self) -> i64 {
        self.recompute();
        let reversed = self.applied_charge;
        self.applied_charge = 0;
        self.recompute();
        reversed
    }

    pub fn recompute(&mut self) -> AssemblyTotals {
        self.totals = rollup(&self.lines, &self.returns, self.applied_charge);
        self.totals
    }
}

impl Entity for Assembly {
    type Id = AssemblyId;
    const KIND: &'static str = "assembly";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
