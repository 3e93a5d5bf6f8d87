use tracing::instrument;

use petalerp_approval::ApprovalSubject;
use petalerp_assembly::{Assembly, AssemblyLine, AssemblyStatus, AssemblyTransition};
use petalerp_core::entity::{find, find_mut};
use petalerp_core::{
    AssemblyCategoryId, AssemblyId, AssemblyLineId, DomainError, DomainResult, LotId, ReturnId,
    UserId, WorkerId,
};
use petalerp_events::EventBus;
use petalerp_inventory::LineRef;

use super::BackOffice;
use super::approvals::resolve_request;
use super::compensation::{pay_creation, reverse_creation};
use super::stock::{adjust, draw_lot, undraw, undraw_all};
use crate::error::BackOfficeResult;
use crate::events::{BackOfficeEvent, Envelope};
use crate::store::Transaction;

/// Apply a status transition and announce it; returns `(from, to)`.
pub(crate) fn set_status(
    tx: &mut Transaction,
    assembly_id: AssemblyId,
    transition: AssemblyTransition,
) -> DomainResult<(AssemblyStatus, AssemblyStatus)> {
    let assembly = find_mut(&mut tx.state.assemblies, assembly_id)?;
    let from = assembly.transition(transition)?;
    let to = assembly.status();
    let at = tx.now();
    tx.emit(BackOfficeEvent::AssemblyStatusChanged { assembly_id, from, to, at });
    Ok((from, to))
}

/// Undo what `finish` applied: the markup charge and the creation pay.
pub(crate) fn unfinish(tx: &mut Transaction, assembly_id: AssemblyId, comment: &str) -> DomainResult<()> {
    find_mut(&mut tx.state.assemblies, assembly_id)?.reverse_charge();
    reverse_creation(tx, assembly_id, comment)
}

fn editable(tx: &mut Transaction, assembly_id: AssemblyId) -> DomainResult<&mut Assembly> {
    let assembly = find_mut(&mut tx.state.assemblies, assembly_id)?;
    assembly.ensure_lines_editable()?;
    Ok(assembly)
}

fn line_lot(tx: &Transaction, assembly_id: AssemblyId, line_id: AssemblyLineId) -> DomainResult<LotId> {
    Ok(find(&tx.state.assemblies, assembly_id)?.line(line_id)?.lot_id)
}

impl<B> BackOffice<B>
where
    B: EventBus<Envelope>,
{
    #[instrument(skip(self), err)]
    pub fn create_assembly(
        &self,
        name: String,
        category_id: AssemblyCategoryId,
        florist_id: Option<WorkerId>,
    ) -> BackOfficeResult<AssemblyId> {
        self.run("create_assembly", |tx| {
            tx.state.catalog.assembly_category(category_id)?;
            if let Some(florist_id) = florist_id {
                find(&tx.state.workers, florist_id)?;
            }
            let assembly = Assembly::new(name, category_id, florist_id, tx.now())?;
            let id = assembly.id_typed();
            tx.state.assemblies.insert(id, assembly);
            Ok(id)
        })
    }

    pub fn assembly(&self, assembly_id: AssemblyId) -> BackOfficeResult<Assembly> {
        self.read(|s| find(&s.assemblies, assembly_id).cloned())
    }

    /// Add `quantity` from `lot_id`; the price defaults to the lot's sale price.
    #[instrument(skip(self), err)]
    pub fn add_assembly_line(
        &self,
        assembly_id: AssemblyId,
        lot_id: LotId,
        quantity: i64,
        unit_price: Option<i64>,
    ) -> BackOfficeResult<AssemblyLineId> {
        self.run("add_assembly_line", |tx| {
            let lot = tx.state.stock.lot(lot_id)?;
            let line = AssemblyLine {
                id: AssemblyLineId::new(),
                lot_id,
                quantity,
                unit_price: unit_price.unwrap_or(lot.unit_price),
                unit_cost: lot.unit_cost,
            };
            let line_id = editable(tx, assembly_id)?.add_line(line)?;
            draw_lot(tx, LineRef::Assembly(line_id), lot_id, quantity)?;
            Ok(line_id)
        })
    }

    #[instrument(skip(self), err)]
    pub fn change_assembly_line_qty(
        &self,
        assembly_id: AssemblyId,
        line_id: AssemblyLineId,
        quantity: i64,
    ) -> BackOfficeResult<()> {
        self.run("change_assembly_line_qty", |tx| {
            let lot_id = line_lot(tx, assembly_id, line_id)?;
            let delta = editable(tx, assembly_id)?.set_line_quantity(line_id, quantity)?;
            let line = LineRef::Assembly(line_id);
            adjust(tx, line, delta, |tx, qty| draw_lot(tx, line, lot_id, qty))
        })
    }

    #[instrument(skip(self), err)]
    pub fn delete_assembly_line(
        &self,
        assembly_id: AssemblyId,
        line_id: AssemblyLineId,
    ) -> BackOfficeResult<()> {
        self.run("delete_assembly_line", |tx| {
            editable(tx, assembly_id)?.remove_line(line_id)?;
            undraw_all(tx, LineRef::Assembly(line_id))?;
            Ok(())
        })
    }

    /// Give `quantity` of a line back to its lot.
    #[instrument(skip(self), err)]
    pub fn return_assembly_line(
        &self,
        assembly_id: AssemblyId,
        line_id: AssemblyLineId,
        quantity: i64,
    ) -> BackOfficeResult<ReturnId> {
        self.run("return_assembly_line", |tx| {
            let at = tx.now();
            let return_id = editable(tx, assembly_id)?.add_return(line_id, quantity, at)?;
            undraw(tx, LineRef::Assembly(line_id), quantity)?;
            Ok(return_id)
        })
    }

    /// Soft-delete a line return and draw its quantity from the lot again.
    #[instrument(skip(self), err)]
    pub fn cancel_assembly_return(
        &self,
        assembly_id: AssemblyId,
        return_id: ReturnId,
        actor: UserId,
    ) -> BackOfficeResult<()> {
        self.run("cancel_assembly_return", |tx| {
            let at = tx.now();
            let (line_id, quantity) =
                editable(tx, assembly_id)?.cancel_return(return_id, actor, at)?;
            let lot_id = line_lot(tx, assembly_id, line_id)?;
            draw_lot(tx, LineRef::Assembly(line_id), lot_id, quantity)?;
            Ok(())
        })
    }

    /// CREATED → FINISHED: apply the category markup and pay the florist.
    #[instrument(skip(self), err)]
    pub fn finish_assembly(&self, assembly_id: AssemblyId) -> BackOfficeResult<()> {
        self.run("finish_assembly", |tx| {
            set_status(tx, assembly_id, AssemblyTransition::Finish)?;

            let category_id = find(&tx.state.assemblies, assembly_id)?.category_id();
            let charge_percent = tx.state.catalog.assembly_category(category_id)?.charge_percent;
            let assembly = find_mut(&mut tx.state.assemblies, assembly_id)?;
            let charge = assembly.apply_charge(charge_percent);
            let price = assembly.totals().price;
            let at = tx.now();
            tx.emit(BackOfficeEvent::AssemblyFinished { assembly_id, charge, price, at });

            pay_creation(tx, assembly_id)
        })
    }

    /// Direct write-off. From PENDING the open request is accepted by this call
    /// and its snapshot decides whether the finish effects are reversed.
    #[instrument(skip(self), err)]
    pub fn write_off_assembly(&self, assembly_id: AssemblyId, actor: UserId) -> BackOfficeResult<()> {
        self.run("write_off_assembly", |tx| {
            let status = find(&tx.state.assemblies, assembly_id)?.status();
            status.next(AssemblyTransition::WriteOff)?;

            let open = tx
                .state
                .approvals
                .open_for(ApprovalSubject::Assembly(assembly_id))
                .map(|r| r.id);
            match open {
                Some(request_id) => {
                    resolve_request(tx, request_id, true, actor)?;
                }
                None if status.is_charged() => unfinish(tx, assembly_id, "assembly written off")?,
                None => {}
            }

            if find(&tx.state.assemblies, assembly_id)?.status() == AssemblyStatus::WrittenOff {
                return Ok(());
            }
            set_status(tx, assembly_id, AssemblyTransition::WriteOff)?;
            Ok(())
        })
    }

    /// Take a CREATED assembly apart: every line's stock goes back to its lot.
    #[instrument(skip(self), err)]
    pub fn disassemble(&self, assembly_id: AssemblyId) -> BackOfficeResult<()> {
        self.run("disassemble", |tx| {
            let assembly = find(&tx.state.assemblies, assembly_id)?;
            if assembly.status() != AssemblyStatus::Created {
                return Err(DomainError::invalid_transition(
                    "assembly",
                    assembly.status(),
                    "be disassembled",
                ));
            }
            let lines: Vec<AssemblyLineId> = assembly.lines().iter().map(|l| l.id).collect();
            for line_id in lines {
                undraw_all(tx, LineRef::Assembly(line_id))?;
            }
            tx.state.assemblies.remove(&assembly_id);
            Ok(())
        })
    }
}
