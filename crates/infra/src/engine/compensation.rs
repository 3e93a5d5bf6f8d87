//! Worker compensation postings triggered by assembly and order transitions.

use std::collections::BTreeSet;

use petalerp_accounting::{CompensationPolicy, LedgerEntry, Reason, Subject};
use petalerp_catalog::Catalog;
use petalerp_core::entity::find;
use petalerp_core::{AssemblyId, DomainResult, OrderId};
use petalerp_sales::{AssemblySaleLine, Order};

use crate::events::BackOfficeEvent;
use crate::store::Transaction;

fn post(tx: &mut Transaction, entries: impl IntoIterator<Item = LedgerEntry>) {
    for entry in entries {
        tx.emit(BackOfficeEvent::LedgerEntryPosted { entry });
    }
}

/// Pay the assembly's florist for building it, once per finish.
pub(crate) fn pay_creation(tx: &mut Transaction, assembly_id: AssemblyId) -> DomainResult<()> {
    let at = tx.now();
    let assembly = find(&tx.state.assemblies, assembly_id)?;
    let Some(florist_id) = assembly.florist_id() else {
        return Ok(());
    };
    let subject = Subject::Assembly(assembly_id);
    if tx.state.ledger.is_paid(florist_id, subject, Reason::AssemblyCreation) {
        return Ok(());
    }

    let fee = tx.state.catalog.assembly_category(assembly.category_id())?.creation_fee;
    let amount = find(&tx.state.workers, florist_id)?.creation_rate(fee);
    if amount == 0 {
        return Ok(());
    }
    let comment = format!("{}: {}", Reason::AssemblyCreation.label(), assembly.name());
    let entry = tx
        .state
        .ledger
        .pay(florist_id, subject, Reason::AssemblyCreation, amount, comment, at)?;
    post(tx, [entry]);
    Ok(())
}

pub(crate) fn reverse_creation(
    tx: &mut Transaction,
    assembly_id: AssemblyId,
    comment: &str,
) -> DomainResult<()> {
    let at = tx.now();
    let Some(florist_id) = find(&tx.state.assemblies, assembly_id)?.florist_id() else {
        return Ok(());
    };
    let reversed = tx.state.ledger.reverse(
        florist_id,
        Subject::Assembly(assembly_id),
        Reason::AssemblyCreation,
        comment,
        at,
    );
    post(tx, reversed);
    Ok(())
}

/// Σ (line total − active returns) over lines whose category earns commission.
fn commission_base(catalog: &Catalog, order: &Order) -> DomainResult<i64> {
    let mut opted_in = BTreeSet::new();
    for line in order.lines() {
        if catalog.earns_salesman_commission(line.product_id)? {
            opted_in.insert(line.product_id);
        }
    }
    Ok(order.commission_base(|p| opted_in.contains(&p)))
}

/// Replace the salesman's commission on `order` with one computed from the
/// current sale base.
pub(crate) fn reassign_salesman(
    tx: &mut Transaction,
    policy: &CompensationPolicy,
    order_id: OrderId,
    comment: &str,
) -> DomainResult<()> {
    let at = tx.now();
    let order = find(&tx.state.orders, order_id)?;
    let Some(salesman_id) = order.salesman_id() else {
        return Ok(());
    };
    let amount = policy.salesman_commission(commission_base(&tx.state.catalog, order)?);
    let entries = tx.state.ledger.reassign(
        salesman_id,
        Subject::Order(order_id),
        Reason::SaleCommission,
        amount,
        comment,
        at,
    )?;
    post(tx, entries);
    Ok(())
}

/// Florist share of an assembly sold through an order.
pub(crate) fn pay_florist_sale(
    tx: &mut Transaction,
    policy: &CompensationPolicy,
    sale: &AssemblySaleLine,
) -> DomainResult<()> {
    let Some(florist_id) = sale.florist_id else {
        return Ok(());
    };
    let subject = Subject::Assembly(sale.assembly_id);
    if tx.state.ledger.is_paid(florist_id, subject, Reason::AssemblySaleCommission) {
        return Ok(());
    }
    let percent = tx.state.catalog.assembly_category(sale.category_id)?.florist_sale_percent;
    let amount = policy.florist_sale_commission(sale.price, percent);
    if amount == 0 {
        return Ok(());
    }
    let at = tx.now();
    let entry = tx.state.ledger.pay(
        florist_id,
        subject,
        Reason::AssemblySaleCommission,
        amount,
        Reason::AssemblySaleCommission.label(),
        at,
    )?;
    post(tx, [entry]);
    Ok(())
}

pub(crate) fn reverse_florist_sale(tx: &mut Transaction, sale: &AssemblySaleLine, comment: &str) {
    let Some(florist_id) = sale.florist_id else {
        return;
    };
    let at = tx.now();
    let reversed = tx.state.ledger.reverse(
        florist_id,
        Subject::Assembly(sale.assembly_id),
        Reason::AssemblySaleCommission,
        comment,
        at,
    );
    post(tx, reversed);
}

/// Reverse every open entry on the order (salesman commission).
pub(crate) fn reverse_order(tx: &mut Transaction, order_id: OrderId, comment: &str) {
    let at = tx.now();
    let reversed = tx.state.ledger.reverse_subject(Subject::Order(order_id), comment, at);
    post(tx, reversed);
}
