use serde::{Deserialize, Serialize};
use tracing::instrument;

use petalerp_assembly::AssemblyTransition;
use petalerp_core::entity::{find, find_mut};
use petalerp_core::{
    AssemblyId, AssemblySaleLineId, ClientId, DomainError, DomainResult, OrderId, OrderLineId,
    PaymentId, PaymentMethodId, ProductId, ReturnId, UserId, WorkerId,
};
use petalerp_events::EventBus;
use petalerp_inventory::LineRef;
use petalerp_sales::{
    AssemblySaleLine, Order, OrderStatus, OrderTransition, Payment, PaymentDirection,
};

use super::BackOffice;
use super::assemblies::set_status;
use super::compensation::{pay_florist_sale, reassign_salesman, reverse_florist_sale, reverse_order};
use super::stock::{adjust, draw_product, undraw, undraw_all};
use crate::config::DiscountConfig;
use crate::error::BackOfficeResult;
use crate::events::{BackOfficeEvent, Envelope};
use crate::store::Transaction;

/// Payment as submitted by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPayment {
    pub method_id: PaymentMethodId,
    pub direction: PaymentDirection,
    pub amount: i64,
}

fn order_mut(tx: &mut Transaction, order_id: OrderId) -> DomainResult<&mut Order> {
    find_mut(&mut tx.state.orders, order_id)
}

fn add_payment(tx: &mut Transaction, order_id: OrderId, payment: NewPayment) -> DomainResult<PaymentId> {
    tx.state.catalog.payment_method(payment.method_id)?;
    let paid_at = tx.now();
    order_mut(tx, order_id)?.add_payment(Payment {
        id: PaymentId::new(),
        method_id: payment.method_id,
        direction: payment.direction,
        amount: payment.amount,
        paid_at,
    })
}

/// Move the client's lifetime purchases by `delta` when tiers are enabled.
fn record_purchase(
    tx: &mut Transaction,
    client_id: Option<ClientId>,
    delta: i64,
    discounts: &DiscountConfig,
) -> DomainResult<()> {
    let Some(client_id) = client_id else {
        return Ok(());
    };
    if discounts.enabled {
        find_mut(&mut tx.state.clients, client_id)?.record_purchase(delta, &discounts.tiers);
    }
    Ok(())
}

fn active_sales(tx: &Transaction, order_id: OrderId) -> DomainResult<Vec<AssemblySaleLine>> {
    Ok(find(&tx.state.orders, order_id)?.active_assembly_sales().cloned().collect())
}

impl<B> BackOffice<B>
where
    B: EventBus<Envelope>,
{
    /// Open an order. An auto-discount client's current percent is snapshotted.
    #[instrument(skip(self), err)]
    pub fn create_order(
        &self,
        client_id: Option<ClientId>,
        salesman_id: Option<WorkerId>,
    ) -> BackOfficeResult<OrderId> {
        self.run("create_order", |tx| {
            let percent = match client_id {
                Some(id) => find(&tx.state.clients, id)?.order_discount_percent(),
                None => 0,
            };
            if let Some(id) = salesman_id {
                find(&tx.state.workers, id)?;
            }
            let order = Order::new(client_id, salesman_id, percent, tx.now());
            let id = order.id_typed();
            tx.state.orders.insert(id, order);
            Ok(id)
        })
    }

    pub fn order(&self, order_id: OrderId) -> BackOfficeResult<Order> {
        self.read(|s| find(&s.orders, order_id).cloned())
    }

    /// Sell `quantity` of a product; stock is drawn across its lots.
    ///
    /// Without an explicit price the first candidate lot's sale price is used.
    #[instrument(skip(self), err)]
    pub fn add_order_line(
        &self,
        order_id: OrderId,
        product_id: ProductId,
        quantity: i64,
        unit_price: Option<i64>,
        discount: i64,
    ) -> BackOfficeResult<OrderLineId> {
        self.run("add_order_line", |tx| {
            tx.state.catalog.product(product_id)?;
            let unit_price = match unit_price {
                Some(price) => price,
                None => {
                    let first = tx.state.stock.candidate_lots(product_id).first().copied();
                    match first {
                        Some(lot_id) => tx.state.stock.lot(lot_id)?.unit_price,
                        None => {
                            return Err(DomainError::InsufficientStock {
                                requested: quantity,
                                available: 0,
                            });
                        }
                    }
                }
            };
            let line_id = order_mut(tx, order_id)?.add_line(product_id, quantity, unit_price, discount)?;
            draw_product(tx, LineRef::Order(line_id), product_id, quantity)?;
            Ok(line_id)
        })
    }

    #[instrument(skip(self), err)]
    pub fn change_order_line_qty(
        &self,
        order_id: OrderId,
        line_id: OrderLineId,
        quantity: i64,
    ) -> BackOfficeResult<()> {
        self.run("change_order_line_qty", |tx| {
            let order = order_mut(tx, order_id)?;
            let product_id = order.line(line_id)?.product_id;
            let delta = order.set_line_quantity(line_id, quantity)?;
            let line = LineRef::Order(line_id);
            adjust(tx, line, delta, |tx, qty| draw_product(tx, line, product_id, qty))
        })
    }

    #[instrument(skip(self), err)]
    pub fn delete_order_line(&self, order_id: OrderId, line_id: OrderLineId) -> BackOfficeResult<()> {
        self.run("delete_order_line", |tx| {
            order_mut(tx, order_id)?.remove_line(line_id)?;
            undraw_all(tx, LineRef::Order(line_id))?;
            Ok(())
        })
    }

    /// Manual discount on top of the client's percent.
    #[instrument(skip(self), err)]
    pub fn set_order_discount(&self, order_id: OrderId, amount: i64) -> BackOfficeResult<()> {
        self.run("set_order_discount", |tx| order_mut(tx, order_id)?.set_manual_discount(amount))
    }

    /// Sell a FINISHED assembly through the order at its current price.
    #[instrument(skip(self), err)]
    pub fn add_assembly_sale(
        &self,
        order_id: OrderId,
        assembly_id: AssemblyId,
    ) -> BackOfficeResult<AssemblySaleLineId> {
        self.run("add_assembly_sale", |tx| {
            find(&tx.state.orders, order_id)?.ensure_modifiable()?;
            set_status(tx, assembly_id, AssemblyTransition::Sell)?;

            let assembly = find_mut(&mut tx.state.assemblies, assembly_id)?;
            let price = assembly.recompute().price;
            let sale = AssemblySaleLine {
                id: AssemblySaleLineId::new(),
                assembly_id,
                category_id: assembly.category_id(),
                florist_id: assembly.florist_id(),
                price,
            };
            order_mut(tx, order_id)?.add_assembly_sale(sale)
        })
    }

    #[instrument(skip(self), err)]
    pub fn remove_assembly_sale(
        &self,
        order_id: OrderId,
        sale_line_id: AssemblySaleLineId,
    ) -> BackOfficeResult<()> {
        self.run("remove_assembly_sale", |tx| {
            let sale = order_mut(tx, order_id)?.remove_assembly_sale(sale_line_id)?;
            set_status(tx, sale.assembly_id, AssemblyTransition::Unsell)?;
            Ok(())
        })
    }

    /// CREATED → COMPLETED: take payments, pay commissions, move the client tier.
    #[instrument(skip(self), err)]
    pub fn complete_order(
        &self,
        order_id: OrderId,
        payments: Vec<NewPayment>,
    ) -> BackOfficeResult<()> {
        self.run("complete_order", |tx| {
            let at = tx.now();
            order_mut(tx, order_id)?.transition(OrderTransition::Complete, at)?;
            for payment in payments {
                add_payment(tx, order_id, payment)?;
            }

            reassign_salesman(tx, &self.policy, order_id, "order completed")?;
            for sale in active_sales(tx, order_id)? {
                pay_florist_sale(tx, &self.policy, &sale)?;
            }

            let order = order_mut(tx, order_id)?;
            let (client_id, totals) = (order.client_id(), order.totals());
            order.set_credited_purchase(totals.net());
            record_purchase(tx, client_id, totals.net(), &self.config.discounts)?;

            tx.emit(BackOfficeEvent::OrderCompleted {
                order_id,
                total: totals.total,
                discount: totals.discount,
                debt: totals.debt,
                at,
            });
            Ok(())
        })
    }

    /// Release all stock, revert sold assemblies to FINISHED and reverse every
    /// commission tied to the order.
    ///
    /// A completed order takes back exactly the purchase credit it gave the client.
    #[instrument(skip(self), err)]
    pub fn cancel_order(&self, order_id: OrderId) -> BackOfficeResult<()> {
        self.run("cancel_order", |tx| {
            let at = tx.now();
            let order = order_mut(tx, order_id)?;
            let previous = order.transition(OrderTransition::Cancel, at)?;
            let was_completed = previous == OrderStatus::Completed;
            let credited = order.set_credited_purchase(0);
            let lines: Vec<OrderLineId> = order.lines().iter().map(|l| l.id).collect();
            let client_id = order.client_id();
            for line_id in lines {
                undraw_all(tx, LineRef::Order(line_id))?;
            }

            for sale in active_sales(tx, order_id)? {
                set_status(tx, sale.assembly_id, AssemblyTransition::Unsell)?;
                reverse_florist_sale(tx, &sale, "order cancelled");
            }
            reverse_order(tx, order_id, "order cancelled");

            if was_completed {
                record_purchase(tx, client_id, -credited, &self.config.discounts)?;
            }
            tx.emit(BackOfficeEvent::OrderCancelled { order_id, at });
            Ok(())
        })
    }

    /// CANCELLED → CREATED, drawing every line's stock again.
    ///
    /// Fails with `HasReturns` when any return is still active, and with
    /// `InsufficientStock` (order stays CANCELLED) when stock ran out meanwhile.
    #[instrument(skip(self), err)]
    pub fn restore_order(&self, order_id: OrderId) -> BackOfficeResult<()> {
        self.run("restore_order", |tx| {
            let at = tx.now();
            let order = find(&tx.state.orders, order_id)?;
            order.status().next(OrderTransition::Restore)?;
            if order.has_active_returns() {
                return Err(DomainError::HasReturns);
            }
            let lines: Vec<(OrderLineId, ProductId, i64)> = order
                .lines()
                .iter()
                .map(|l| (l.id, l.product_id, l.quantity))
                .collect();
            let assemblies: Vec<AssemblyId> =
                order.assembly_sales().iter().map(|s| s.assembly_id).collect();

            order_mut(tx, order_id)?.transition(OrderTransition::Restore, at)?;
            for (line_id, product_id, quantity) in lines {
                draw_product(tx, LineRef::Order(line_id), product_id, quantity)?;
            }
            for assembly_id in assemblies {
                set_status(tx, assembly_id, AssemblyTransition::Sell)?;
            }
            tx.emit(BackOfficeEvent::OrderRestored { order_id, at });
            Ok(())
        })
    }

    /// Take `quantity` of a completed line back into stock.
    #[instrument(skip(self), err)]
    pub fn return_order_line(
        &self,
        order_id: OrderId,
        line_id: OrderLineId,
        quantity: i64,
    ) -> BackOfficeResult<ReturnId> {
        self.run("return_order_line", |tx| {
            let at = tx.now();
            let return_id = order_mut(tx, order_id)?.add_line_return(line_id, quantity, at)?;
            undraw(tx, LineRef::Order(line_id), quantity)?;
            reassign_salesman(tx, &self.policy, order_id, "order line returned")?;
            Ok(return_id)
        })
    }

    /// Undo a line return; the quantity must still be in stock.
    #[instrument(skip(self), err)]
    pub fn cancel_order_line_return(
        &self,
        order_id: OrderId,
        return_id: ReturnId,
        actor: UserId,
    ) -> BackOfficeResult<()> {
        self.run("cancel_order_line_return", |tx| {
            let at = tx.now();
            let order = order_mut(tx, order_id)?;
            let (line_id, quantity) = order.cancel_line_return(return_id, actor, at)?;
            let product_id = order.line(line_id)?.product_id;
            draw_product(tx, LineRef::Order(line_id), product_id, quantity)?;
            reassign_salesman(tx, &self.policy, order_id, "order line return cancelled")
        })
    }

    /// Take a sold assembly back: SOLD → FINISHED, florist commission reversed.
    #[instrument(skip(self), err)]
    pub fn return_assembly_sale(
        &self,
        order_id: OrderId,
        sale_line_id: AssemblySaleLineId,
    ) -> BackOfficeResult<ReturnId> {
        self.run("return_assembly_sale", |tx| {
            let at = tx.now();
            let order = order_mut(tx, order_id)?;
            let return_id = order.add_assembly_return(sale_line_id, at)?;
            let sale = order.assembly_sale(sale_line_id)?.clone();
            set_status(tx, sale.assembly_id, AssemblyTransition::Unsell)?;
            reverse_florist_sale(tx, &sale, "assembly returned");
            Ok(return_id)
        })
    }

    /// Undo an assembly return; the assembly must still be FINISHED.
    #[instrument(skip(self), err)]
    pub fn cancel_assembly_sale_return(
        &self,
        order_id: OrderId,
        return_id: ReturnId,
        actor: UserId,
    ) -> BackOfficeResult<()> {
        self.run("cancel_assembly_sale_return", |tx| {
            let at = tx.now();
            let order = order_mut(tx, order_id)?;
            let sale_line_id = order.cancel_assembly_return(return_id, actor, at)?;
            let sale = order.assembly_sale(sale_line_id)?.clone();
            set_status(tx, sale.assembly_id, AssemblyTransition::Sell)?;
            pay_florist_sale(tx, &self.policy, &sale)
        })
    }

    /// Income from, or refund to, the client.
    #[instrument(skip(self), err)]
    pub fn record_payment(&self, order_id: OrderId, payment: NewPayment) -> BackOfficeResult<PaymentId> {
        self.run("record_payment", |tx| add_payment(tx, order_id, payment))
    }
}
