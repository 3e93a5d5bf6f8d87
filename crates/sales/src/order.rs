use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use petalerp_core::entity::{find_in, find_in_mut};
use petalerp_core::{
    AssemblyCategoryId, AssemblyId, AssemblySaleLineId, ClientId, DomainError, DomainResult,
    Entity, OrderId, OrderLineId, PaymentId, PaymentMethodId, ProductId, ReturnId, UserId,
    WorkerId, ensure_non_negative, ensure_positive, prorate,
};

use crate::settlement::{OrderTotals, settle};
use crate::status::{OrderStatus, OrderTransition};

/// Order line: product, quantity, unit price, discount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub product_id: ProductId,
    pub quantity: i64,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: i64,
    /// Absolute discount on the whole line.
    pub discount: i64,
    /// `quantity × unit_price − discount`.
    pub total: i64,
}

impl OrderLine {
    fn recompute_total(&mut self) -> DomainResult<()> {
        let gross = self.quantity * self.unit_price;
        if self.discount > gross {
            return Err(DomainError::validation("discount cannot exceed the line amount"));
        }
        self.total = gross - self.discount;
        Ok(())
    }
}

/// Quantity of an order line given back by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineReturn {
    pub id: ReturnId,
    pub line_id: OrderLineId,
    pub quantity: i64,
    /// Amount taken off the order total.
    ///
    /// Active returns of a line are priced in creation order from the
    /// cumulative share `prorate(line.total, returned, line.quantity)`, so
    /// returning the whole line refunds exactly its total.
    pub total: i64,
    pub created_at: DateTime<Utc>,
    pub deleted_by: Option<UserId>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl OrderLineReturn {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// A finished assembly sold through this order (price snapshot at sale time).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblySaleLine {
    pub id: AssemblySaleLineId,
    pub assembly_id: AssemblyId,
    pub category_id: AssemblyCategoryId,
    pub florist_id: Option<WorkerId>,
    pub price: i64,
}

/// A sold assembly given back by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblySaleReturn {
    pub id: ReturnId,
    pub sale_line_id: AssemblySaleLineId,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
    pub deleted_by: Option<UserId>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl AssemblySaleReturn {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentDirection {
    /// Money received from the client.
    Income,
    /// Money paid back to the client.
    Outcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub method_id: PaymentMethodId,
    pub direction: PaymentDirection,
    pub amount: i64,
    pub paid_at: DateTime<Utc>,
}

macro_rules! impl_entity {
    ($t:ty, $id:ty, $kind:literal) => {
        impl Entity for $t {
            type Id = $id;
            const KIND: &'static str = $kind;

            fn id(&self) -> &Self::Id {
                &self.id
            }
        }
    };
}

impl_entity!(OrderLine, OrderLineId, "order line");
impl_entity!(OrderLineReturn, ReturnId, "order line return");
impl_entity!(AssemblySaleLine, AssemblySaleLineId, "assembly sale line");
impl_entity!(AssemblySaleReturn, ReturnId, "assembly sale return");

/// Aggregate root: Order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    client_id: Option<ClientId>,
    salesman_id: Option<WorkerId>,
    status: OrderStatus,
    lines: Vec<OrderLine>,
    assembly_sales: Vec<AssemblySaleLine>,
    line_returns: Vec<OrderLineReturn>,
    assembly_returns: Vec<AssemblySaleReturn>,
    payments: Vec<Payment>,
    manual_discount: i64,
    /// Client discount percent snapshotted at creation.
    discount_percent: u32,
    totals: OrderTotals,
    /// Net credited to the client's lifetime purchases at completion.
    credited_purchase: i64,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn new(
        client_id: Option<ClientId>,
        salesman_id: Option<WorkerId>,
        discount_percent: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: OrderId::new(),
            client_id,
            salesman_id,
            status: OrderStatus::Created,
            lines: Vec::new(),
            assembly_sales: Vec::new(),
            line_returns: Vec::new(),
            assembly_returns: Vec::new(),
            payments: Vec::new(),
            manual_discount: 0,
            discount_percent,
            totals: OrderTotals::default(),
            credited_purchase: 0,
            created_at,
            completed_at: None,
        }
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn client_id(&self) -> Option<ClientId> {
        self.client_id
    }

    pub fn salesman_id(&self) -> Option<WorkerId> {
        self.salesman_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn assembly_sales(&self) -> &[AssemblySaleLine] {
        &self.assembly_sales
    }

    pub fn line_returns(&self) -> &[OrderLineReturn] {
        &self.line_returns
    }

    pub fn assembly_returns(&self) -> &[AssemblySaleReturn] {
        &self.assembly_returns
    }

    pub fn payments(&self) -> &[Payment] {
        &self.payments
    }

    pub fn manual_discount(&self) -> i64 {
        self.manual_discount
    }

    pub fn discount_percent(&self) -> u32 {
        self.discount_percent
    }

    pub fn totals(&self) -> OrderTotals {
        self.totals
    }

    pub fn credited_purchase(&self) -> i64 {
        self.credited_purchase
    }

    /// Replace the completion credit; returns the previous one.
    pub fn set_credited_purchase(&mut self, amount: i64) -> i64 {
        std::mem::replace(&mut self.credited_purchase, amount)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn line(&self, line_id: OrderLineId) -> DomainResult<&OrderLine> {
        find_in(&self.lines, line_id)
    }

    pub fn line_return(&self, return_id: ReturnId) -> DomainResult<&OrderLineReturn> {
        find_in(&self.line_returns, return_id)
    }

    pub fn assembly_sale(&self, sale_line_id: AssemblySaleLineId) -> DomainResult<&AssemblySaleLine> {
        find_in(&self.assembly_sales, sale_line_id)
    }

    pub fn assembly_return(&self, return_id: ReturnId) -> DomainResult<&AssemblySaleReturn> {
        find_in(&self.assembly_returns, return_id)
    }

    /// Quantity of the line not covered by active returns.
    pub fn line_remaining(&self, line_id: OrderLineId) -> DomainResult<i64> {
        Ok(self.line(line_id)?.quantity - self.returned_quantity(line_id))
    }

    fn returned_quantity(&self, line_id: OrderLineId) -> i64 {
        self.line_returns
            .iter()
            .filter(|r| r.line_id == line_id && r.is_active())
            .map(|r| r.quantity)
            .sum()
    }

    fn returned_amount(&self, line_id: OrderLineId) -> i64 {
        self.line_returns
            .iter()
            .filter(|r| r.line_id == line_id && r.is_active())
            .map(|r| r.total)
            .sum()
    }

    /// Whether the assembly sale has not been returned.
    pub fn is_assembly_sale_active(&self, sale_line_id: AssemblySaleLineId) -> bool {
        !self
            .assembly_returns
            .iter()
            .any(|r| r.sale_line_id == sale_line_id && r.is_active())
    }

    pub fn active_assembly_sales(&self) -> impl Iterator<Item = &AssemblySaleLine> {
        self.assembly_sales
            .iter()
            .filter(|s| self.is_assembly_sale_active(s.id))
    }

    /// Any non-deleted return on a product line or an assembly sale.
    pub fn has_active_returns(&self) -> bool {
        self.line_returns.iter().any(OrderLineReturn::is_active)
            || self.assembly_returns.iter().any(AssemblySaleReturn::is_active)
    }

    pub fn ensure_modifiable(&self) -> DomainResult<()> {
        if !self.status.is_modifiable() {
            return Err(DomainError::invalid_transition("order", self.status, "change lines"));
        }
        Ok(())
    }

    pub fn ensure_accepts_returns(&self) -> DomainResult<()> {
        if !self.status.accepts_returns() {
            return Err(DomainError::invalid_transition("order", self.status, "take returns"));
        }
        Ok(())
    }

    /// Apply a status transition; returns the previous status.
    pub fn transition(
        &mut self,
        transition: OrderTransition,
        at: DateTime<Utc>,
    ) -> DomainResult<OrderStatus> {
        let next = self.status.next(transition)?;
        if transition == OrderTransition::Complete
            && self.lines.is_empty()
            && self.assembly_sales.is_empty()
        {
            return Err(DomainError::EmptyOrder);
        }
        let previous = self.status;
        self.status = next;
        self.completed_at = match next {
            OrderStatus::Completed => Some(at),
            _ => None,
        };
        Ok(previous)
    }

    /// Add `quantity` of a product. A line with the same product and unit price
    /// grows instead of a new line being created.
    ///
    /// Returns the line id; the caller draws `quantity` of stock for it.
    pub fn add_line(
        &mut self,
        product_id: ProductId,
        quantity: i64,
        unit_price: i64,
        discount: i64,
    ) -> DomainResult<OrderLineId> {
        self.ensure_modifiable()?;
        ensure_positive(quantity, "quantity")?;
        ensure_non_negative(unit_price, "unit price")?;
        ensure_non_negative(discount, "discount")?;

        let id = match self
            .lines
            .iter_mut()
            .find(|l| l.product_id == product_id && l.unit_price == unit_price)
        {
            Some(line) => {
                line.quantity += quantity;
                line.discount += discount;
                line.recompute_total()?;
                line.id
            }
            None => {
                let mut line = OrderLine {
                    id: OrderLineId::new(),
                    product_id,
                    quantity,
                    unit_price,
                    discount,
                    total: 0,
                };
                line.recompute_total()?;
                let id = line.id;
                self.lines.push(line);
                id
            }
        };
        self.recompute();
        Ok(id)
    }

    /// Set a line's quantity; returns the signed change in stock it must hold.
    pub fn set_line_quantity(&mut self, line_id: OrderLineId, quantity: i64) -> DomainResult<i64> {
        self.ensure_modifiable()?;
        ensure_positive(quantity, "quantity")?;
        let line = find_in_mut(&mut self.lines, line_id)?;
        let delta = quantity - line.quantity;
        line.quantity = quantity;
        line.recompute_total()?;
        self.recompute();
        Ok(delta)
    }

    pub fn remove_line(&mut self, line_id: OrderLineId) -> DomainResult<OrderLine> {
        self.ensure_modifiable()?;
        let idx = self
            .lines
            .iter()
            .position(|l| l.id == line_id)
            .ok_or_else(|| DomainError::not_found(OrderLine::KIND, line_id))?;
        let line = self.lines.remove(idx);
        self.recompute();
        Ok(line)
    }

    pub fn set_manual_discount(&mut self, amount: i64) -> DomainResult<()> {
        self.ensure_modifiable()?;
        ensure_non_negative(amount, "discount")?;
        self.manual_discount = amount;
        self.recompute();
        Ok(())
    }

    /// Record a return of `quantity` from a line.
    pub fn add_line_return(
        &mut self,
        line_id: OrderLineId,
        quantity: i64,
        at: DateTime<Utc>,
    ) -> DomainResult<ReturnId> {
        self.ensure_accepts_returns()?;
        ensure_positive(quantity, "quantity")?;
        let remaining = self.line_remaining(line_id)?;
        if quantity > remaining {
            return Err(DomainError::InsufficientAllocated {
                requested: quantity,
                allocated: remaining,
            });
        }
        let record = OrderLineReturn {
            id: ReturnId::new(),
            line_id,
            quantity,
            total: 0,
            created_at: at,
            deleted_by: None,
            deleted_at: None,
        };
        let id = record.id;
        self.line_returns.push(record);
        self.recompute();
        Ok(id)
    }

    /// Soft-delete a line return; returns the line and quantity to draw again.
    pub fn cancel_line_return(
        &mut self,
        return_id: ReturnId,
        actor: UserId,
        at: DateTime<Utc>,
    ) -> DomainResult<(OrderLineId, i64)> {
        self.ensure_accepts_returns()?;
        let record = find_in_mut(&mut self.line_returns, return_id)?;
        if !record.is_active() {
            return Err(DomainError::validation("return was already cancelled"));
        }
        record.deleted_by = Some(actor);
        record.deleted_at = Some(at);
        let out = (record.line_id, record.quantity);
        self.recompute();
        Ok(out)
    }

    pub fn add_assembly_sale(&mut self, sale: AssemblySaleLine) -> DomainResult<AssemblySaleLineId> {
        self.ensure_modifiable()?;
        ensure_non_negative(sale.price, "price")?;
        if self.assembly_sales.iter().any(|s| s.assembly_id == sale.assembly_id) {
            return Err(DomainError::validation("assembly is already on this order"));
        }
        let id = sale.id;
        self.assembly_sales.push(sale);
        self.recompute();
        Ok(id)
    }

    pub fn remove_assembly_sale(
        &mut self,
        sale_line_id: AssemblySaleLineId,
    ) -> DomainResult<AssemblySaleLine> {
        self.ensure_modifiable()?;
        let idx = self
            .assembly_sales
            .iter()
            .position(|s| s.id == sale_line_id)
            .ok_or_else(|| DomainError::not_found(AssemblySaleLine::KIND, sale_line_id))?;
        let sale = self.assembly_sales.remove(idx);
        self.assembly_returns.retain(|r| r.sale_line_id != sale_line_id);
        self.recompute();
        Ok(sale)
    }

    pub fn add_assembly_return(
        &mut self,
        sale_line_id: AssemblySaleLineId,
        at: DateTime<Utc>,
    ) -> DomainResult<ReturnId> {
        self.ensure_accepts_returns()?;
        let amount = self.assembly_sale(sale_line_id)?.price;
        if !self.is_assembly_sale_active(sale_line_id) {
            return Err(DomainError::validation("assembly sale was already returned"));
        }
        let record = AssemblySaleReturn {
            id: ReturnId::new(),
            sale_line_id,
            amount,
            created_at: at,
            deleted_by: None,
            deleted_at: None,
        };
        let id = record.id;
        self.assembly_returns.push(record);
        self.recompute();
        Ok(id)
    }

    /// Soft-delete an assembly sale return; returns the sale line it revives.
    pub fn cancel_assembly_return(
        &mut self,
        return_id: ReturnId,
        actor: UserId,
        at: DateTime<Utc>,
    ) -> DomainResult<AssemblySaleLineId> {
        self.ensure_accepts_returns()?;
        let record = find_in_mut(&mut self.assembly_returns, return_id)?;
        if !record.is_active() {
            return Err(DomainError::validation("return was already cancelled"));
        }
        record.deleted_by = Some(actor);
        record.deleted_at = Some(at);
        let sale_line_id = record.sale_line_id;
        self.recompute();
        Ok(sale_line_id)
    }

    /// Payments are taken by a completed order only.
    pub fn add_payment(&mut self, payment: Payment) -> DomainResult<PaymentId> {
        ensure_positive(payment.amount, "payment amount")?;
        if self.status != OrderStatus::Completed {
            return Err(DomainError::invalid_transition("order", self.status, "take payments"));
        }
        let id = payment.id;
        self.payments.push(payment);
        self.recompute();
        Ok(id)
    }

    /// Commission base: Σ (line total − active return totals) over lines whose
    /// product opts in.
    pub fn commission_base(&self, opted_in: impl Fn(ProductId) -> bool) -> i64 {
        self.lines
            .iter()
            .filter(|l| opted_in(l.product_id))
            .map(|l| l.total - self.returned_amount(l.id))
            .sum()
    }

    pub fn recompute(&mut self) -> OrderTotals {
        self.price_returns();
        self.totals = settle(self);
        self.totals
    }
}

impl Order {
    fn price_returns(&mut self) {
        for line in &self.lines {
            let mut returned = 0;
            for record in self
                .line_returns
                .iter_mut()
                .filter(|r| r.line_id == line.id && r.is_active())
            {
                let before = prorate(line.total, returned, line.quantity);
                returned += record.quantity;
                record.total = prorate(line.total, returned, line.quantity) - before;
            }
        }
    }
}

impl Entity for Order {
    type Id = OrderId;
    const KIND: &'static str = "order";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> Order {
        Order::new(None, None, 0, Utc::now())
    }

    fn complete(order: &mut Order) {
        order.transition(OrderTransition::Complete, Utc::now()).unwrap();
    }

    fn sale(price: i64) -> AssemblySaleLine {
        AssemblySaleLine {
            id: AssemblySaleLineId::new(),
            assembly_id: AssemblyId::new(),
            category_id: AssemblyCategoryId::new(),
            florist_id: None,
            price,
        }
    }

    #[test]
    fn completing_an_empty_order_is_rejected() {
        let mut o = order();
        assert_eq!(
            o.transition(OrderTransition::Complete, Utc::now()),
            Err(DomainError::EmptyOrder)
        );
        assert_eq!(o.status(), OrderStatus::Created);
    }

    #[test]
    fn same_product_and_price_grows_the_line() {
        let mut o = order();
        let product = ProductId::new();
        let a = o.add_line(product, 2, 50, 0).unwrap();
        let b = o.add_line(product, 3, 50, 10).unwrap();
        let c = o.add_line(product, 1, 40, 0).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(o.line(a).unwrap().total, 240);
        assert_eq!(o.totals().total, 280);
    }

    #[test]
    fn discount_cannot_exceed_line_amount() {
        let mut o = order();
        let err = o.add_line(ProductId::new(), 1, 10, 11).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(o.lines().is_empty());
    }

    #[test]
    fn set_line_quantity_reports_signed_delta() {
        let mut o = order();
        let l = o.add_line(ProductId::new(), 5, 10, 0).unwrap();
        assert_eq!(o.set_line_quantity(l, 8).unwrap(), 3);
        assert_eq!(o.set_line_quantity(l, 2).unwrap(), -6);
        assert_eq!(o.totals().total, 20);
    }

    #[test]
    fn lines_are_frozen_after_completion() {
        let mut o = order();
        let l = o.add_line(ProductId::new(), 1, 10, 0).unwrap();
        complete(&mut o);
        assert!(matches!(
            o.set_line_quantity(l, 2),
            Err(DomainError::InvalidStateTransition { .. })
        ));
        assert!(o.remove_line(l).is_err());
        assert!(o.set_manual_discount(1).is_err());
    }

    #[test]
    fn returns_need_a_completed_order_and_remaining_quantity() {
        let mut o = order();
        let l = o.add_line(ProductId::new(), 3, 10, 3).unwrap();
        assert!(o.add_line_return(l, 1, Utc::now()).is_err());

        complete(&mut o);
        let r = o.add_line_return(l, 2, Utc::now()).unwrap();
        assert_eq!(o.line_return(r).unwrap().total, 18);
        assert_eq!(o.totals().total, 9);

        let err = o.add_line_return(l, 2, Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::InsufficientAllocated { requested: 2, allocated: 1 });

        let (line_id, qty) = o.cancel_line_return(r, UserId::new(), Utc::now()).unwrap();
        assert_eq!((line_id, qty), (l, 2));
        assert_eq!(o.totals().total, 27);
        assert!(!o.has_active_returns());
    }

    #[test]
    fn assembly_sale_return_removes_its_price() {
        let mut o = order();
        let s = o.add_assembly_sale(sale(120)).unwrap();
        o.add_line(ProductId::new(), 1, 30, 0).unwrap();
        complete(&mut o);
        assert_eq!(o.totals().total, 150);

        let r = o.add_assembly_return(s, Utc::now()).unwrap();
        assert_eq!(o.totals().total, 30);
        assert!(o.has_active_returns());
        assert!(o.add_assembly_return(s, Utc::now()).is_err());
        assert_eq!(o.active_assembly_sales().count(), 0);

        assert_eq!(o.cancel_assembly_return(r, UserId::new(), Utc::now()).unwrap(), s);
        assert_eq!(o.totals().total, 150);
    }

    #[test]
    fn same_assembly_cannot_be_sold_twice_on_one_order() {
        let mut o = order();
        let first = sale(10);
        let mut second = sale(10);
        second.assembly_id = first.assembly_id;
        o.add_assembly_sale(first).unwrap();
        assert!(o.add_assembly_sale(second).is_err());
    }

    #[test]
    fn commission_base_excludes_opted_out_and_returned_amounts() {
        let mut o = order();
        let rose = ProductId::new();
        let vase = ProductId::new();
        let l = o.add_line(rose, 10, 10, 0).unwrap();
        o.add_line(vase, 1, 500, 0).unwrap();
        complete(&mut o);
        o.add_line_return(l, 4, Utc::now()).unwrap();

        assert_eq!(o.commission_base(|p| p == rose), 60);
    }

    #[test]
    fn piecemeal_returns_refund_exactly_the_line_total() {
        let mut o = order();
        // 3 × 10 − 10: the discount share does not divide evenly per unit
        let l = o.add_line(ProductId::new(), 3, 10, 10).unwrap();
        complete(&mut o);

        let returns: Vec<_> = (0..3).map(|_| o.add_line_return(l, 1, Utc::now()).unwrap()).collect();
        let refunded: i64 = returns.iter().map(|r| o.line_return(*r).unwrap().total).sum();

        assert_eq!(refunded, 20);
        assert_eq!(o.totals().total, 0);
        assert_eq!(o.commission_base(|_| true), 0);
    }

    #[test]
    fn cancelled_returns_do_not_skew_later_refunds() {
        let mut o = order();
        let l = o.add_line(ProductId::new(), 3, 10, 10).unwrap();
        complete(&mut o);

        let first = o.add_line_return(l, 1, Utc::now()).unwrap();
        o.add_line_return(l, 1, Utc::now()).unwrap();
        o.cancel_line_return(first, UserId::new(), Utc::now()).unwrap();
        o.add_line_return(l, 1, Utc::now()).unwrap();
        assert_eq!(o.totals().total, 7);

        o.add_line_return(l, 1, Utc::now()).unwrap();
        assert_eq!(o.totals().total, 0);
    }

    fn payment() -> Payment {
        Payment {
            id: PaymentId::new(),
            method_id: PaymentMethodId::new(),
            direction: PaymentDirection::Income,
            amount: 10,
            paid_at: Utc::now(),
        }
    }

    #[test]
    fn payments_need_a_completed_order() {
        let mut o = order();
        o.add_line(ProductId::new(), 1, 10, 0).unwrap();
        let err = o.add_payment(payment()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidStateTransition { .. }));

        complete(&mut o);
        o.add_payment(payment()).unwrap();
        assert_eq!(o.totals().debt, 0);

        o.transition(OrderTransition::Cancel, Utc::now()).unwrap();
        let err = o.add_payment(payment()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidStateTransition { .. }));
    }
}
