use tracing::{debug, instrument};

use petalerp_approval::{ApprovalKind, ApprovalSubject};
use petalerp_core::{ApprovalRequestId, DomainResult, LotId, ProductId, UserId};
use petalerp_events::EventBus;
use petalerp_inventory::{AllocationRecord, Draw, LineRef, NewLot, StockLot};

use super::BackOffice;
use super::approvals::open_request;
use crate::error::BackOfficeResult;
use crate::events::{BackOfficeEvent, Envelope};
use crate::store::Transaction;

/// Draw `quantity` of `product_id` for an order line, in draw-policy order.
pub(crate) fn draw_product(
    tx: &mut Transaction,
    line: LineRef,
    product_id: ProductId,
    quantity: i64,
) -> DomainResult<Vec<Draw>> {
    let candidates = tx.state.stock.candidate_lots(product_id);
    let draws = tx.state.stock.draw(line, quantity, &candidates)?;
    debug!(?line, quantity, ?draws, "stock drawn");
    Ok(draws)
}

/// Draw `quantity` from one specific lot (assembly lines reference a single lot).
pub(crate) fn draw_lot(
    tx: &mut Transaction,
    line: LineRef,
    lot_id: LotId,
    quantity: i64,
) -> DomainResult<Vec<Draw>> {
    let draws = tx.state.stock.draw(line, quantity, &[lot_id])?;
    debug!(?line, quantity, ?draws, "stock drawn");
    Ok(draws)
}

/// Apply a signed change in the quantity a line holds.
pub(crate) fn adjust(
    tx: &mut Transaction,
    line: LineRef,
    delta: i64,
    draw: impl FnOnce(&mut Transaction, i64) -> DomainResult<Vec<Draw>>,
) -> DomainResult<()> {
    if delta > 0 {
        draw(tx, delta)?;
    } else if delta < 0 {
        undraw(tx, line, -delta)?;
    }
    Ok(())
}

pub(crate) fn undraw(tx: &mut Transaction, line: LineRef, quantity: i64) -> DomainResult<Vec<Draw>> {
    let released = tx.state.stock.undraw(line, quantity)?;
    debug!(?line, quantity, ?released, "stock released");
    Ok(released)
}

pub(crate) fn undraw_all(tx: &mut Transaction, line: LineRef) -> DomainResult<Vec<Draw>> {
    let released = tx.state.stock.undraw_all(line)?;
    debug!(?line, ?released, "line allocation released");
    Ok(released)
}

impl<B> BackOffice<B>
where
    B: EventBus<Envelope>,
{
    /// Receive a new lot of a registered product.
    #[instrument(skip(self), err)]
    pub fn receive_lot(
        &self,
        product_id: ProductId,
        quantity: i64,
        unit_cost: i64,
        unit_price: i64,
    ) -> BackOfficeResult<LotId> {
        self.run("receive_lot", |tx| {
            tx.state.catalog.product(product_id)?;
            let at = tx.now();
            let lot_id = tx.state.stock.receive(NewLot {
                product_id,
                quantity,
                unit_cost,
                unit_price,
                received_at: at,
            })?;
            tx.emit(BackOfficeEvent::LotReceived { lot_id, product_id, quantity, at });
            Ok(lot_id)
        })
    }

    pub fn lot(&self, lot_id: LotId) -> BackOfficeResult<StockLot> {
        self.read(|s| s.stock.lot(lot_id).cloned())
    }

    pub fn on_hand(&self, product_id: ProductId) -> BackOfficeResult<i64> {
        self.read(|s| Ok(s.stock.on_hand(product_id)))
    }

    /// Allocation records currently held by a line, oldest first.
    pub fn allocations(&self, line: LineRef) -> BackOfficeResult<Vec<AllocationRecord>> {
        self.read(|s| {
            let mut records: Vec<_> = s.stock.allocations_for(line).cloned().collect();
            records.sort_by_key(|r| r.seq);
            Ok(records)
        })
    }

    /// Ask for sign-off to write `quantity` off a lot (damage, loss).
    #[instrument(skip(self), err)]
    pub fn request_stock_write_off(
        &self,
        lot_id: LotId,
        quantity: i64,
        actor: UserId,
    ) -> BackOfficeResult<ApprovalRequestId> {
        self.run("request_stock_write_off", |tx| {
            tx.state.stock.lot(lot_id)?;
            open_request(
                tx,
                ApprovalSubject::Lot(lot_id),
                ApprovalKind::WriteOffStock { quantity },
                None,
                actor,
            )
        })
    }
}

/// Effect of an accepted stock write-off: the quantity leaves the lot for good.
pub(crate) fn write_off_stock(tx: &mut Transaction, lot_id: LotId, quantity: i64) -> DomainResult<()> {
    tx.state.stock.allocate(lot_id, quantity)?;
    let at = tx.now();
    tx.emit(BackOfficeEvent::StockWrittenOff { lot_id, quantity, at });
    Ok(())
}
