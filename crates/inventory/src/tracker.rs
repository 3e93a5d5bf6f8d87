//! Allocation Tracker: which lots funded which consuming line.

use serde::{Deserialize, Serialize};

use petalerp_core::entity::find;
use petalerp_core::{
    AssemblyLineId, DomainError, DomainResult, LotId, OrderLineId, ProductId, ensure_positive,
};

use crate::book::StockBook;

/// The line that consumes stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum LineRef {
    Order(OrderLineId),
    Assembly(AssemblyLineId),
}

/// Quantity of one lot held by one line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRecord {
    pub line: LineRef,
    pub lot_id: LotId,
    pub quantity: i64,
    /// Lot unit cost when the record was created.
    pub unit_cost: i64,
    /// LIFO key: bumped whenever the record is created or grown.
    pub seq: u64,
}

/// One lot movement performed by `draw` or `undraw`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draw {
    pub lot_id: LotId,
    pub quantity: i64,
    pub unit_cost: i64,
}

impl StockBook {
    /// Lots of `product_id` with stock, in draw order.
    ///
    /// Oldest receipt first; equal timestamps fall back to receipt sequence.
    pub fn candidate_lots(&self, product_id: ProductId) -> Vec<LotId> {
        let mut lots: Vec<_> = self
            .lots
            .values()
            .filter(|l| l.product_id == product_id && l.is_available())
            .collect();
        lots.sort_by_key(|l| (l.received_at, l.received_seq));
        lots.into_iter().map(|l| l.id).collect()
    }

    /// Allocate `quantity` for `line` from `candidates`, in order.
    ///
    /// On `InsufficientStock` the allocations already made by this call stay in
    /// place; the enclosing transaction must be discarded.
    pub fn draw(
        &mut self,
        line: LineRef,
        quantity: i64,
        candidates: &[LotId],
    ) -> DomainResult<Vec<Draw>> {
        ensure_positive(quantity, "quantity")?;

        let mut remaining = quantity;
        let mut draws = Vec::new();
        for &lot_id in candidates {
            if remaining == 0 {
                break;
            }
            let lot = find(&self.lots, lot_id)?;
            let take = lot.quantity().min(remaining);
            if take == 0 {
                continue;
            }
            let unit_cost = lot.unit_cost;

            self.allocate(lot_id, take)?;
            self.record(line, lot_id, take, unit_cost);
            remaining -= take;
            draws.push(Draw { lot_id, quantity: take, unit_cost });
        }

        if remaining > 0 {
            return Err(DomainError::InsufficientStock {
                requested: quantity,
                available: quantity - remaining,
            });
        }
        Ok(draws)
    }

    /// Release `quantity` held by `line`, most recent record first.
    pub fn undraw(&mut self, line: LineRef, quantity: i64) -> DomainResult<Vec<Draw>> {
        ensure_positive(quantity, "quantity")?;
        let allocated = self.allocated(line);
        if quantity > allocated {
            return Err(DomainError::InsufficientAllocated {
                requested: quantity,
                allocated,
            });
        }

        let mut order: Vec<usize> = self
            .allocations
            .iter()
            .enumerate()
            .filter(|(_, a)| a.line == line)
            .map(|(i, _)| i)
            .collect();
        order.sort_by_key(|&i| std::cmp::Reverse(self.allocations[i].seq));

        let mut remaining = quantity;
        let mut draws = Vec::new();
        for i in order {
            if remaining == 0 {
                break;
            }
            let (lot_id, take, unit_cost) = {
                let record = &mut self.allocations[i];
                let take = record.quantity.min(remaining);
                record.quantity -= take;
                (record.lot_id, take, record.unit_cost)
            };
            self.release(lot_id, take)?;
            remaining -= take;
            draws.push(Draw { lot_id, quantity: take, unit_cost });
        }

        self.allocations.retain(|a| a.quantity > 0);
        Ok(draws)
    }

    /// Release everything `line` holds. No-op for a line without records.
    pub fn undraw_all(&mut self, line: LineRef) -> DomainResult<Vec<Draw>> {
        let allocated = self.allocated(line);
        if allocated == 0 {
            return Ok(Vec::new());
        }
        self.undraw(line, allocated)
    }

    pub fn allocated(&self, line: LineRef) -> i64 {
        self.allocations_for(line).map(|a| a.quantity).sum()
    }

    /// Σ quantity × unit cost snapshot for the line.
    pub fn allocated_cost(&self, line: LineRef) -> i64 {
        self.allocations_for(line)
            .map(|a| a.quantity * a.unit_cost)
            .sum()
    }

    pub fn allocations_for(&self, line: LineRef) -> impl Iterator<Item = &AllocationRecord> {
        self.allocations.iter().filter(move |a| a.line == line)
    }

    fn record(&mut self, line: LineRef, lot_id: LotId, quantity: i64, unit_cost: i64) {
        let seq = self.next_seq();
        match self
            .allocations
            .iter_mut()
            .find(|a| a.line == line && a.lot_id == lot_id)
        {
            Some(existing) => {
                existing.quantity += quantity;
                existing.seq = seq;
            }
            None => self.allocations.push(AllocationRecord {
                line,
                lot_id,
                quantity,
                unit_cost,
                seq,
            }),
        }
    }
}
