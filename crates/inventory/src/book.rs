use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use petalerp_core::entity::{find, find_mut};
use petalerp_core::{
    DomainError, DomainResult, LotId, ProductId, ensure_non_negative, ensure_positive,
};

use crate::lot::StockLot;
use crate::tracker::AllocationRecord;

/// Lots plus the allocation records drawn against them.
#[derive(Debug, Clone, Default)]
pub struct StockBook {
    pub(crate) lots: BTreeMap<LotId, StockLot>,
    pub(crate) allocations: Vec<AllocationRecord>,
    next_seq: u64,
}

/// Input for receiving a new lot into stock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLot {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_cost: i64,
    pub unit_price: i64,
    pub received_at: DateTime<Utc>,
}

impl StockBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Receive a lot. Zero-quantity lots are allowed (stock may arrive later via returns).
    pub fn receive(&mut self, lot: NewLot) -> DomainResult<LotId> {
        ensure_non_negative(lot.quantity, "quantity")?;
        ensure_non_negative(lot.unit_cost, "unit cost")?;
        ensure_non_negative(lot.unit_price, "unit price")?;

        let id = LotId::new();
        let received_seq = self.next_seq();
        self.lots.insert(
            id,
            StockLot {
                id,
                product_id: lot.product_id,
                received_seq,
                received_at: lot.received_at,
                quantity: lot.quantity,
                unit_cost: lot.unit_cost,
                unit_price: lot.unit_price,
            },
        );
        Ok(id)
    }

    pub fn lot(&self, id: LotId) -> DomainResult<&StockLot> {
        find(&self.lots, id)
    }

    pub fn lots(&self) -> impl Iterator<Item = &StockLot> {
        self.lots.values()
    }

    /// Take `quantity` out of a lot. No partial effect on failure.
    pub fn allocate(&mut self, lot_id: LotId, quantity: i64) -> DomainResult<()> {
        ensure_positive(quantity, "quantity")?;
        let lot = find_mut(&mut self.lots, lot_id)?;
        if lot.quantity < quantity {
            return Err(DomainError::InsufficientStock {
                requested: quantity,
                available: lot.quantity,
            });
        }
        lot.quantity -= quantity;
        Ok(())
    }

    /// Put `quantity` back into a lot. Returns are always accepted.
    pub fn release(&mut self, lot_id: LotId, quantity: i64) -> DomainResult<()> {
        ensure_positive(quantity, "quantity")?;
        let lot = find_mut(&mut self.lots, lot_id)?;
        lot.quantity += quantity;
        Ok(())
    }

    /// On-hand quantity of a product across all its lots.
    pub fn on_hand(&self, product_id: ProductId) -> i64 {
        self.lots
            .values()
            .filter(|l| l.product_id == product_id)
            .map(|l| l.quantity)
            .sum()
    }

    /// Σ on-hand quantity across every lot.
    pub fn total_on_hand(&self) -> i64 {
        self.lots.values().map(|l| l.quantity).sum()
    }

    /// Σ quantity held by allocation records.
    pub fn total_allocated(&self) -> i64 {
        self.allocations.iter().map(|a| a.quantity).sum()
    }
}
