use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use petalerp_core::{Entity, LotId, ProductId};

/// A lot of a single product with its on-hand quantity and unit cost/price.
///
/// `quantity` is private: only [`crate::StockBook`] changes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLot {
    pub id: LotId,
    pub product_id: ProductId,
    /// Receipt order within the book; breaks ties between equal `received_at`.
    pub received_seq: u64,
    pub received_at: DateTime<Utc>,
    pub(crate) quantity: i64,
    /// Unit cost in smallest currency unit.
    pub unit_cost: i64,
    /// Unit sale price in smallest currency unit.
    pub unit_price: i64,
}

impl StockLot {
    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn is_available(&self) -> bool {
        self.quantity > 0
    }
}

impl Entity for StockLot {
    type Id = LotId;
    const KIND: &'static str = "lot";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
