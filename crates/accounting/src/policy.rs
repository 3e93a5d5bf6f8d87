//! Commission amounts. Which worker is paid is decided by the caller.

use serde::{Deserialize, Serialize};

use petalerp_core::percent_of;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensationPolicy {
    /// Salesman share of the net opted-in product sale, in percent.
    pub salesman_percent: u32,
}

impl Default for CompensationPolicy {
    fn default() -> Self {
        Self { salesman_percent: 5 }
    }
}

impl CompensationPolicy {
    /// `base` is Σ (line total − active return totals) over opted-in lines.
    pub fn salesman_commission(&self, base: i64) -> i64 {
        percent_of(base.max(0), self.salesman_percent)
    }

    pub fn florist_sale_commission(&self, sale_price: i64, florist_sale_percent: u32) -> i64 {
        percent_of(sale_price.max(0), florist_sale_percent)
    }
}
