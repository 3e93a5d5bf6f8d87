//! Wholesale assembly rollup.
//!
//! Totals are always recomputed from the lines and active returns; nothing is
//! incremented in place.

use serde::{Deserialize, Serialize};

use crate::assembly::{AssemblyLine, AssemblyReturn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyTotals {
    /// Σ line price totals − Σ active return price totals.
    pub subtotal: i64,
    /// Markup currently applied on top of `subtotal`.
    pub charge: i64,
    /// Σ line cost totals − Σ active return cost totals.
    pub cost: i64,
    /// `subtotal + charge`.
    pub price: i64,
}

pub fn rollup(lines: &[AssemblyLine], returns: &[AssemblyReturn], charge: i64) -> AssemblyTotals {
    let active = returns.iter().filter(|r| r.is_active());

    let lines_price: i64 = lines.iter().map(AssemblyLine::price_total).sum();
    let lines_cost: i64 = lines.iter().map(AssemblyLine::cost_total).sum();
    let (returned_price, returned_cost) =
        active.fold((0, 0), |(p, c), r| (p + r.price_total, c + r.cost_total));

    let subtotal = lines_price - returned_price;
    AssemblyTotals {
        subtotal,
        charge,
        cost: lines_cost - returned_cost,
        price: subtotal + charge,
    }
}
