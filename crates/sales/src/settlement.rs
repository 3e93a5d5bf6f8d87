//! Order settlement: total, discount, paid and debt.
//!
//! Recomputed from scratch after every mutation of an order.

use serde::{Deserialize, Serialize};

use petalerp_core::percent_of;

use crate::order::{Order, PaymentDirection};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    /// Σ line totals + Σ active assembly sale prices − Σ active line returns.
    pub total: i64,
    /// Manual discount plus the client's percent of `total`.
    pub discount: i64,
    /// Σ income payments − Σ outcome payments.
    pub paid: i64,
    /// `total − discount − paid`.
    pub debt: i64,
}

impl OrderTotals {
    /// What the client owes for the goods: `total − discount`.
    pub fn net(&self) -> i64 {
        self.total - self.discount
    }
}

pub fn settle(order: &Order) -> OrderTotals {
    let lines: i64 = order.lines().iter().map(|l| l.total).sum();
    let assemblies: i64 = order.active_assembly_sales().map(|s| s.price).sum();
    let returned: i64 = order
        .line_returns()
        .iter()
        .filter(|r| r.is_active())
        .map(|r| r.total)
        .sum();
    let total = lines + assemblies - returned;

    let discount = order.manual_discount() + percent_of(total, order.discount_percent());

    let paid = order
        .payments()
        .iter()
        .map(|p| match p.direction {
            PaymentDirection::Income => p.amount,
            PaymentDirection::Outcome => -p.amount,
        })
        .sum::<i64>();

    OrderTotals {
        total,
        discount,
        paid,
        debt: total - discount - paid,
    }
}
