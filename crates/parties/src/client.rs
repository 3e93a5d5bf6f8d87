use serde::{Deserialize, Serialize};

use petalerp_core::{ClientId, Entity};

/// Discount tier: clients whose lifetime purchases reach `threshold` get `percent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountTier {
    pub threshold: i64,
    pub percent: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    /// Whether the discount tier follows lifetime purchases automatically.
    pub auto_discount: bool,
    pub discount_percent: u32,
    /// Net purchases of completed orders, smallest currency unit.
    pub lifetime_purchases: i64,
}

impl Client {
    pub fn new(name: impl Into<String>, auto_discount: bool) -> Self {
        Self {
            id: ClientId::new(),
            name: name.into(),
            auto_discount,
            discount_percent: 0,
            lifetime_purchases: 0,
        }
    }

    /// Discount percent snapshotted onto new orders.
    pub fn order_discount_percent(&self) -> u32 {
        if self.auto_discount {
            self.discount_percent
        } else {
            0
        }
    }

    /// Move lifetime purchases by `delta` and re-evaluate the tier.
    ///
    /// Clients without auto-discount are left untouched; their orders carry
    /// no client percent (see `order_discount_percent`).
    pub fn record_purchase(&mut self, delta: i64, tiers: &[DiscountTier]) {
        if !self.auto_discount {
            return;
        }
        self.lifetime_purchases = (self.lifetime_purchases + delta).max(0);
        self.discount_percent = tier_percent(self.lifetime_purchases, tiers);
    }
}

/// Percent of the highest tier reached by `purchases` (0 if none).
pub fn tier_percent(purchases: i64, tiers: &[DiscountTier]) -> u32 {
    tiers
        .iter()
        .filter(|t| purchases >= t.threshold)
        .max_by_key(|t| t.threshold)
        .map(|t| t.percent)
        .unwrap_or(0)
}

impl Entity for Client {
    type Id = ClientId;
    const KIND: &'static str = "client";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tiers() -> Vec<DiscountTier> {
        vec![
            DiscountTier { threshold: 500, percent: 10 },
            DiscountTier { threshold: 100, percent: 3 },
            DiscountTier { threshold: 200, percent: 5 },
        ]
    }

    #[test]
    fn tier_is_highest_threshold_reached() {
        assert_eq!(tier_percent(99, &tiers()), 0);
        assert_eq!(tier_percent(100, &tiers()), 3);
        assert_eq!(tier_percent(499, &tiers()), 5);
        assert_eq!(tier_percent(10_000, &tiers()), 10);
    }

    #[test]
    fn manual_clients_keep_their_percent() {
        let mut client = Client::new("ana", false);
        client.discount_percent = 7;
        client.record_purchase(1_000, &tiers());
        assert_eq!(client.lifetime_purchases, 0);
        assert_eq!(client.discount_percent, 7);
        assert_eq!(client.order_discount_percent(), 0);
    }

    #[test]
    fn cancelling_a_purchase_drops_the_tier_again() {
        let mut client = Client::new("bo", true);
        client.record_purchase(250, &tiers());
        assert_eq!(client.order_discount_percent(), 5);
        client.record_purchase(-250, &tiers());
        assert_eq!(client.order_discount_percent(), 0);
    }

    proptest! {
        /// Property: the tier never decreases while purchases only grow.
        #[test]
        fn tier_is_monotonic_in_purchases(a in 0i64..1_000, b in 0i64..1_000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(tier_percent(lo, &tiers()) <= tier_percent(hi, &tiers()));
        }
    }
}
