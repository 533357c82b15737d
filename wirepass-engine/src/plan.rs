//! Subscription plan catalog.
//!
//! Payment collection lives in the front-end; a completed purchase reaches
//! the engine as `GrantPaid` with the plan's hour count. Prices are minor
//! currency units.

/// A purchasable subscription plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    pub months: u32,
    pub hours: i64,
    pub price_minor: u64,
}

/// The available plans.
pub const PLANS: [Plan; 4] = [
    Plan { months: 1, hours: 730, price_minor: 25_000 },
    Plan { months: 3, hours: 2_190, price_minor: 69_000 },
    Plan { months: 6, hours: 4_380, price_minor: 130_000 },
    Plan { months: 12, hours: 8_761, price_minor: 240_000 },
];

/// Looks up a plan by its month count.
#[must_use]
pub fn plan_for_months(months: u32) -> Option<Plan> {
    PLANS.iter().copied().find(|p| p.months == months)
}
