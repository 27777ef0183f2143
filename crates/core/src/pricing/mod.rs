pub mod rules;
pub mod tracker;

use serde::{Deserialize, Serialize};

pub use self::rules::{PricingQuery, PricingRule, PricingTable, Variant};
pub use self::tracker::PriceTracker;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceEstimate {
    pub amount: u64,
    pub variant: Option<Variant>,
    pub matched_rule: Option<usize>,
}

impl PriceEstimate {
    pub fn unpriced(variant: Option<Variant>) -> Self {
        Self { amount: 0, variant, matched_rule: None }
    }
}

pub trait PricingEngine: Send + Sync {
    fn estimate(&self, table: &PricingTable, query: &PricingQuery<'_>) -> PriceEstimate;
}

#[derive(Clone, Debug, Default)]
pub struct RuleTablePricingEngine;

impl PricingEngine for RuleTablePricingEngine {
    fn estimate(&self, table: &PricingTable, query: &PricingQuery<'_>) -> PriceEstimate {
        estimate_price(table, query)
    }
}

/// Approximate price for the query: the base price of the first exactly matching rule,
/// or 0 when nothing matches. Negative base prices clamp to 0.
pub fn evaluate_price(table: &PricingTable, query: &PricingQuery<'_>) -> u64 {
    estimate_price(table, query).amount
}

pub fn estimate_price(table: &PricingTable, query: &PricingQuery<'_>) -> PriceEstimate {
    let variant = query.variant();
    match table.find(query) {
        Some((index, rule)) => PriceEstimate {
            amount: u64::try_from(rule.base_price).unwrap_or(0),
            variant,
            matched_rule: Some(index),
        },
        None => PriceEstimate::unpriced(variant),
    }
}
