use crate::domain::lead::{LeadDraft, ObjectType, PestType};
use crate::pricing::{PriceEstimate, PricingEngine, PricingQuery, PricingTable, Variant};

#[derive(Clone, Debug, PartialEq, Eq)]
struct PricingKey {
    pest_type: PestType,
    object_type: ObjectType,
    variant: Option<Variant>,
    revision: u64,
}

impl PricingKey {
    fn capture(draft: &LeadDraft, table: &PricingTable) -> Self {
        Self {
            pest_type: draft.pest_type.clone(),
            object_type: draft.object_type.clone(),
            variant: Variant::for_object(&draft.object_type, draft.rooms),
            revision: table.revision(),
        }
    }
}

/// Derived approx price. Recomputes only when one of its inputs (pest type, object
/// type, resolved variant, rule table) differs from the last evaluation.
#[derive(Clone, Debug)]
pub struct PriceTracker<E> {
    engine: E,
    key: Option<PricingKey>,
    estimate: PriceEstimate,
    evaluations: u64,
}

impl<E> PriceTracker<E>
where
    E: PricingEngine,
{
    pub fn new(engine: E) -> Self {
        Self { engine, key: None, estimate: PriceEstimate::unpriced(None), evaluations: 0 }
    }

    /// Returns `true` when the estimate was recomputed.
    pub fn refresh(&mut self, draft: &LeadDraft, table: &PricingTable) -> bool {
        let key = PricingKey::capture(draft, table);
        if self.key.as_ref() == Some(&key) {
            return false;
        }

        self.estimate = self.engine.estimate(table, &PricingQuery::from_draft(draft));
        self.key = Some(key);
        self.evaluations += 1;
        true
    }

    pub fn amount(&self) -> u64 {
        self.estimate.amount
    }

    pub fn estimate(&self) -> &PriceEstimate {
        &self.estimate
    }

    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }
}
