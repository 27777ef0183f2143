use std::sync::atomic::{AtomicU64, Ordering};

use serde::{de, Deserialize, Deserializer, Serialize};

use crate::domain::lead::{LeadDraft, ObjectType, PestType};

const DEFAULT_VARIANT: &str = "default";

static NEXT_REVISION: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingRule {
    pub pest_type: PestType,
    pub object_type: ObjectType,
    #[serde(default)]
    pub variant: Option<String>,
    /// Whole currency units. Backends that send `2000.0` or `"2000"` are accepted;
    /// fractional amounts are rounded to the nearest unit.
    #[serde(deserialize_with = "deserialize_base_price")]
    pub base_price: i64,
}

fn deserialize_base_price<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    struct BasePriceVisitor;

    impl de::Visitor<'_> for BasePriceVisitor {
        type Value = i64;

        fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("a price as an integer, a float or a numeric string")
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<i64, E> {
            Ok(value)
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<i64, E> {
            i64::try_from(value).map_err(|_| E::custom(format!("price {value} is out of range")))
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<i64, E> {
            if !value.is_finite() || value.abs() > i64::MAX as f64 {
                return Err(E::custom(format!("price {value} is out of range")));
            }
            Ok(value.round() as i64)
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<i64, E> {
            let trimmed = value.trim();
            if let Ok(whole) = trimmed.parse::<i64>() {
                return Ok(whole);
            }
            let parsed = trimmed
                .parse::<f64>()
                .map_err(|_| E::invalid_value(de::Unexpected::Str(value), &self))?;
            self.visit_f64(parsed)
        }
    }

    deserializer.deserialize_any(BasePriceVisitor)
}

impl PricingRule {
    pub fn variant(&self) -> Variant {
        Variant::parse(self.variant.as_deref())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variant {
    Default,
    Named(String),
}

impl Variant {
    /// Missing, blank and `default` all denote the implicit default variant.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") | Some(DEFAULT_VARIANT) => Self::Default,
            Some(named) => Self::Named(named.to_owned()),
        }
    }

    /// Apartments are priced per room count; an apartment without rooms has no variant
    /// and therefore no price.
    pub fn for_object(object_type: &ObjectType, rooms: Option<u8>) -> Option<Self> {
        if object_type.is_apartment() {
            return rooms.map(|rooms| Self::Named(rooms.to_string()));
        }
        Some(Self::Default)
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Default => f.write_str(DEFAULT_VARIANT),
            Self::Named(name) => f.write_str(name),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PricingQuery<'a> {
    pub pest_type: &'a PestType,
    pub object_type: &'a ObjectType,
    pub rooms: Option<u8>,
}

impl<'a> PricingQuery<'a> {
    pub fn from_draft(draft: &'a LeadDraft) -> Self {
        Self { pest_type: &draft.pest_type, object_type: &draft.object_type, rooms: draft.rooms }
    }

    pub fn variant(&self) -> Option<Variant> {
        Variant::for_object(self.object_type, self.rooms)
    }
}

/// Partner rule set, read-only for the lifetime of a session. Every table gets a
/// process-unique revision so derived prices can tell two tables apart.
#[derive(Clone, Debug)]
pub struct PricingTable {
    revision: u64,
    rules: Vec<PricingRule>,
}

impl PricingTable {
    pub fn new(rules: Vec<PricingRule>) -> Self {
        Self { revision: NEXT_REVISION.fetch_add(1, Ordering::Relaxed), rules }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn rules(&self) -> &[PricingRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First rule matching the exact (pest type, object type, variant) triple.
    pub fn find(&self, query: &PricingQuery<'_>) -> Option<(usize, &PricingRule)> {
        let variant = query.variant()?;
        self.rules.iter().enumerate().find(|(_, rule)| {
            &rule.pest_type == query.pest_type
                && &rule.object_type == query.object_type
                && rule.variant() == variant
        })
    }
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::empty()
    }
}
