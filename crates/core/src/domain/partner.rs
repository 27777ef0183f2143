use serde::{Deserialize, Serialize};

use crate::pricing::PricingRule;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartnerId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerProfile {
    pub id: PartnerId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_color: Option<String>,
}

/// Body of `GET /api/partners/{partnerId}/pricing`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerPricing {
    #[serde(default)]
    pub partner: Option<PartnerProfile>,
    #[serde(default)]
    pub rules: Vec<PricingRule>,
    #[serde(default)]
    pub available_pests: Vec<String>,
}
