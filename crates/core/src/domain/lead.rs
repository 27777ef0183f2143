use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::partner::PartnerId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeadId(pub String);

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PestType(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectType(pub String);

impl ObjectType {
    pub const APARTMENT: &'static str = "apartment";

    pub fn apartment() -> Self {
        Self(Self::APARTMENT.to_owned())
    }

    /// Apartments are the only object type whose price depends on the room count.
    pub fn is_apartment(&self) -> bool {
        self.0 == Self::APARTMENT
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfestationLevel {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorTreatment {
    #[default]
    None,
    SelfTreated,
    Professional,
}

impl std::str::FromStr for InfestationLevel {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(DomainError::InvalidFieldValue {
                field: "infestation",
                value: other.to_owned(),
                expected: "low|medium|high",
            }),
        }
    }
}

impl std::str::FromStr for PriorTreatment {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "none" => Ok(Self::None),
            "self_treated" => Ok(Self::SelfTreated),
            "professional" => Ok(Self::Professional),
            other => Err(DomainError::InvalidFieldValue {
                field: "previous_treatment",
                value: other.to_owned(),
                expected: "none|self_treated|professional",
            }),
        }
    }
}

/// In-progress lead held by an intake session. Field names follow the lead-creation
/// endpoint's JSON contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadDraft {
    pub partner_id: PartnerId,
    pub source: String,
    pub pest_type: PestType,
    pub object_type: ObjectType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rooms: Option<u8>,
    pub infestation: InfestationLevel,
    pub previous_treatment: PriorTreatment,
    pub approx_price: u64,
    pub phone: String,
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub expected_date: Option<NaiveDate>,
    pub client_comment: String,
}

impl LeadDraft {
    pub fn new(partner_id: PartnerId, source: impl Into<String>, default_pest: PestType) -> Self {
        Self {
            partner_id,
            source: source.into(),
            pest_type: default_pest,
            object_type: ObjectType::apartment(),
            rooms: Some(1),
            infestation: InfestationLevel::default(),
            previous_treatment: PriorTreatment::default(),
            approx_price: 0,
            phone: String::new(),
            name: String::new(),
            address: String::new(),
            expected_date: None,
            client_comment: String::new(),
        }
    }
}
