use chrono::NaiveDate;

use crate::domain::lead::{InfestationLevel, LeadDraft, ObjectType, PestType, PriorTreatment};
use crate::errors::DomainError;
use crate::intake::schema::LeadField;

/// A single form input change, as produced by a field binding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldInput {
    PestType(String),
    ObjectType(String),
    Rooms(Option<u8>),
    Infestation(InfestationLevel),
    PreviousTreatment(PriorTreatment),
    Phone(String),
    Name(String),
    Address(String),
    ExpectedDate(Option<NaiveDate>),
    ClientComment(String),
}

impl FieldInput {
    /// Builds an input from raw text. Empty text clears optional fields.
    pub fn parse(field: LeadField, raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        let input = match field {
            LeadField::PestType => Self::PestType(trimmed.to_owned()),
            LeadField::ObjectType => Self::ObjectType(trimmed.to_owned()),
            LeadField::Rooms if trimmed.is_empty() => Self::Rooms(None),
            LeadField::Rooms => Self::Rooms(Some(trimmed.parse::<u8>().map_err(|_| {
                DomainError::InvalidFieldValue {
                    field: "rooms",
                    value: trimmed.to_owned(),
                    expected: "a whole number of rooms",
                }
            })?)),
            LeadField::Infestation => Self::Infestation(trimmed.parse()?),
            LeadField::PreviousTreatment => Self::PreviousTreatment(trimmed.parse()?),
            LeadField::Phone => Self::Phone(trimmed.to_owned()),
            LeadField::Name => Self::Name(trimmed.to_owned()),
            LeadField::Address => Self::Address(trimmed.to_owned()),
            LeadField::ExpectedDate if trimmed.is_empty() => Self::ExpectedDate(None),
            LeadField::ExpectedDate => Self::ExpectedDate(Some(
                NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|_| {
                    DomainError::InvalidFieldValue {
                        field: "expectedDate",
                        value: trimmed.to_owned(),
                        expected: "an ISO-8601 date (YYYY-MM-DD)",
                    }
                })?,
            )),
            LeadField::ClientComment => Self::ClientComment(raw.to_owned()),
        };
        Ok(input)
    }

    pub fn field(&self) -> LeadField {
        match self {
            Self::PestType(_) => LeadField::PestType,
            Self::ObjectType(_) => LeadField::ObjectType,
            Self::Rooms(_) => LeadField::Rooms,
            Self::Infestation(_) => LeadField::Infestation,
            Self::PreviousTreatment(_) => LeadField::PreviousTreatment,
            Self::Phone(_) => LeadField::Phone,
            Self::Name(_) => LeadField::Name,
            Self::Address(_) => LeadField::Address,
            Self::ExpectedDate(_) => LeadField::ExpectedDate,
            Self::ClientComment(_) => LeadField::ClientComment,
        }
    }

    pub fn apply(self, draft: &mut LeadDraft) {
        match self {
            Self::PestType(value) => draft.pest_type = PestType(value),
            Self::ObjectType(value) => draft.object_type = ObjectType(value),
            Self::Rooms(value) => draft.rooms = value,
            Self::Infestation(value) => draft.infestation = value,
            Self::PreviousTreatment(value) => draft.previous_treatment = value,
            Self::Phone(value) => draft.phone = value,
            Self::Name(value) => draft.name = value,
            Self::Address(value) => draft.address = value,
            Self::ExpectedDate(value) => draft.expected_date = value,
            Self::ClientComment(value) => draft.client_comment = value,
        }
    }
}
