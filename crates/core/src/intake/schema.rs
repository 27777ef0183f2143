use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::lead::LeadDraft;
use crate::flows::FormStep;

const MAX_ROOMS: u8 = 20;
const MIN_PHONE_DIGITS: usize = 10;
const MAX_PHONE_DIGITS: usize = 15;
const MAX_ADDRESS_CHARS: usize = 300;
const MAX_COMMENT_CHARS: usize = 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LeadField {
    PestType,
    ObjectType,
    Rooms,
    Infestation,
    PreviousTreatment,
    Phone,
    Name,
    Address,
    ExpectedDate,
    ClientComment,
}

impl LeadField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PestType => "pestType",
            Self::ObjectType => "objectType",
            Self::Rooms => "rooms",
            Self::Infestation => "infestation",
            Self::PreviousTreatment => "previousTreatment",
            Self::Phone => "phone",
            Self::Name => "name",
            Self::Address => "address",
            Self::ExpectedDate => "expectedDate",
            Self::ClientComment => "clientComment",
        }
    }

    /// Step whose screen renders this field.
    pub fn step(self) -> FormStep {
        match self {
            Self::PestType => FormStep::PestType,
            Self::ObjectType => FormStep::ObjectType,
            Self::Rooms => FormStep::Variant,
            Self::Infestation => FormStep::Infestation,
            Self::PreviousTreatment => FormStep::PriorTreatment,
            Self::Phone | Self::Name | Self::Address | Self::ExpectedDate | Self::ClientComment => {
                FormStep::Contact
            }
        }
    }
}

impl std::fmt::Display for LeadField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: LeadField,
    pub code: String,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub violations: Vec<FieldViolation>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn field_names(&self) -> Vec<String> {
        self.violations.iter().map(|violation| violation.field.as_str().to_owned()).collect()
    }

    pub fn for_step(&self, step: FormStep) -> Vec<&FieldViolation> {
        self.violations.iter().filter(|violation| violation.field.step() == step).collect()
    }

    pub fn has(&self, field: LeadField, code: &str) -> bool {
        self.violations.iter().any(|violation| violation.field == field && violation.code == code)
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered = self
            .violations
            .iter()
            .map(|violation| format!("{}: {}", violation.field, violation.message))
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&rendered)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RuleScope {
    /// Checked by the whole-form gate and at submission.
    Always,
    /// Presence requirements, only enforced when submitting.
    Submission,
}

struct RuleContext<'a> {
    available_pests: &'a [String],
    today: NaiveDate,
}

struct FieldRule {
    field: LeadField,
    code: &'static str,
    message: &'static str,
    scope: RuleScope,
    check: fn(&LeadDraft, &RuleContext<'_>) -> bool,
}

const RULES: &[FieldRule] = &[
    FieldRule {
        field: LeadField::PestType,
        code: "REQUIRED",
        message: "Choose what you need treated",
        scope: RuleScope::Always,
        check: pest_present,
    },
    FieldRule {
        field: LeadField::PestType,
        code: "NOT_OFFERED",
        message: "This partner does not treat the selected pest",
        scope: RuleScope::Always,
        check: pest_offered,
    },
    FieldRule {
        field: LeadField::ObjectType,
        code: "REQUIRED",
        message: "Choose the type of premises",
        scope: RuleScope::Always,
        check: object_present,
    },
    FieldRule {
        field: LeadField::Rooms,
        code: "OUT_OF_RANGE",
        message: "Apartments need a room count between 1 and 20",
        scope: RuleScope::Always,
        check: rooms_in_range,
    },
    FieldRule {
        field: LeadField::Phone,
        code: "INVALID_FORMAT",
        message: "Phone must contain 10 to 15 digits",
        scope: RuleScope::Always,
        check: phone_well_formed,
    },
    FieldRule {
        field: LeadField::Address,
        code: "TOO_LONG",
        message: "Address must be at most 300 characters",
        scope: RuleScope::Always,
        check: address_fits,
    },
    FieldRule {
        field: LeadField::ExpectedDate,
        code: "IN_PAST",
        message: "Preferred date cannot be in the past",
        scope: RuleScope::Always,
        check: date_not_past,
    },
    FieldRule {
        field: LeadField::ClientComment,
        code: "TOO_LONG",
        message: "Comment must be at most 1000 characters",
        scope: RuleScope::Always,
        check: comment_fits,
    },
    FieldRule {
        field: LeadField::Phone,
        code: "REQUIRED",
        message: "Enter a phone number so we can call you back",
        scope: RuleScope::Submission,
        check: phone_present,
    },
    FieldRule {
        field: LeadField::Name,
        code: "REQUIRED",
        message: "Tell us how to address you",
        scope: RuleScope::Submission,
        check: name_present,
    },
];

/// Declarative lead schema. `validate` is the whole-form format check used to gate
/// navigation; `validate_for_submission` also enforces required contact fields.
#[derive(Clone, Debug, Default)]
pub struct LeadSchema {
    available_pests: Vec<String>,
}

impl LeadSchema {
    pub fn new(available_pests: Vec<String>) -> Self {
        Self { available_pests }
    }

    pub fn available_pests(&self) -> &[String] {
        &self.available_pests
    }

    pub fn validate(&self, draft: &LeadDraft, today: NaiveDate) -> ValidationReport {
        self.run(draft, today, |scope| scope == RuleScope::Always)
    }

    pub fn validate_for_submission(
        &self,
        draft: &LeadDraft,
        today: NaiveDate,
    ) -> ValidationReport {
        self.run(draft, today, |_| true)
    }

    pub fn validate_step(
        &self,
        draft: &LeadDraft,
        step: FormStep,
        today: NaiveDate,
    ) -> Vec<FieldViolation> {
        self.validate(draft, today)
            .violations
            .into_iter()
            .filter(|violation| violation.field.step() == step)
            .collect()
    }

    fn run(
        &self,
        draft: &LeadDraft,
        today: NaiveDate,
        include: impl Fn(RuleScope) -> bool,
    ) -> ValidationReport {
        let context = RuleContext { available_pests: &self.available_pests, today };
        let violations = RULES
            .iter()
            .filter(|rule| include(rule.scope))
            .filter(|rule| !(rule.check)(draft, &context))
            .map(|rule| FieldViolation {
                field: rule.field,
                code: rule.code.to_owned(),
                message: rule.message.to_owned(),
            })
            .collect();
        ValidationReport { violations }
    }
}

fn pest_present(draft: &LeadDraft, _: &RuleContext<'_>) -> bool {
    !draft.pest_type.0.trim().is_empty()
}

fn pest_offered(draft: &LeadDraft, context: &RuleContext<'_>) -> bool {
    let pest = draft.pest_type.0.trim();
    pest.is_empty()
        || context.available_pests.is_empty()
        || context.available_pests.iter().any(|offered| offered == pest)
}

fn object_present(draft: &LeadDraft, _: &RuleContext<'_>) -> bool {
    !draft.object_type.0.trim().is_empty()
}

fn rooms_in_range(draft: &LeadDraft, _: &RuleContext<'_>) -> bool {
    if !draft.object_type.is_apartment() {
        return true;
    }
    matches!(draft.rooms, Some(rooms) if (1..=MAX_ROOMS).contains(&rooms))
}

fn phone_well_formed(draft: &LeadDraft, _: &RuleContext<'_>) -> bool {
    let phone = draft.phone.trim();
    if phone.is_empty() {
        return true;
    }
    let allowed = phone.chars().all(|ch| ch.is_ascii_digit() || "+-() ".contains(ch));
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    allowed && (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits)
}

fn address_fits(draft: &LeadDraft, _: &RuleContext<'_>) -> bool {
    draft.address.chars().count() <= MAX_ADDRESS_CHARS
}

fn date_not_past(draft: &LeadDraft, context: &RuleContext<'_>) -> bool {
    draft.expected_date.map_or(true, |date| date >= context.today)
}

fn comment_fits(draft: &LeadDraft, _: &RuleContext<'_>) -> bool {
    draft.client_comment.chars().count() <= MAX_COMMENT_CHARS
}

fn phone_present(draft: &LeadDraft, _: &RuleContext<'_>) -> bool {
    !draft.phone.trim().is_empty()
}

fn name_present(draft: &LeadDraft, _: &RuleContext<'_>) -> bool {
    !draft.name.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{LeadField, LeadSchema};
    use crate::domain::{
        lead::{LeadDraft, ObjectType, PestType},
        partner::PartnerId,
    };
    use crate::flows::FormStep;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 14).expect("valid date")
    }

    fn draft() -> LeadDraft {
        LeadDraft::new(PartnerId("p-1".to_owned()), "landing", PestType("cockroaches".to_owned()))
    }

    #[test]
    fn mount_defaults_pass_the_navigation_gate() {
        let schema = LeadSchema::new(vec!["cockroaches".to_owned(), "bedbugs".to_owned()]);
        assert!(schema.validate(&draft(), today()).is_valid());
    }

    #[test]
    fn submission_requires_contact_details() {
        let schema = LeadSchema::default();
        let report = schema.validate_for_submission(&draft(), today());

        assert!(report.has(LeadField::Phone, "REQUIRED"));
        assert!(report.has(LeadField::Name, "REQUIRED"));
        assert_eq!(report.violations.len(), 2);
    }

    #[test]
    fn pests_outside_the_partner_offer_are_rejected() {
        let schema = LeadSchema::new(vec!["bedbugs".to_owned()]);
        let report = schema.validate(&draft(), today());
        assert!(report.has(LeadField::PestType, "NOT_OFFERED"));

        let open_schema = LeadSchema::default();
        assert!(open_schema.validate(&draft(), today()).is_valid());
    }

    #[test]
    fn apartments_need_a_sane_room_count() {
        let schema = LeadSchema::default();
        let mut draft = draft();

        draft.rooms = Some(0);
        assert!(schema.validate(&draft, today()).has(LeadField::Rooms, "OUT_OF_RANGE"));
        draft.rooms = None;
        assert!(schema.validate(&draft, today()).has(LeadField::Rooms, "OUT_OF_RANGE"));

        draft.object_type = ObjectType("house".to_owned());
        assert!(schema.validate(&draft, today()).is_valid());
    }

    #[test]
    fn phone_format_is_checked_once_entered() {
        let schema = LeadSchema::default();
        let mut draft = draft();

        draft.phone = "12345".to_owned();
        assert!(schema.validate(&draft, today()).has(LeadField::Phone, "INVALID_FORMAT"));
        draft.phone = "8 (900) 123 45 67x".to_owned();
        assert!(schema.validate(&draft, today()).has(LeadField::Phone, "INVALID_FORMAT"));
        draft.phone = "+7 (900) 123-45-67".to_owned();
        assert!(schema.validate(&draft, today()).is_valid());
    }

    #[test]
    fn past_dates_are_rejected() {
        let schema = LeadSchema::default();
        let mut draft = draft();

        draft.expected_date = NaiveDate::from_ymd_opt(2026, 10, 13);
        assert!(schema.validate(&draft, today()).has(LeadField::ExpectedDate, "IN_PAST"));
        draft.expected_date = Some(today());
        assert!(schema.validate(&draft, today()).is_valid());
    }

    #[test]
    fn step_view_only_returns_fields_of_that_step() {
        let schema = LeadSchema::default();
        let mut draft = draft();
        draft.rooms = Some(0);
        draft.phone = "1".to_owned();

        let variant_step = schema.validate_step(&draft, FormStep::Variant, today());
        assert_eq!(variant_step.len(), 1);
        assert_eq!(variant_step[0].field, LeadField::Rooms);
        assert!(schema.validate_step(&draft, FormStep::PestType, today()).is_empty());

        let report = schema.validate(&draft, today());
        assert_eq!(report.for_step(FormStep::Contact).len(), 1);
        assert_eq!(report.field_names(), vec!["rooms".to_owned(), "phone".to_owned()]);
    }
}
