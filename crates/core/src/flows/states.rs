use serde::{Deserialize, Serialize};

/// Intake form cursor. `Contact` is the last editable step; `Submitted` is terminal and
/// only reachable through an accepted submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FormStep {
    PestType,
    ObjectType,
    Variant,
    Infestation,
    PriorTreatment,
    Contact,
    Submitted,
}

impl FormStep {
    pub const EDITABLE: [FormStep; 6] = [
        FormStep::PestType,
        FormStep::ObjectType,
        FormStep::Variant,
        FormStep::Infestation,
        FormStep::PriorTreatment,
        FormStep::Contact,
    ];

    pub fn index(self) -> u8 {
        match self {
            Self::PestType => 0,
            Self::ObjectType => 1,
            Self::Variant => 2,
            Self::Infestation => 3,
            Self::PriorTreatment => 4,
            Self::Contact => 5,
            Self::Submitted => 6,
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::PestType),
            1 => Some(Self::ObjectType),
            2 => Some(Self::Variant),
            3 => Some(Self::Infestation),
            4 => Some(Self::PriorTreatment),
            5 => Some(Self::Contact),
            6 => Some(Self::Submitted),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Submitted
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntakeEvent {
    Next,
    Back,
    SubmissionAccepted,
    SubmissionRejected,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FlowContext {
    /// Fields currently failing whole-form validation.
    pub invalid_fields: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: FormStep,
    pub to: FormStep,
    pub event: IntakeEvent,
}
