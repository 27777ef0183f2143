use thiserror::Error;

use crate::config::ConfigError;
use crate::flows::FlowTransitionError;
use crate::gateway::GatewayError;
use crate::intake::{schema::ValidationReport, session::IntakeError};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid value `{value}` for {field} (expected {expected})")]
    InvalidFieldValue { field: &'static str, value: String, expected: &'static str },
    #[error(transparent)]
    FlowTransition(#[from] FlowTransitionError),
    #[error("lead draft failed validation: {0}")]
    Validation(ValidationReport),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => "Please check the highlighted fields and try again.",
            Self::ServiceUnavailable { .. } => {
                "We could not reach the booking service. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<GatewayError> for ApplicationError {
    fn from(value: GatewayError) -> Self {
        Self::Integration(value.to_string())
    }
}

impl From<ConfigError> for ApplicationError {
    fn from(value: ConfigError) -> Self {
        Self::Configuration(value.to_string())
    }
}

impl From<IntakeError> for ApplicationError {
    fn from(value: IntakeError) -> Self {
        match value {
            IntakeError::Gateway(error) => error.into(),
            IntakeError::Transition(error) => Self::Domain(DomainError::FlowTransition(error)),
            IntakeError::Field(error) => Self::Domain(error),
            IntakeError::Validation(report) => Self::Domain(DomainError::Validation(report)),
            other @ (IntakeError::SubmissionInFlight
            | IntakeError::DraftClosed
            | IntakeError::NotOnContactStep { .. }
            | IntakeError::StaleSubmission { .. }) => {
                Self::Domain(DomainError::InvariantViolation(other.to_string()))
            }
        }
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Domain(error) => Self::BadRequest {
                message: error.to_string(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Integration(message) => {
                Self::ServiceUnavailable { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}
