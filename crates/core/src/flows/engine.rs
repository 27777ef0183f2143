use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::flows::states::{FlowContext, FormStep, IntakeEvent, TransitionOutcome};

pub trait FlowDefinition {
    fn initial_state(&self) -> FormStep;
    fn transition(
        &self,
        current: FormStep,
        event: &IntakeEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>;
}

#[derive(Clone, Debug, Default)]
pub struct IntakeFlow;

impl FlowDefinition for IntakeFlow {
    fn initial_state(&self) -> FormStep {
        FormStep::PestType
    }

    fn transition(
        &self,
        current: FormStep,
        event: &IntakeEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition_intake(current, event, context)
    }
}

#[derive(Clone, Debug)]
pub struct FlowEngine<F> {
    flow: F,
}

impl<F> FlowEngine<F>
where
    F: FlowDefinition,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn initial_state(&self) -> FormStep {
        self.flow.initial_state()
    }

    pub fn apply(
        &self,
        current: FormStep,
        event: &IntakeEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        self.flow.transition(current, event, context)
    }

    pub fn apply_with_audit<S>(
        &self,
        current: FormStep,
        event: &IntakeEvent,
        context: &FlowContext,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>
    where
        S: AuditSink + ?Sized,
    {
        let result = self.apply(current, event, context);
        match &result {
            Ok(outcome) => {
                sink.emit(
                    AuditEvent::from_context(
                        audit,
                        "intake.transition_applied",
                        AuditCategory::Flow,
                        AuditOutcome::Success,
                    )
                    .with_metadata("from", outcome.from.index().to_string())
                    .with_metadata("to", outcome.to.index().to_string())
                    .with_metadata("event", format!("{:?}", outcome.event)),
                );
            }
            Err(error) => {
                sink.emit(
                    AuditEvent::from_context(
                        audit,
                        "intake.transition_rejected",
                        AuditCategory::Flow,
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }
}

impl Default for FlowEngine<IntakeFlow> {
    fn default() -> Self {
        Self::new(IntakeFlow)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("form does not validate at step {state:?}: {invalid_fields:?}")]
    ValidationFailed { state: FormStep, invalid_fields: Vec<String> },
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: FormStep, event: IntakeEvent },
}

fn transition_intake(
    current: FormStep,
    event: &IntakeEvent,
    context: &FlowContext,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use FormStep::{Contact, PestType, Submitted};
    use IntakeEvent::{Back, Next, SubmissionAccepted, SubmissionRejected};

    let to = match (current, event) {
        (Submitted, _) => {
            return Err(FlowTransitionError::InvalidTransition {
                state: current,
                event: event.clone(),
            });
        }
        // Gated on the whole form, not only the fields of the current step.
        (_, Next) => {
            if !context.invalid_fields.is_empty() {
                return Err(FlowTransitionError::ValidationFailed {
                    state: current,
                    invalid_fields: context.invalid_fields.clone(),
                });
            }
            FormStep::from_index(current.index() + 1)
                .filter(|next| *next <= Contact)
                .unwrap_or(Contact)
        }
        (_, Back) => {
            current.index().checked_sub(1).and_then(FormStep::from_index).unwrap_or(PestType)
        }
        (Contact, SubmissionAccepted) => Submitted,
        (Contact, SubmissionRejected) => Contact,
        _ => {
            return Err(FlowTransitionError::InvalidTransition {
                state: current,
                event: event.clone(),
            });
        }
    };

    Ok(TransitionOutcome { from: current, to, event: event.clone() })
}
