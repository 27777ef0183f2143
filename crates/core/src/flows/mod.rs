pub mod engine;
pub mod states;

pub use engine::{FlowDefinition, FlowEngine, FlowTransitionError, IntakeFlow};
pub use states::{FlowContext, FormStep, IntakeEvent, TransitionOutcome};
