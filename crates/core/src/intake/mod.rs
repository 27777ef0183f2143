pub mod binding;
pub mod context;
pub mod schema;
pub mod session;

pub use binding::FieldInput;
pub use context::SessionContext;
pub use schema::{FieldViolation, LeadField, LeadSchema, ValidationReport};
pub use session::{IntakeError, IntakeSession, PendingSubmission, SubmitOutcome};
