pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod gateway;
pub mod intake;
pub mod pricing;

pub use audit::{AuditEvent, AuditSink, InMemoryAuditSink, NoopAuditSink};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use domain::lead::{InfestationLevel, LeadDraft, LeadId, ObjectType, PestType, PriorTreatment};
pub use domain::partner::{PartnerId, PartnerPricing, PartnerProfile};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use flows::{FormStep, IntakeEvent};
pub use gateway::{CreatedLead, CsrfToken, GatewayError, InMemoryLeadGateway, LeadGateway};
pub use intake::{
    FieldInput, IntakeError, IntakeSession, LeadField, LeadSchema, SessionContext, SubmitOutcome,
    ValidationReport,
};
pub use pricing::{
    estimate_price, evaluate_price, PriceEstimate, PricingEngine, PricingQuery, PricingRule,
    PricingTable, Variant,
};
