use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::audit::{
    AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, NoopAuditSink,
};
use crate::domain::{
    lead::{LeadDraft, LeadId, PestType},
    partner::{PartnerId, PartnerPricing, PartnerProfile},
};
use crate::errors::DomainError;
use crate::flows::{
    FlowContext, FlowEngine, FlowTransitionError, FormStep, IntakeEvent, IntakeFlow,
};
use crate::gateway::{CsrfToken, GatewayError, LeadGateway};
use crate::intake::binding::FieldInput;
use crate::intake::context::SessionContext;
use crate::intake::schema::{FieldViolation, LeadSchema, ValidationReport};
use crate::pricing::{PriceEstimate, PriceTracker, PricingTable, RuleTablePricingEngine};

const AUDIT_ACTOR: &str = "intake-session";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IntakeError {
    #[error(transparent)]
    Transition(#[from] FlowTransitionError),
    #[error(transparent)]
    Field(#[from] DomainError),
    #[error("a submission is already in flight")]
    SubmissionInFlight,
    #[error("the draft was already submitted")]
    DraftClosed,
    #[error("submission is only possible from the contact step, current step is {step:?}")]
    NotOnContactStep { step: FormStep },
    #[error("submission attempt {attempt} is not the one in flight")]
    StaleSubmission { attempt: u32 },
    #[error("lead draft failed validation: {0}")]
    Validation(ValidationReport),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted(LeadId),
    /// The call was ignored because an earlier submission has not finished yet.
    AlreadyInFlight,
}

/// Snapshot of a draft handed to the gateway. Produced by
/// [`IntakeSession::begin_submission`] and consumed by
/// [`IntakeSession::finish_submission`]. Not `Clone`: each started attempt is
/// finished at most once.
#[derive(Debug)]
pub struct PendingSubmission {
    payload: LeadDraft,
    token: CsrfToken,
    attempt: u32,
}

impl PendingSubmission {
    pub fn payload(&self) -> &LeadDraft {
        &self.payload
    }

    pub fn token(&self) -> &CsrfToken {
        &self.token
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

#[derive(Clone, Debug)]
enum DraftSlot {
    Editing(LeadDraft),
    Submitted(LeadId),
}

#[derive(Clone, Debug, Default)]
struct SubmissionState {
    in_flight: bool,
    attempts: u32,
    last_error: Option<String>,
}

/// One run of the lead intake form for a single partner.
///
/// The session is the only writer of its draft. Every field change goes through
/// [`IntakeSession::set_field`] or [`IntakeSession::edit`], which keep the derived approx
/// price current.
pub struct IntakeSession {
    partner_id: PartnerId,
    partner: Option<PartnerProfile>,
    pricing: Arc<PricingTable>,
    tracker: PriceTracker<RuleTablePricingEngine>,
    schema: LeadSchema,
    flow: FlowEngine<IntakeFlow>,
    step: FormStep,
    slot: DraftSlot,
    submission: SubmissionState,
    context: SessionContext,
    audit: Arc<dyn AuditSink>,
    correlation_id: String,
    today: NaiveDate,
}

impl IntakeSession {
    pub fn new(
        partner_id: PartnerId,
        source: impl Into<String>,
        pricing: PartnerPricing,
        context: SessionContext,
    ) -> Self {
        let default_pest =
            PestType(pricing.available_pests.first().cloned().unwrap_or_default());
        let draft = LeadDraft::new(partner_id.clone(), source, default_pest);
        let flow = FlowEngine::default();
        let step = flow.initial_state();

        let mut session = Self {
            partner_id,
            partner: pricing.partner,
            pricing: Arc::new(PricingTable::new(pricing.rules)),
            tracker: PriceTracker::new(RuleTablePricingEngine),
            schema: LeadSchema::new(pricing.available_pests),
            flow,
            step,
            slot: DraftSlot::Editing(draft),
            submission: SubmissionState::default(),
            context,
            audit: Arc::new(NoopAuditSink),
            correlation_id: Uuid::new_v4().to_string(),
            today: Utc::now().date_naive(),
        };
        session.refresh_price();
        session
    }

    /// Creates a session and loads the partner's pricing. A failed pricing fetch is not
    /// fatal: the form stays usable and every price resolves to 0.
    pub async fn mount<G>(
        gateway: &G,
        partner_id: PartnerId,
        source: impl Into<String>,
        context: SessionContext,
    ) -> Self
    where
        G: LeadGateway + ?Sized,
    {
        let pricing = match gateway.fetch_pricing(&partner_id).await {
            Ok(pricing) => {
                debug!(
                    event_name = "intake.pricing.loaded",
                    partner_id = partner_id.0.as_str(),
                    rule_count = pricing.rules.len(),
                    "partner pricing loaded"
                );
                pricing
            }
            Err(error) => {
                warn!(
                    event_name = "intake.pricing.unavailable",
                    partner_id = partner_id.0.as_str(),
                    error = %error,
                    "partner pricing fetch failed; continuing without rules"
                );
                PartnerPricing::default()
            }
        };
        Self::new(partner_id, source, pricing, context)
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }

    /// Pins the date used to validate the preferred visit date.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Swaps in a new rule set, e.g. one that arrived after the form was shown.
    pub fn replace_pricing(&mut self, pricing: PartnerPricing) {
        self.partner = pricing.partner;
        self.pricing = Arc::new(PricingTable::new(pricing.rules));
        self.schema = LeadSchema::new(pricing.available_pests);
        self.refresh_price();
    }

    pub fn partner_id(&self) -> &PartnerId {
        &self.partner_id
    }

    pub fn partner(&self) -> Option<&PartnerProfile> {
        self.partner.as_ref()
    }

    pub fn available_pests(&self) -> &[String] {
        self.schema.available_pests()
    }

    pub fn pricing(&self) -> Arc<PricingTable> {
        Arc::clone(&self.pricing)
    }

    pub fn step(&self) -> FormStep {
        self.step
    }

    pub fn approx_price(&self) -> u64 {
        self.tracker.amount()
    }

    pub fn price_estimate(&self) -> &PriceEstimate {
        self.tracker.estimate()
    }

    /// `None` once the lead has been submitted.
    pub fn draft(&self) -> Option<&LeadDraft> {
        match &self.slot {
            DraftSlot::Editing(draft) => Some(draft),
            DraftSlot::Submitted(_) => None,
        }
    }

    pub fn submitted_lead_id(&self) -> Option<&LeadId> {
        match &self.slot {
            DraftSlot::Editing(_) => None,
            DraftSlot::Submitted(lead_id) => Some(lead_id),
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.submission.in_flight
    }

    pub fn last_error(&self) -> Option<&str> {
        self.submission.last_error.as_deref()
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn set_field(&mut self, input: FieldInput) -> Result<(), IntakeError> {
        self.edit(|draft| input.apply(draft))
    }

    pub fn edit(&mut self, f: impl FnOnce(&mut LeadDraft)) -> Result<(), IntakeError> {
        if self.submission.in_flight {
            return Err(IntakeError::SubmissionInFlight);
        }
        match &mut self.slot {
            DraftSlot::Editing(draft) => f(draft),
            DraftSlot::Submitted(_) => return Err(IntakeError::DraftClosed),
        }
        self.refresh_price();
        Ok(())
    }

    /// Whole-form format validation; the same report gates `next`.
    pub fn validation(&self) -> ValidationReport {
        match &self.slot {
            DraftSlot::Editing(draft) => self.schema.validate(draft, self.today),
            DraftSlot::Submitted(_) => ValidationReport::default(),
        }
    }

    /// Violations owned by the current step, for inline display.
    pub fn step_violations(&self) -> Vec<FieldViolation> {
        match &self.slot {
            DraftSlot::Editing(draft) => self.schema.validate_step(draft, self.step, self.today),
            DraftSlot::Submitted(_) => Vec::new(),
        }
    }

    /// Whether the "Next" control is enabled. Gated on the entire form rather than the
    /// current step, so an invalid later-step value also blocks earlier steps.
    pub fn can_advance(&self) -> bool {
        !self.step.is_terminal()
            && !self.submission.in_flight
            && self.step != FormStep::Contact
            && self.validation().is_valid()
    }

    pub fn next(&mut self) -> Result<FormStep, IntakeError> {
        let context = FlowContext { invalid_fields: self.validation().field_names() };
        self.navigate(IntakeEvent::Next, &context)
    }

    pub fn prev(&mut self) -> Result<FormStep, IntakeError> {
        self.navigate(IntakeEvent::Back, &FlowContext::default())
    }

    /// Starts a submission. Returns `Ok(None)` without side effects while another
    /// submission is in flight.
    pub fn begin_submission(
        &mut self,
        token: &CsrfToken,
    ) -> Result<Option<PendingSubmission>, IntakeError> {
        if self.submission.in_flight {
            debug!(
                event_name = "intake.submission.ignored",
                correlation_id = self.correlation_id.as_str(),
                "submission already in flight"
            );
            return Ok(None);
        }
        if self.step != FormStep::Contact {
            return Err(IntakeError::NotOnContactStep { step: self.step });
        }

        let report = match &self.slot {
            DraftSlot::Editing(draft) => self.schema.validate_for_submission(draft, self.today),
            DraftSlot::Submitted(_) => return Err(IntakeError::DraftClosed),
        };
        if !report.is_valid() {
            self.submission.last_error = Some(report.to_string());
            return Err(IntakeError::Validation(report));
        }

        self.refresh_price();
        let approx_price = self.tracker.amount();
        let DraftSlot::Editing(draft) = &mut self.slot else {
            return Err(IntakeError::DraftClosed);
        };
        draft.approx_price = approx_price;
        let payload = draft.clone();

        self.submission.in_flight = true;
        self.submission.attempts += 1;
        Ok(Some(PendingSubmission {
            payload,
            token: token.clone(),
            attempt: self.submission.attempts,
        }))
    }

    /// Applies the gateway's answer to a submission started by `begin_submission`.
    /// A pending submission that is not the current in-flight attempt is rejected
    /// and leaves the session untouched.
    pub fn finish_submission(
        &mut self,
        pending: PendingSubmission,
        result: Result<LeadId, GatewayError>,
    ) -> Result<LeadId, IntakeError> {
        if !self.submission.in_flight || pending.attempt != self.submission.attempts {
            warn!(
                event_name = "intake.submission.stale",
                correlation_id = self.correlation_id.as_str(),
                attempt = pending.attempt,
                current_attempt = self.submission.attempts,
                "ignoring result for a submission that is not in flight"
            );
            return Err(IntakeError::StaleSubmission { attempt: pending.attempt });
        }
        self.submission.in_flight = false;

        match result {
            Ok(lead_id) => {
                self.step = self.transition(IntakeEvent::SubmissionAccepted)?;
                self.slot = DraftSlot::Submitted(lead_id.clone());
                self.submission.last_error = None;
                self.context.record_submission(
                    self.partner.as_ref().map(|partner| partner.name.as_str()),
                    &lead_id,
                );
                self.audit.emit(
                    self.audit_event(
                        "intake.submission_accepted",
                        AuditOutcome::Success,
                        Some(&lead_id),
                    )
                    .with_metadata("approx_price", pending.payload.approx_price.to_string())
                    .with_metadata("attempt", pending.attempt.to_string()),
                );
                info!(
                    event_name = "intake.submission.accepted",
                    correlation_id = self.correlation_id.as_str(),
                    partner_id = self.partner_id.0.as_str(),
                    lead_id = lead_id.0.as_str(),
                    attempt = pending.attempt,
                    "lead created"
                );
                Ok(lead_id)
            }
            Err(error) => {
                self.step = self.transition(IntakeEvent::SubmissionRejected)?;
                self.submission.last_error = Some(error.user_message());
                self.audit.emit(
                    self.audit_event("intake.submission_failed", AuditOutcome::Failed, None)
                        .with_metadata("error", error.to_string())
                        .with_metadata("attempt", pending.attempt.to_string()),
                );
                warn!(
                    event_name = "intake.submission.failed",
                    correlation_id = self.correlation_id.as_str(),
                    partner_id = self.partner_id.0.as_str(),
                    attempt = pending.attempt,
                    error = %error,
                    "lead submission failed; draft kept for retry"
                );
                Err(IntakeError::Gateway(error))
            }
        }
    }

    /// Validates, posts the draft once and moves to the terminal step on success.
    pub async fn submit<G>(
        &mut self,
        gateway: &G,
        token: &CsrfToken,
    ) -> Result<SubmitOutcome, IntakeError>
    where
        G: LeadGateway + ?Sized,
    {
        let Some(pending) = self.begin_submission(token)? else {
            return Ok(SubmitOutcome::AlreadyInFlight);
        };
        let result = gateway.create_lead(pending.payload(), pending.token()).await;
        self.finish_submission(pending, result).map(SubmitOutcome::Submitted)
    }

    fn navigate(
        &mut self,
        event: IntakeEvent,
        context: &FlowContext,
    ) -> Result<FormStep, IntakeError> {
        if self.submission.in_flight {
            return Err(IntakeError::SubmissionInFlight);
        }
        let outcome = self.flow.apply_with_audit(
            self.step,
            &event,
            context,
            self.audit.as_ref(),
            &self.audit_context(None),
        )?;
        self.step = outcome.to;
        Ok(self.step)
    }

    fn transition(&self, event: IntakeEvent) -> Result<FormStep, IntakeError> {
        let outcome = self.flow.apply_with_audit(
            self.step,
            &event,
            &FlowContext::default(),
            self.audit.as_ref(),
            &self.audit_context(None),
        )?;
        Ok(outcome.to)
    }

    fn refresh_price(&mut self) {
        if let DraftSlot::Editing(draft) = &self.slot {
            if self.tracker.refresh(draft, &self.pricing) {
                let estimate = self.tracker.estimate();
                self.audit.emit(
                    self.audit_event("pricing.recomputed", AuditOutcome::Success, None)
                        .with_metadata("amount", estimate.amount.to_string())
                        .with_metadata(
                            "variant",
                            estimate.variant.as_ref().map(ToString::to_string).unwrap_or_default(),
                        )
                        .with_metadata(
                            "matched_rule",
                            estimate.matched_rule.map(|i| i.to_string()).unwrap_or_default(),
                        ),
                );
            }
        }
    }

    fn audit_context(&self, lead_id: Option<&LeadId>) -> AuditContext {
        AuditContext::new(
            Some(self.partner_id.clone()),
            lead_id.cloned(),
            self.correlation_id.clone(),
            AUDIT_ACTOR,
        )
    }

    fn audit_event(
        &self,
        event_type: &str,
        outcome: AuditOutcome,
        lead_id: Option<&LeadId>,
    ) -> AuditEvent {
        AuditEvent::from_context(
            &self.audit_context(lead_id),
            event_type,
            AuditCategory::for_event_type(event_type),
            outcome,
        )
    }
}
