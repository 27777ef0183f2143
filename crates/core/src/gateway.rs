use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{
    lead::{LeadDraft, LeadId},
    partner::{PartnerId, PartnerPricing},
};

/// Anti-forgery token sent as `x-csrf-token` with lead submissions.
#[derive(Clone, Debug)]
pub struct CsrfToken(SecretString);

impl CsrfToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::from(value.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

/// Body of a successful `POST /leads`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedLead {
    pub lead_id: LeadId,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("server rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("could not decode response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Text surfaced to the person filling the form. Server rejections are shown
    /// verbatim.
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { body, .. } => body.clone(),
            other => other.to_string(),
        }
    }
}

#[async_trait]
pub trait LeadGateway: Send + Sync {
    async fn fetch_pricing(&self, partner_id: &PartnerId) -> Result<PartnerPricing, GatewayError>;

    async fn create_lead(
        &self,
        draft: &LeadDraft,
        token: &CsrfToken,
    ) -> Result<LeadId, GatewayError>;
}

#[derive(Debug)]
struct InMemoryGatewayState {
    pricing: Result<PartnerPricing, GatewayError>,
    lead_responses: VecDeque<Result<LeadId, GatewayError>>,
    pricing_requests: Vec<PartnerId>,
    created: Vec<(LeadDraft, String)>,
}

/// Scripted gateway for hosts and tests that run without a backend.
#[derive(Clone, Debug)]
pub struct InMemoryLeadGateway {
    state: Arc<Mutex<InMemoryGatewayState>>,
}

impl Default for InMemoryLeadGateway {
    fn default() -> Self {
        Self::with_pricing(PartnerPricing::default())
    }
}

impl InMemoryLeadGateway {
    pub fn with_pricing(pricing: PartnerPricing) -> Self {
        Self::from_pricing_result(Ok(pricing))
    }

    pub fn failing_pricing(error: GatewayError) -> Self {
        Self::from_pricing_result(Err(error))
    }

    fn from_pricing_result(pricing: Result<PartnerPricing, GatewayError>) -> Self {
        Self {
            state: Arc::new(Mutex::new(InMemoryGatewayState {
                pricing,
                lead_responses: VecDeque::new(),
                pricing_requests: Vec::new(),
                created: Vec::new(),
            })),
        }
    }

    /// Queues the outcome of the next `create_lead` call. With an empty queue leads are
    /// accepted with sequential ids.
    pub fn push_lead_response(&self, response: Result<LeadId, GatewayError>) {
        self.with_state(|state| state.lead_responses.push_back(response));
    }

    pub fn pricing_requests(&self) -> Vec<PartnerId> {
        self.with_state(|state| state.pricing_requests.clone())
    }

    /// Drafts posted so far together with the token each was sent with.
    pub fn created_leads(&self) -> Vec<(LeadDraft, String)> {
        self.with_state(|state| state.created.clone())
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut InMemoryGatewayState) -> T) -> T {
        match self.state.lock() {
            Ok(mut state) => f(&mut state),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

#[async_trait]
impl LeadGateway for InMemoryLeadGateway {
    async fn fetch_pricing(&self, partner_id: &PartnerId) -> Result<PartnerPricing, GatewayError> {
        self.with_state(|state| {
            state.pricing_requests.push(partner_id.clone());
            state.pricing.clone()
        })
    }

    async fn create_lead(
        &self,
        draft: &LeadDraft,
        token: &CsrfToken,
    ) -> Result<LeadId, GatewayError> {
        self.with_state(|state| {
            state.created.push((draft.clone(), token.expose().to_owned()));
            let sequence = state.created.len();
            state
                .lead_responses
                .pop_front()
                .unwrap_or_else(|| Ok(LeadId(format!("lead-{sequence}"))))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{CreatedLead, CsrfToken, GatewayError, InMemoryLeadGateway, LeadGateway};
    use crate::domain::{
        lead::{LeadDraft, LeadId, PestType},
        partner::PartnerId,
    };

    #[test]
    fn rejection_message_is_the_body_verbatim() {
        let error = GatewayError::Rejected { status: 400, body: "Invalid phone".to_owned() };
        assert_eq!(error.user_message(), "Invalid phone");

        let transport = GatewayError::Transport("connection reset".to_owned());
        assert_eq!(transport.user_message(), "transport failure: connection reset");
    }

    #[test]
    fn csrf_token_is_redacted_in_debug_output() {
        let token = CsrfToken::new("super-secret-token");
        assert!(!format!("{token:?}").contains("super-secret-token"));
        assert_eq!(token.expose(), "super-secret-token");
    }

    #[test]
    fn created_lead_body_uses_camel_case() {
        let created: CreatedLead =
            serde_json::from_str(r#"{"leadId":"abc-123"}"#).expect("valid body");
        assert_eq!(created.lead_id, LeadId("abc-123".to_owned()));
    }

    #[tokio::test]
    async fn in_memory_gateway_replays_scripted_responses() {
        let gateway = InMemoryLeadGateway::default();
        gateway.push_lead_response(Err(GatewayError::Rejected {
            status: 400,
            body: "Invalid phone".to_owned(),
        }));
        let draft =
            LeadDraft::new(PartnerId("p-1".to_owned()), "landing", PestType("ants".to_owned()));
        let token = CsrfToken::new("t-1");

        let first = gateway.create_lead(&draft, &token).await;
        let second = gateway.create_lead(&draft, &token).await;

        assert!(matches!(first, Err(GatewayError::Rejected { status: 400, .. })));
        assert_eq!(second, Ok(LeadId("lead-2".to_owned())));
        assert_eq!(gateway.created_leads().len(), 2);
        assert_eq!(gateway.created_leads()[0].1, "t-1");

        gateway.fetch_pricing(&PartnerId("p-1".to_owned())).await.expect("pricing");
        assert_eq!(gateway.pricing_requests(), vec![PartnerId("p-1".to_owned())]);
    }
}
