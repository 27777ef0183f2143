use std::time::Duration;

use async_trait::async_trait;
use pestquote_core::config::ApiConfig;
use pestquote_core::{
    CreatedLead, CsrfToken, GatewayError, LeadDraft, LeadGateway, LeadId, PartnerId,
    PartnerPricing,
};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

pub const CSRF_HEADER: &str = "x-csrf-token";

#[derive(Clone, Debug)]
pub struct HttpLeadGateway {
    client: Client,
    base_url: Url,
}

impl HttpLeadGateway {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, GatewayError> {
        let base_url = Url::parse(base_url.trim()).map_err(|error| {
            GatewayError::Transport(format!("invalid base url `{base_url}`: {error}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::Transport(format!(
                "base url `{base_url}` cannot carry a path"
            )));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|error| GatewayError::Transport(error.to_string()))?;

        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, GatewayError> {
        Self::new(&config.base_url, config.timeout_secs.map(Duration::from_secs))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                GatewayError::Transport(format!("base url `{}` has no path", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl LeadGateway for HttpLeadGateway {
    async fn fetch_pricing(&self, partner_id: &PartnerId) -> Result<PartnerPricing, GatewayError> {
        let url = self.endpoint(&["api", "partners", partner_id.0.as_str(), "pricing"])?;
        debug!(
            event_name = "gateway.pricing.request",
            partner_id = partner_id.0.as_str(),
            url = %url,
            "fetching partner pricing"
        );

        let response = self.client.get(url).send().await.map_err(transport_error)?;
        let pricing: PartnerPricing = decode_success(response).await?;

        debug!(
            event_name = "gateway.pricing.received",
            partner_id = partner_id.0.as_str(),
            rule_count = pricing.rules.len(),
            "partner pricing received"
        );
        Ok(pricing)
    }

    async fn create_lead(
        &self,
        draft: &LeadDraft,
        token: &CsrfToken,
    ) -> Result<LeadId, GatewayError> {
        let url = self.endpoint(&["leads"])?;
        let response = self
            .client
            .post(url)
            .header(CSRF_HEADER, token.expose())
            .json(draft)
            .send()
            .await
            .map_err(transport_error)?;

        let created: CreatedLead = decode_success(response).await?;
        info!(
            event_name = "gateway.lead.created",
            partner_id = draft.partner_id.0.as_str(),
            lead_id = created.lead_id.0.as_str(),
            "lead accepted by backend"
        );
        Ok(created.lead_id)
    }
}

async fn decode_success<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.map_err(transport_error)?;
        warn!(
            event_name = "gateway.request.rejected",
            status = status.as_u16(),
            body = body.as_str(),
            "backend rejected request"
        );
        return Err(GatewayError::Rejected { status: status.as_u16(), body });
    }

    response.json::<T>().await.map_err(|error| {
        if error.is_decode() {
            GatewayError::Decode(error.to_string())
        } else {
            transport_error(error)
        }
    })
}

fn transport_error(error: reqwest::Error) -> GatewayError {
    warn!(event_name = "gateway.request.failed", error = %error, "backend request failed");
    GatewayError::Transport(error.to_string())
}
