use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use pestquote_client::{HttpLeadGateway, CSRF_HEADER};
use pestquote_core::{
    CsrfToken, FieldInput, FormStep, GatewayError, IntakeError, IntakeSession, LeadGateway,
    PartnerId, SessionContext, SubmitOutcome,
};
use serde_json::{json, Value};

#[derive(Clone, Default)]
struct StubState {
    lead_status: Arc<Mutex<Option<(StatusCode, String)>>>,
    received: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

impl StubState {
    fn reject_leads_with(&self, status: StatusCode, body: &str) {
        *self.lead_status.lock().expect("stub lock") = Some((status, body.to_owned()));
    }

    fn accept_leads(&self) {
        *self.lead_status.lock().expect("stub lock") = None;
    }

    fn received(&self) -> Vec<(Option<String>, Value)> {
        self.received.lock().expect("stub lock").clone()
    }
}

async fn pricing(Path(partner_id): Path<String>) -> Response {
    if partner_id != "p-1" {
        return (StatusCode::NOT_FOUND, "unknown partner").into_response();
    }
    Json(json!({
        "partner": { "id": "p-1", "name": "Clean Home", "brandColor": "#0a7f5a" },
        "rules": [
            {
                "pestType": "cockroaches",
                "objectType": "apartment",
                "variant": "2",
                "basePrice": 2000
            },
            { "pestType": "cockroaches", "objectType": "house", "basePrice": 5500 }
        ],
        "availablePests": ["cockroaches", "bedbugs"]
    }))
    .into_response()
}

async fn create_lead(
    State(state): State<StubState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let token =
        headers.get(CSRF_HEADER).and_then(|value| value.to_str().ok()).map(str::to_owned);
    state.received.lock().expect("stub lock").push((token.clone(), body));

    if token.as_deref() != Some("csrf-1") {
        return (StatusCode::FORBIDDEN, "CSRF token missing").into_response();
    }
    let scripted = state.lead_status.lock().expect("stub lock").clone();
    match scripted {
        Some((status, body)) => (status, body).into_response(),
        None => Json(json!({ "leadId": "abc-123" })).into_response(),
    }
}

async fn spawn_stub(state: StubState) -> String {
    let router = Router::new()
        .route("/api/partners/{partner_id}/pricing", get(pricing))
        .route("/leads", post(create_lead))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
    let address = listener.local_addr().expect("stub address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("stub server");
    });
    format!("http://{address}")
}

async fn session_on_contact_step(gateway: &HttpLeadGateway) -> IntakeSession {
    let mut session = IntakeSession::mount(
        gateway,
        PartnerId("p-1".to_owned()),
        "landing",
        SessionContext::new(),
    )
    .await
    .with_today(NaiveDate::from_ymd_opt(2026, 10, 14).expect("valid date"));

    session.set_field(FieldInput::Rooms(Some(2))).expect("rooms");
    for _ in 0..5 {
        session.next().expect("navigable");
    }
    session.set_field(FieldInput::Phone("+7 900 123-45-67".to_owned())).expect("phone");
    session.set_field(FieldInput::Name("Anna".to_owned())).expect("name");
    assert_eq!(session.step(), FormStep::Contact);
    session
}

#[tokio::test]
async fn fetches_partner_pricing_over_http() {
    let base_url = spawn_stub(StubState::default()).await;
    let gateway = HttpLeadGateway::new(&base_url, None).expect("gateway");

    let pricing = gateway.fetch_pricing(&PartnerId("p-1".to_owned())).await.expect("pricing");
    assert_eq!(pricing.rules.len(), 2);
    assert_eq!(pricing.rules[1].variant, None);
    assert_eq!(pricing.available_pests, vec!["cockroaches", "bedbugs"]);
    assert_eq!(pricing.partner.map(|partner| partner.name), Some("Clean Home".to_owned()));
}

#[tokio::test]
async fn unknown_partner_is_a_rejection_with_the_body() {
    let base_url = spawn_stub(StubState::default()).await;
    let gateway = HttpLeadGateway::new(&base_url, None).expect("gateway");

    let error = gateway.fetch_pricing(&PartnerId("p-404".to_owned())).await.expect_err("404");
    assert_eq!(error, GatewayError::Rejected { status: 404, body: "unknown partner".to_owned() });
}

#[tokio::test]
async fn mounted_session_prices_from_fetched_rules() {
    let base_url = spawn_stub(StubState::default()).await;
    let gateway = HttpLeadGateway::new(&base_url, None).expect("gateway");

    let partner_id = PartnerId("p-1".to_owned());
    let mut session =
        IntakeSession::mount(&gateway, partner_id, "landing", SessionContext::new()).await;
    assert_eq!(session.approx_price(), 0);

    session.set_field(FieldInput::Rooms(Some(2))).expect("rooms");
    assert_eq!(session.approx_price(), 2000);

    session.set_field(FieldInput::ObjectType("house".to_owned())).expect("object");
    assert_eq!(session.approx_price(), 5500);
}

#[tokio::test]
async fn successful_submission_posts_draft_with_csrf_header() {
    let state = StubState::default();
    let base_url = spawn_stub(state.clone()).await;
    let gateway = HttpLeadGateway::new(&base_url, None).expect("gateway");
    let mut session = session_on_contact_step(&gateway).await;

    let outcome = session.submit(&gateway, &CsrfToken::new("csrf-1")).await.expect("submitted");

    assert_eq!(outcome, SubmitOutcome::Submitted(pestquote_core::LeadId("abc-123".to_owned())));
    assert_eq!(session.step(), FormStep::Submitted);
    assert_eq!(session.context().submitted_lead_id().map(|id| id.0), Some("abc-123".to_owned()));
    assert_eq!(session.context().partner_name(), Some("Clean Home".to_owned()));

    let received = state.received();
    assert_eq!(received.len(), 1);
    let (token, body) = &received[0];
    assert_eq!(token.as_deref(), Some("csrf-1"));
    assert_eq!(body["partnerId"], "p-1");
    assert_eq!(body["approxPrice"], 2000);
    assert_eq!(body["phone"], "+7 900 123-45-67");
    assert_eq!(body["source"], "landing");
}

#[tokio::test]
async fn rejected_submission_surfaces_server_text_and_allows_retry() {
    let state = StubState::default();
    state.reject_leads_with(StatusCode::BAD_REQUEST, "Invalid phone");
    let base_url = spawn_stub(state.clone()).await;
    let gateway = HttpLeadGateway::new(&base_url, None).expect("gateway");
    let mut session = session_on_contact_step(&gateway).await;
    let token = CsrfToken::new("csrf-1");

    let error = session.submit(&gateway, &token).await.expect_err("rejected");
    assert!(matches!(error, IntakeError::Gateway(GatewayError::Rejected { status: 400, .. })));
    assert_eq!(session.step(), FormStep::Contact);
    assert_eq!(session.last_error(), Some("Invalid phone"));
    assert!(!session.is_submitting());

    state.accept_leads();
    let outcome = session.submit(&gateway, &token).await.expect("retry");
    assert!(matches!(outcome, SubmitOutcome::Submitted(_)));
    assert_eq!(session.step(), FormStep::Submitted);
    assert_eq!(session.last_error(), None);
    assert_eq!(state.received().len(), 2);
}

#[tokio::test]
async fn missing_csrf_token_is_rejected_by_backend() {
    let state = StubState::default();
    let base_url = spawn_stub(state.clone()).await;
    let gateway = HttpLeadGateway::new(&base_url, None).expect("gateway");
    let mut session = session_on_contact_step(&gateway).await;

    let error = session.submit(&gateway, &CsrfToken::new("wrong")).await.expect_err("forbidden");
    assert!(matches!(error, IntakeError::Gateway(GatewayError::Rejected { status: 403, .. })));
    assert_eq!(session.last_error(), Some("CSRF token missing"));
    assert_eq!(state.received()[0].0.as_deref(), Some("wrong"));
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let address = listener.local_addr().expect("address");
    drop(listener);
    let gateway = HttpLeadGateway::new(&format!("http://{address}"), None).expect("gateway");

    let error = gateway.fetch_pricing(&PartnerId("p-1".to_owned())).await.expect_err("offline");
    assert!(matches!(error, GatewayError::Transport(_)));
}
