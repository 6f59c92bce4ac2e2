//! Mock-server tests for the authenticated request pipeline.
//!
//! These use wiremock to simulate the case-management backend and verify
//! the session lifecycle end to end: token acquisition, bearer attachment,
//! auth-failure invalidation, and the transport-failure guarantee.

use casebook::api::{ApiClient, ApiError};
use casebook::app::{App, AppState};
use casebook::auth::{MemoryTokenStorage, SessionStore};
use casebook::config::Config;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

fn memory_store() -> SessionStore {
    SessionStore::new(Box::new(MemoryTokenStorage::default()))
}

fn test_config(server: &MockServer) -> Config {
    Config {
        api_origin: server.uri(),
        ..Config::default()
    }
}

fn client(server: &MockServer, store: &SessionStore) -> ApiClient {
    ApiClient::new(&test_config(server), store.clone()).unwrap()
}

/// Matches requests that carry no Authorization header at all.
struct NoAuthHeader;

impl Match for NoAuthHeader {
    fn matches(&self, request: &Request) -> bool {
        !request.headers.contains_key("authorization")
    }
}

// ============================================================================
// Login
// ============================================================================

#[tokio::test]
async fn login_returns_token_and_later_calls_attach_it() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .and(body_json(json!({"email": "a@b.org", "password": "x"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"access_token": "T1"})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/participants"))
        .and(header("Authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let store = memory_store();
    let api = client(&server, &store);

    let token = api.login("a@b.org", "x").await.unwrap();
    assert_eq!(token, "T1");

    // The gate owns the store write
    store.set(&token).unwrap();
    assert_eq!(store.get().as_deref(), Some("T1"));

    // The mock only answers with the exact bearer header
    let participants = api.fetch_participants().await.unwrap();
    assert!(participants.is_empty());
}

#[tokio::test]
async fn login_accepts_legacy_token_field_name() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "T2"})))
        .mount(&server)
        .await;

    let store = memory_store();
    let api = client(&server, &store);
    assert_eq!(api.login("a@b.org", "x").await.unwrap(), "T2");
}

#[tokio::test]
async fn login_success_without_token_field_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"msg": "welcome"})))
        .mount(&server)
        .await;

    let store = memory_store();
    let api = client(&server, &store);

    match api.login("a@b.org", "x").await {
        Err(ApiError::InvalidResponse(msg)) => assert!(msg.contains("no token")),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(store.get(), None);
}

#[tokio::test]
async fn failed_login_surfaces_message_and_keeps_existing_session() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "Invalid email or password"})),
        )
        .mount(&server)
        .await;

    let store = memory_store();
    store.set("T0").unwrap();
    let api = client(&server, &store);

    match api.login("a@b.org", "wrong").await {
        Err(ApiError::Application { status, message }) => {
            assert_eq!(status.as_u16(), 401);
            assert_eq!(message, "Invalid email or password");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    // A failed login never disturbs the session that is already there
    assert_eq!(store.get().as_deref(), Some("T0"));
}

#[tokio::test]
async fn requests_without_a_session_go_out_anonymous() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/participants"))
        .and(NoAuthHeader)
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let store = memory_store();
    let api = client(&server, &store);
    api.fetch_participants().await.unwrap();
}

// ============================================================================
// Session invalidation
// ============================================================================

#[tokio::test]
async fn unauthorized_response_clears_the_session() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/participants"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let store = memory_store();
    store.set("T1").unwrap();
    let api = client(&server, &store);

    match api.fetch_participants().await {
        Err(ApiError::AuthExpired) => {}
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(store.get(), None);
}

#[tokio::test]
async fn unprocessable_credential_quirk_clears_the_session() {
    // Flask-JWT answers 422 for malformed/expired tokens; the default
    // invalidating set covers it.
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/employers"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({"msg": "Not enough segments"})))
        .mount(&server)
        .await;

    let store = memory_store();
    store.set("T1").unwrap();
    let api = client(&server, &store);

    assert!(matches!(
        api.fetch_employers().await,
        Err(ApiError::AuthExpired)
    ));
    assert_eq!(store.get(), None);
}

#[tokio::test]
async fn invalidating_statuses_are_configurable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/employers"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({"msg": "bad payload"})))
        .mount(&server)
        .await;

    let store = memory_store();
    store.set("T1").unwrap();
    let config = Config {
        invalidating_statuses: vec![401],
        ..test_config(&server)
    };
    let api = ApiClient::new(&config, store.clone()).unwrap();

    // With the quirk disabled, 422 is an ordinary application error
    match api.fetch_employers().await {
        Err(ApiError::Application { status, .. }) => assert_eq!(status.as_u16(), 422),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(store.get().as_deref(), Some("T1"));
}

#[tokio::test]
async fn auth_failure_clears_regardless_of_method_and_path() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/participants/7/notes"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let store = memory_store();
    store.set("T1").unwrap();
    let api = client(&server, &store);

    let result = api
        .create_case_note(7, &casebook::models::NewCaseNote { content: "saw client".into() })
        .await;
    assert!(matches!(result, Err(ApiError::AuthExpired)));
    assert_eq!(store.get(), None);
}

// ============================================================================
// Failures that must NOT end the session
// ============================================================================

#[tokio::test]
async fn transport_failure_never_clears_the_session() {
    // Bind a port, then drop the listener so connections are refused
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let store = memory_store();
    store.set("T1").unwrap();
    let config = Config {
        api_origin: format!("http://{addr}"),
        ..Config::default()
    };
    let api = ApiClient::new(&config, store.clone()).unwrap();

    match api.fetch_participants().await {
        Err(e @ ApiError::Network(_)) => assert!(e.is_retryable()),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(store.get().as_deref(), Some("T1"));
}

#[tokio::test]
async fn server_errors_leave_the_session_untouched() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/participants"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let store = memory_store();
    store.set("T1").unwrap();
    let api = client(&server, &store);

    match api.fetch_participants().await {
        Err(ApiError::Application { status, .. }) => assert_eq!(status.as_u16(), 500),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(store.get().as_deref(), Some("T1"));
}

// ============================================================================
// Gate integration
// ============================================================================

#[tokio::test]
async fn auth_failure_routes_the_gate_back_to_login() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/participants"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let store = memory_store();
    store.set("T1").unwrap();
    let mut app = App::with_store(test_config(&server), store.clone()).unwrap();
    assert_eq!(app.state, AppState::Active);

    // An in-flight call hits the invalidating status and clears the store
    assert!(matches!(
        app.api.fetch_participants().await,
        Err(ApiError::AuthExpired)
    ));

    app.check_session();
    assert_eq!(app.state, AppState::Login);
    assert!(!app.is_authenticated());
}

#[tokio::test]
async fn cross_context_clear_propagates_to_a_second_gate() {
    let server = MockServer::start().await;

    let store = memory_store();
    store.set("T1").unwrap();

    // Two independent component trees over one shared storage scope
    let mut gate_a = App::with_store(test_config(&server), store.clone()).unwrap();
    let mut gate_b = App::with_store(test_config(&server), store.clone()).unwrap();
    assert_eq!(gate_a.state, AppState::Active);
    assert_eq!(gate_b.state, AppState::Active);

    gate_a.sign_out();
    gate_a.check_session();
    gate_b.check_session();

    assert_eq!(gate_a.state, AppState::Login);
    assert_eq!(gate_b.state, AppState::Login);
}

// ============================================================================
// Report endpoints
// ============================================================================

#[tokio::test]
async fn report_endpoints_ride_the_same_pipeline() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/reports/enrollments"))
        .and(header("Authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"date": "2026-07-30", "count": 12},
            {"date": "2026-07-31", "count": 9}
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/reports/referrals"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"org_name": "Acme Staffing", "kind": "employer", "status": "placed", "count": 3}
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/reports/services"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let store = memory_store();
    store.set("T1").unwrap();
    let api = client(&server, &store);

    let points = api.fetch_enrollment_report().await.unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(points[0].date, "2026-07-30");
    assert_eq!(points[1].count, 9);

    let outcomes = api.fetch_referral_report().await.unwrap();
    assert_eq!(outcomes[0].org_name.as_deref(), Some("Acme Staffing"));
    assert_eq!(outcomes[0].count, 3);

    // Auth failure on a report call invalidates like any other request
    assert!(matches!(
        api.fetch_service_report().await,
        Err(ApiError::AuthExpired)
    ));
    assert_eq!(store.get(), None);
}
