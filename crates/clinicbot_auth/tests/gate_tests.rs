use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    middleware,
    routing::get,
    Router,
};
use clinicbot_auth::{
    handlers, permission_gate, session_gate, AuthError, AuthState, AuthUser, RemoteSessionVerifier,
    SessionVerifier,
};
use clinicbot_config::{AuthConfig, DatabaseConfig};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{header as header_is, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Accepts "staff-token" and "guest-token".
struct FakeVerifier;

#[async_trait]
impl SessionVerifier for FakeVerifier {
    async fn verify(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        let role = match access_token {
            "staff-token" => "staff",
            "guest-token" => "guest",
            _ => return Err(AuthError::InvalidSession),
        };
        Ok(serde_json::from_value(json!({
            "id": format!("user-{}", role),
            "app_metadata": {"role": role}
        }))
        .unwrap())
    }
}

fn app(enforce: bool) -> Router {
    let state = Arc::new(AuthState::new(
        Arc::new(FakeVerifier),
        AuthConfig {
            enforce_dashboard_permission: enforce,
            ..AuthConfig::default()
        },
    ));
    Router::new()
        .route("/dashboard/summary", get(|| async { "ok" }))
        .merge(handlers::routes())
        .layer(middleware::from_fn_with_state(state.clone(), permission_gate))
        .layer(middleware::from_fn_with_state(state, session_gate))
}

async fn call(app: Router, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let location = response
        .headers()
        .get(header::LOCATION)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, location, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn get_with(uri: &str, headers: &[(header::HeaderName, &str)]) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    for (name, value) in headers {
        builder = builder.header(name, *value);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_api_request_without_session_gets_401_json() {
    let (status, _, body) = call(app(false), get_with("/dashboard/summary", &[])).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], 401);
}

#[tokio::test]
async fn test_page_request_without_session_is_redirected() {
    let (status, location, _) = call(
        app(false),
        get_with("/dashboard/summary", &[(header::ACCEPT, "text/html,application/xhtml+xml")]),
    )
    .await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(
        location.as_deref(),
        Some("/login?redirect_to=%2Fdashboard%2Fsummary")
    );
}

#[tokio::test]
async fn test_invalid_token_is_rejected() {
    let (status, _, _) = call(
        app(false),
        get_with("/dashboard/summary", &[(header::AUTHORIZATION, "Bearer forged")]),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cookie_session_passes() {
    let (status, _, _) = call(
        app(false),
        get_with("/dashboard/summary", &[(header::COOKIE, "sb-access-token=staff-token")]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_permission_gate_is_inert_by_default() {
    let (status, _, _) = call(
        app(false),
        get_with("/dashboard/summary", &[(header::AUTHORIZATION, "Bearer guest-token")]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_enforced_permission_gate_checks_role() {
    let (status, _, body) = call(
        app(true),
        get_with("/dashboard/summary", &[(header::AUTHORIZATION, "Bearer guest-token")]),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], 403);

    let (status, _, _) = call(
        app(true),
        get_with("/dashboard/summary", &[(header::AUTHORIZATION, "Bearer staff-token")]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_me_returns_session_user() {
    let (status, _, body) = call(
        app(false),
        get_with("/auth/me", &[(header::AUTHORIZATION, "Bearer staff-token")]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "user-staff");
}

fn db_config(server: &MockServer) -> DatabaseConfig {
    DatabaseConfig {
        rest_url: format!("{}/rest/v1", server.uri()),
        auth_url: Some(format!("{}/auth/v1", server.uri())),
        api_key: "anon-key".to_string(),
        service_key: None,
        postgres_url: None,
        request_timeout_secs: 5,
    }
}

#[tokio::test]
async fn test_remote_verifier_reads_user() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header_is("apikey", "anon-key"))
        .and(header_is("authorization", "Bearer good"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "0b7e",
            "email": "dra.ana@clinica.com.br",
            "app_metadata": {"role": "admin"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header_is("authorization", "Bearer expired"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let verifier = RemoteSessionVerifier::new(&db_config(&server), reqwest::Client::new()).unwrap();
    let user = verifier.verify("good").await.unwrap();
    assert_eq!(user.role(), Some("admin"));
    assert!(matches!(
        verifier.verify("expired").await,
        Err(AuthError::InvalidSession)
    ));
}

#[tokio::test]
async fn test_remote_verifier_outage_is_not_a_logout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let verifier = RemoteSessionVerifier::new(&db_config(&server), reqwest::Client::new()).unwrap();
    assert!(matches!(
        verifier.verify("good").await,
        Err(AuthError::Upstream(_))
    ));
}
