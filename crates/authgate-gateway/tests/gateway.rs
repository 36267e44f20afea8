//! End-to-end gateway tests against in-process verifier and upstream
//! servers, covering the full credential matrix.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    extract::{Query, State},
    http::{HeaderMap, Request, StatusCode, header},
    routing::post,
};
use jsonwebtoken::{EncodingKey, Header};
use pretty_assertions::assert_eq;
use tower::ServiceExt;

use authgate_core::{SessionClaims, SessionCodec};
use authgate_gateway::{Gateway, GatewayConfig};

/// Hex encoding of a fixed 32-byte secret (0xaa repeated).
const SECRET_HEX: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const VALID_API_TOKEN: &str = "validtoken123";

fn secret_bytes() -> [u8; 32] {
    [0xaa; 32]
}

fn codec() -> SessionCodec {
    SessionCodec::from_hex_secret(SECRET_HEX, Duration::from_secs(900)).unwrap()
}

#[derive(Clone, Default)]
struct VerifierState {
    last_permission: Arc<Mutex<Option<String>>>,
}

async fn verify_handler(
    State(state): State<VerifierState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> StatusCode {
    *state.last_permission.lock().unwrap() = params.get("permission").cloned();

    let expected = format!("Bearer {VALID_API_TOKEN}");
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(expected.as_str());
    if authorized {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::UNAUTHORIZED
    }
}

async fn spawn(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn spawn_verifier(state: VerifierState) -> SocketAddr {
    spawn(
        Router::new()
            .route("/auth/tokens/verify", post(verify_handler))
            .with_state(state),
    )
    .await
}

async fn spawn_upstream() -> SocketAddr {
    spawn(Router::new().fallback(|| async { "upstream ok" })).await
}

/// An address nothing is listening on.
async fn closed_port() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

fn gateway_router(verifier: SocketAddr, upstream: SocketAddr) -> Router {
    let config = GatewayConfig::builder()
        .jwt_secret(SECRET_HEX)
        .verifier_url(format!("http://{verifier}"))
        .upstream_url(format!("http://{upstream}"))
        .verify_timeout_secs(2)
        .build();
    Gateway::new(config).unwrap().router()
}

async fn standard_gateway() -> (Router, VerifierState) {
    let state = VerifierState::default();
    let verifier = spawn_verifier(state.clone()).await;
    let upstream = spawn_upstream().await;
    (gateway_router(verifier, upstream), state)
}

async fn body_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn expired_session_token(permission: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = SessionClaims {
        permissions: vec![permission.to_string()],
        iat: now - 7200,
        exp: now - 3600,
    };
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(&secret_bytes()),
    )
    .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_no_credentials_rejected() {
    let (app, _) = standard_gateway().await;

    let response = app.oneshot(get("/projects/p1/data")).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_string(response.into_body()).await, "No auth cookie set");
}

#[tokio::test]
async fn test_health_is_public() {
    let (app, _) = standard_gateway().await;

    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response.into_body()).await, "OK");
}

#[tokio::test]
async fn test_valid_session_forwards_without_new_cookie() {
    let (app, _) = standard_gateway().await;
    let token = codec().mint("projects/p1#read").unwrap();

    let request = Request::builder()
        .uri("/projects/p1/data")
        .header(header::COOKIE, format!("ag_session_token={token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    assert_eq!(body_string(response.into_body()).await, "upstream ok");
}

#[tokio::test]
async fn test_admin_session_forwards_for_any_route() {
    let (app, _) = standard_gateway().await;
    let token = codec().mint("admin").unwrap();

    let request = Request::builder()
        .uri("/projects/other/services/s9")
        .header(header::COOKIE, format!("ag_session_token={token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_expired_session_falls_back_and_mints_fresh_cookie() {
    let (app, verifier) = standard_gateway().await;
    let expired = expired_session_token("projects/p1#read");

    let request = Request::builder()
        .uri("/projects/p1/data")
        .header(
            header::COOKIE,
            format!("ag_session_token={expired}; ag_token={VALID_API_TOKEN}"),
        )
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("fresh session cookie expected")
        .to_string();
    assert!(set_cookie.starts_with("ag_session_token="));
    assert!(set_cookie.ends_with("; HttpOnly; Path=/; Max-Age=900"));

    // The minted token is scoped to exactly the permission that was checked.
    let token = set_cookie
        .trim_start_matches("ag_session_token=")
        .split(';')
        .next()
        .unwrap();
    let claims = codec().verify(token).unwrap();
    assert_eq!(claims.permissions, vec!["projects/p1#read".to_string()]);

    // The backend saw the decoded permission string.
    assert_eq!(
        verifier.last_permission.lock().unwrap().clone(),
        Some("projects/p1#read".to_string())
    );
}

#[tokio::test]
async fn test_session_signed_with_wrong_secret_falls_back() {
    let (app, _) = standard_gateway().await;
    let foreign = SessionCodec::new(&SessionCodec::generate_secret(), Duration::from_secs(900));
    let token = foreign.mint("projects/p1#read").unwrap();

    let request = Request::builder()
        .uri("/projects/p1/data")
        .header(
            header::COOKIE,
            format!("ag_session_token={token}; ag_token={VALID_API_TOKEN}"),
        )
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_some());
}

#[tokio::test]
async fn test_bearer_header_authorizes() {
    let (app, _) = standard_gateway().await;

    let request = Request::builder()
        .uri("/projects/p1/data")
        .header(header::AUTHORIZATION, format!("Bearer {VALID_API_TOKEN}"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_some());
}

#[tokio::test]
async fn test_backend_deny_rejects_without_cookie() {
    let (app, _) = standard_gateway().await;

    let request = Request::builder()
        .uri("/projects/p1/data")
        .header(header::COOKIE, "ag_token=wrongtoken")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    assert_eq!(body_string(response.into_body()).await, "API Token not valid");
}

#[tokio::test]
async fn test_unreachable_backend_is_a_deny() {
    let upstream = spawn_upstream().await;
    let app = gateway_router(closed_port().await, upstream);

    let request = Request::builder()
        .uri("/projects/p1/data")
        .header(header::COOKIE, format!("ag_token={VALID_API_TOKEN}"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_string(response.into_body()).await, "API Token not valid");
}

#[tokio::test]
async fn test_insufficient_session_without_api_token_rejected() {
    let (app, _) = standard_gateway().await;
    let token = codec().mint("projects/p2#read").unwrap();

    let request = Request::builder()
        .uri("/projects/p1/data")
        .header(header::COOKIE, format!("ag_session_token={token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_string(response.into_body()).await, "JWT token not valid");
}

#[tokio::test]
async fn test_write_method_requires_write_permission() {
    let (app, verifier) = standard_gateway().await;

    let request = Request::builder()
        .method("POST")
        .uri("/projects/p1/files")
        .header(header::COOKIE, format!("ag_token={VALID_API_TOKEN}"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        verifier.last_permission.lock().unwrap().clone(),
        Some("projects/p1#write".to_string())
    );
}

#[tokio::test]
async fn test_oversized_body_is_413_not_502() {
    let (app, _) = standard_gateway().await;
    let token = codec().mint("projects/p1#write").unwrap();

    // One byte past the proxy's 16 MiB buffer limit.
    let request = Request::builder()
        .method("POST")
        .uri("/projects/p1/files")
        .header(header::COOKIE, format!("ag_session_token={token}"))
        .body(Body::from(vec![0u8; 16 * 1024 * 1024 + 1]))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(
        body_string(response.into_body()).await,
        "Request body too large"
    );
}

#[tokio::test]
async fn test_upstream_failure_is_502_not_403() {
    let state = VerifierState::default();
    let verifier = spawn_verifier(state).await;
    let app = gateway_router(verifier, closed_port().await);
    let token = codec().mint("projects/p1#read").unwrap();

    let request = Request::builder()
        .uri("/projects/p1/data")
        .header(header::COOKIE, format!("ag_session_token={token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}
