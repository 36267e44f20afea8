//! Gateway server: router assembly and upstream dispatch.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{Request, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use secrecy::ExposeSecret;
use tower_http::trace::TraceLayer;

use authgate_core::{CookieNames, SessionCodec};

use crate::GatewayError;
use crate::config::GatewayConfig;
use crate::issuer::SessionIssuer;
use crate::middleware::{PermissionResolver, ProjectRouteResolver, authorize_request};
use crate::orchestrator::Orchestrator;
use crate::verifier::TokenVerifier;

/// Largest request body the proxy will buffer before dispatching upstream.
const MAX_PROXY_BODY: usize = 16 * 1024 * 1024;

/// Shared gateway state, immutable after startup.
pub struct GatewayState {
    /// The per-request authorization state machine.
    pub orchestrator: Orchestrator,
    /// Credential cookie names.
    pub cookies: CookieNames,
    /// Route-to-permission resolver.
    pub resolver: Box<dyn PermissionResolver>,
    /// HTTP client used for upstream dispatch.
    pub http: reqwest::Client,
    /// Base URL of the protected upstream.
    pub upstream_url: String,
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("cookies", &self.cookies)
            .field("upstream_url", &self.upstream_url)
            .finish_non_exhaustive()
    }
}

/// The gateway server.
#[derive(Debug)]
pub struct Gateway {
    config: GatewayConfig,
    state: Arc<GatewayState>,
}

impl Gateway {
    /// Create a gateway with the default project-route permission resolver.
    ///
    /// # Errors
    ///
    /// Returns error if the signing secret is missing or any collaborator
    /// fails to initialize. A missing secret is fatal here, at startup,
    /// never per request.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        Self::with_resolver(config, Box::new(ProjectRouteResolver))
    }

    /// Create a gateway with a custom permission resolver.
    ///
    /// # Errors
    ///
    /// Returns error if the signing secret is missing or any collaborator
    /// fails to initialize.
    pub fn with_resolver(
        config: GatewayConfig,
        resolver: Box<dyn PermissionResolver>,
    ) -> Result<Self, GatewayError> {
        let secret = config.jwt_secret.as_ref().ok_or_else(|| {
            GatewayError::Config(
                "Signing secret is required (set AUTHGATE_JWT_SECRET)".to_string(),
            )
        })?;

        let codec = Arc::new(SessionCodec::from_hex_secret(
            secret.expose_secret(),
            config.session_ttl(),
        )?);
        let issuer = SessionIssuer::new(codec.clone(), &config.cookies.session);
        let verifier = Arc::new(TokenVerifier::new(
            &config.verifier_url,
            config.verify_timeout(),
        )?);
        let orchestrator = Orchestrator::new(codec, issuer, verifier);

        let state = Arc::new(GatewayState {
            orchestrator,
            cookies: config.cookies.clone(),
            resolver,
            http: reqwest::Client::new(),
            upstream_url: config.upstream_url.trim_end_matches('/').to_string(),
        });

        Ok(Self { config, state })
    }

    /// Build the gateway router.
    ///
    /// Every route except the health endpoint goes through the
    /// authorization middleware; authorized requests fall through to the
    /// upstream proxy.
    #[must_use]
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .fallback(proxy_handler)
            .layer(axum::middleware::from_fn_with_state(
                self.state.clone(),
                authorize_request,
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Run the gateway server.
    ///
    /// # Errors
    ///
    /// Returns error if binding or serving fails.
    pub async fn run(&self) -> Result<(), GatewayError> {
        let app = self.router();

        let addr: SocketAddr = format!("{}:{}", self.config.bind_address, self.config.port)
            .parse()
            .map_err(|e| GatewayError::Config(format!("Invalid address: {e}")))?;

        tracing::info!("Gateway listening on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;
        Ok(())
    }
}

async fn health_handler() -> &'static str {
    "OK"
}

/// Dispatch an authorized request to the protected upstream.
async fn proxy_handler(State(state): State<Arc<GatewayState>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();

    // A body that cannot be buffered is the caller's fault, not the
    // upstream's.
    let body = match axum::body::to_bytes(body, MAX_PROXY_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(error = %e, "Request body rejected");
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    match forward_upstream(&state, parts, body).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(error = %e, "Upstream dispatch failed");
            (StatusCode::BAD_GATEWAY, "Upstream unavailable").into_response()
        }
    }
}

async fn forward_upstream(
    state: &GatewayState,
    parts: axum::http::request::Parts,
    body: axum::body::Bytes,
) -> Result<Response, GatewayError> {
    let path_and_query = parts
        .uri
        .path_and_query()
        .map_or("/", axum::http::uri::PathAndQuery::as_str);
    let url = format!("{}{}", state.upstream_url, path_and_query);

    let mut builder = state.http.request(parts.method, url);
    for (name, value) in &parts.headers {
        // Host names the gateway, not the upstream.
        if *name != header::HOST {
            builder = builder.header(name, value);
        }
    }

    let upstream = builder
        .body(body)
        .send()
        .await
        .map_err(|e| GatewayError::Server(e.to_string()))?;

    let status = upstream.status();
    let headers = upstream.headers().clone();

    let mut response = axum::http::Response::builder().status(status);
    for (name, value) in &headers {
        if *name != header::TRANSFER_ENCODING && *name != header::CONNECTION {
            response = response.header(name, value);
        }
    }

    response
        .body(Body::from_stream(upstream.bytes_stream()))
        .map_err(|e| GatewayError::Server(format!("Response assembly failed: {e}")))
}
