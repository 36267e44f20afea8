//! # Authgate Gateway
//!
//! HTTP request-authorization gateway. Sits in front of protected backend
//! resources and decides, per inbound request, whether it may proceed and
//! under which permission, using long-lived API tokens verified against an
//! authoritative backend and short-lived session tokens minted locally.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod issuer;
pub mod middleware;
pub mod orchestrator;
mod server;
pub mod verifier;

pub use config::{CookieNames, GatewayConfig, GatewayConfigBuilder};
pub use issuer::{SessionCookie, SessionIssuer};
pub use middleware::{FixedResolver, PermissionResolver, ProjectRouteResolver};
pub use orchestrator::{Decision, Orchestrator, RejectReason};
pub use server::{Gateway, GatewayState};
pub use verifier::{DenyReason, TokenVerifier, VerificationResult, VerifyToken};

use authgate_core::AuthError;

/// Start the gateway server.
///
/// # Errors
///
/// Returns error if server fails to start.
pub async fn start(config: GatewayConfig) -> Result<(), GatewayError> {
    let gateway = Gateway::new(config)?;
    gateway.run().await
}

/// Gateway errors.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Server error.
    #[error("Server error: {0}")]
    Server(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// Authorization subsystem error.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
