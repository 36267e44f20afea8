//! The per-request authorization state machine.
//!
//! Composes credential extraction, session-token verification, permission
//! evaluation, backend verification, and session issuance into a single
//! pass/fail decision. The decision is a returned value, not a side effect;
//! the surrounding HTTP layer turns it into a dispatch or a 403.

use std::sync::Arc;

use axum::http::StatusCode;

use authgate_core::{RequestCredentials, SessionCodec, satisfies};

use crate::issuer::{SessionCookie, SessionIssuer};
use crate::verifier::{VerificationResult, VerifyToken};

/// Terminal outcome for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Dispatch the request to the protected backend.
    Forward {
        /// A fresh session cookie to attach, when the API-token path ran.
        /// `None` when an existing session token already satisfied the
        /// requirement.
        cookie: Option<SessionCookie>,
    },
    /// Refuse the request. Final; the gateway never retries.
    Reject(RejectReason),
}

/// Why a request was rejected.
///
/// Every reason surfaces as a 403 with a fixed, non-sensitive reason
/// string; no internal detail crosses the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Neither an API token nor a session token was presented.
    NoCredentials,
    /// The session token was unusable and no API token was available to
    /// fall back to.
    SessionRejected,
    /// The backend denied the API token (or could not be reached).
    ApiTokenRejected,
}

impl RejectReason {
    /// The plain-text response body for this rejection.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NoCredentials => "No auth cookie set",
            Self::SessionRejected => "JWT token not valid",
            Self::ApiTokenRejected => "API Token not valid",
        }
    }

    /// The response status for this rejection. Always 403: exhausting all
    /// fallback paths is a deny, never a server error.
    #[must_use]
    pub const fn status(self) -> StatusCode {
        StatusCode::FORBIDDEN
    }
}

/// The authorization orchestrator.
///
/// Holds the immutable, startup-configured collaborators; requests are
/// processed independently with no shared mutable state.
pub struct Orchestrator {
    codec: Arc<SessionCodec>,
    issuer: SessionIssuer,
    verifier: Arc<dyn VerifyToken>,
}

impl Orchestrator {
    /// Create an orchestrator over the given collaborators.
    #[must_use]
    pub fn new(
        codec: Arc<SessionCodec>,
        issuer: SessionIssuer,
        verifier: Arc<dyn VerifyToken>,
    ) -> Self {
        Self {
            codec,
            issuer,
            verifier,
        }
    }

    /// Decide whether a request holding `creds` may proceed under
    /// `required`.
    ///
    /// The backend verification call is the only await point; at most one
    /// such call is made per request. An invalid or expired session token
    /// is not a terminal failure while an API token remains to fall back
    /// to.
    pub async fn authorize(&self, creds: &RequestCredentials, required: &str) -> Decision {
        if creds.is_empty() {
            return Decision::Reject(RejectReason::NoCredentials);
        }

        if let Some(session) = &creds.session_token {
            match self.codec.verify(&session.value) {
                Ok(claims) if satisfies(&claims.permissions, required) => {
                    tracing::debug!(permission = required, "Session token satisfied requirement");
                    return Decision::Forward { cookie: None };
                }
                Ok(_) => {
                    tracing::debug!(
                        permission = required,
                        "Session token valid but lacks required permission"
                    );
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Session token rejected, trying API token");
                }
            }
        }

        let Some(api_token) = &creds.api_token else {
            return Decision::Reject(RejectReason::SessionRejected);
        };

        match self.verifier.verify(&api_token.value, required).await {
            VerificationResult::Authorized { permission } => {
                let cookie = match self.issuer.issue(&permission) {
                    Ok(cookie) => Some(cookie),
                    Err(e) => {
                        // Authorization itself succeeded; don't turn an
                        // issuer failure into a spurious deny.
                        tracing::warn!(error = %e, "Session minting failed, forwarding without cookie");
                        None
                    }
                };
                Decision::Forward { cookie }
            }
            VerificationResult::Denied { reason } => {
                tracing::debug!(%reason, "API token rejected");
                Decision::Reject(RejectReason::ApiTokenRejected)
            }
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}
