//! Backend verification of API tokens.
//!
//! One outbound call per unverified request, on the hot path; the session
//! token minted after a success exists to avoid paying this cost again.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use authgate_core::AuthError;

/// Outcome of an authoritative backend verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationResult {
    /// The backend granted the required permission.
    Authorized {
        /// The permission that was verified.
        permission: String,
    },
    /// The backend denied the request, or could not be reached.
    Denied {
        /// Why verification failed.
        reason: DenyReason,
    },
}

/// Why a backend verification did not succeed.
///
/// A network failure and an explicit deny are deliberately not
/// distinguished at the caller: a permission gate must not fail open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    /// The backend answered with a non-204 status.
    Status(u16),
    /// The call failed before an answer arrived (connect error, timeout).
    Network(String),
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status(code) => write!(f, "backend returned status {code}"),
            Self::Network(e) => write!(f, "backend unreachable: {e}"),
        }
    }
}

/// Verifies an API token against a required permission.
#[async_trait]
pub trait VerifyToken: Send + Sync {
    /// Check whether `api_token` is granted `permission`.
    ///
    /// Never retries and never fails open: any ambiguous outcome is a deny.
    async fn verify(&self, api_token: &str, permission: &str) -> VerificationResult;
}

/// HTTP client for the token issuer/verifier backend.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    client: reqwest::Client,
    base_url: String,
}

impl TokenVerifier {
    /// Create a verifier client for the given backend base URL.
    ///
    /// The timeout bounds the whole verification call; an unresponsive
    /// backend must not hang the edge.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be constructed.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Config(format!("HTTP client init failed: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl VerifyToken for TokenVerifier {
    async fn verify(&self, api_token: &str, permission: &str) -> VerificationResult {
        let url = format!("{}/auth/tokens/verify", self.base_url);

        let response = self
            .client
            .post(url)
            .query(&[("permission", permission)])
            .bearer_auth(api_token)
            .send()
            .await;

        match response {
            Ok(res) if res.status() == StatusCode::NO_CONTENT => VerificationResult::Authorized {
                permission: permission.to_string(),
            },
            Ok(res) => {
                tracing::debug!(status = %res.status(), permission, "Backend verification denied");
                VerificationResult::Denied {
                    reason: DenyReason::Status(res.status().as_u16()),
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, permission, "Backend verification call failed");
                VerificationResult::Denied {
                    reason: DenyReason::Network(e.to_string()),
                }
            }
        }
    }
}
