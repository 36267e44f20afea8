//! # Authgate Core
//!
//! Core authorization logic for the authgate request-authorization gateway.
//!
//! This crate provides:
//! - Credential extraction from request headers and cookies
//! - Session-token minting and verification (signed, short-lived)
//! - Permission evaluation with the `"admin"` override

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod credentials;
pub mod permissions;
pub mod session;

pub use credentials::{CookieNames, Credential, CredentialKind, RequestCredentials};
pub use permissions::{ADMIN_PERMISSION, satisfies};
pub use session::{SessionClaims, SessionCodec};

use thiserror::Error;

/// Authorization errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Session token is malformed, expired, or carries a bad signature.
    #[error("Session token invalid: {0}")]
    SessionTokenInvalid(String),

    /// Token encoding failed.
    #[error("Token encoding failed: {0}")]
    TokenEncoding(String),

    /// Configuration error (bad secret, bad URL).
    #[error("Config error: {0}")]
    Config(String),
}
