//! Session-token minting and verification.
//!
//! Session tokens are signed, self-contained, stateless credentials with a
//! short fixed lifetime. Each one is scoped to exactly the permission whose
//! backend verification produced it, so a token never grants more than the
//! one check it was minted for.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::AuthError;

/// Default session-token lifetime: 15 minutes.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(900);

/// Decoded session-token payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Permissions granted at mint time. The gateway always mints exactly
    /// one, but the wire format is an array.
    pub permissions: Vec<String>,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
}

/// Codec for creating and verifying session tokens (HS256).
pub struct SessionCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl SessionCodec {
    /// Create a new codec with a secret key.
    ///
    /// The secret should be at least 32 bytes.
    #[must_use]
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    /// Create a codec from a hex-encoded secret.
    ///
    /// # Errors
    ///
    /// Returns error if hex decoding fails.
    pub fn from_hex_secret(hex_secret: &str, ttl: Duration) -> Result<Self, AuthError> {
        let secret = hex::decode(hex_secret)
            .map_err(|e| AuthError::Config(format!("Invalid hex secret: {e}")))?;
        Ok(Self::new(&secret, ttl))
    }

    /// Generate a random 256-bit secret key.
    #[must_use]
    pub fn generate_secret() -> [u8; 32] {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        bytes
    }

    /// Generate a random secret as hex string.
    #[must_use]
    pub fn generate_hex_secret() -> String {
        hex::encode(Self::generate_secret())
    }

    /// The configured token lifetime.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Mint a session token scoped to a single permission.
    ///
    /// Minting never invalidates previously minted tokens; each token
    /// carries its own expiry.
    ///
    /// # Errors
    ///
    /// Returns error if token encoding fails.
    pub fn mint(&self, permission: &str) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now + chrono::Duration::from_std(self.ttl).unwrap_or_default();

        let claims = SessionClaims {
            permissions: vec![permission.to_string()],
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenEncoding(e.to_string()))
    }

    /// Verify a session token and return its claims.
    ///
    /// Fails closed: a malformed token, a bad signature, and an expired
    /// token are all rejected the same way, and no partial claim set is
    /// ever produced.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::SessionTokenInvalid`] if verification fails.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, AuthError> {
        let validation = Validation::default();

        let token_data: TokenData<SessionClaims> = decode(token, &self.decoding_key, &validation)
            .map_err(|e| AuthError::SessionTokenInvalid(e.to_string()))?;

        Ok(token_data.claims)
    }
}

impl std::fmt::Debug for SessionCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCodec")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
