//! Gateway configuration.

use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

pub use authgate_core::CookieNames;

/// Default session-token lifetime in seconds (15 minutes).
const DEFAULT_SESSION_TTL_SECS: u64 = 900;
/// Default backend-verification timeout in seconds.
const DEFAULT_VERIFY_TIMEOUT_SECS: u64 = 5;

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_upstream_url() -> String {
    "http://127.0.0.1:8090".to_string()
}

fn default_verifier_url() -> String {
    "http://127.0.0.1:8090".to_string()
}

fn default_session_ttl() -> u64 {
    DEFAULT_SESSION_TTL_SECS
}

fn default_verify_timeout() -> u64 {
    DEFAULT_VERIFY_TIMEOUT_SECS
}

/// Gateway configuration.
///
/// The signing secret and the two service URLs are the only deployment
/// inputs without usable defaults; a missing secret is fatal at startup,
/// never discovered per request.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Bind address.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Base URL of the protected upstream that authorized requests are
    /// dispatched to.
    #[serde(default = "default_upstream_url")]
    pub upstream_url: String,

    /// Base URL of the token issuer/verifier backend.
    #[serde(default = "default_verifier_url")]
    pub verifier_url: String,

    /// Session-token signing secret (hex-encoded). Required at startup.
    #[serde(default)]
    pub jwt_secret: Option<SecretString>,

    /// Cookie names carrying the API and session tokens.
    #[serde(default)]
    pub cookies: CookieNames,

    /// Session-token lifetime in seconds.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,

    /// Timeout for the backend verification call, in seconds.
    #[serde(default = "default_verify_timeout")]
    pub verify_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            upstream_url: default_upstream_url(),
            verifier_url: default_verifier_url(),
            jwt_secret: None,
            cookies: CookieNames::default(),
            session_ttl_secs: default_session_ttl(),
            verify_timeout_secs: default_verify_timeout(),
        }
    }
}

impl GatewayConfig {
    /// Create a new config builder.
    #[must_use]
    pub fn builder() -> GatewayConfigBuilder {
        GatewayConfigBuilder::default()
    }

    /// Session-token lifetime as a `Duration`.
    #[must_use]
    pub const fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// Backend verification timeout as a `Duration`.
    #[must_use]
    pub const fn verify_timeout(&self) -> Duration {
        Duration::from_secs(self.verify_timeout_secs)
    }

    /// Load config overrides from environment variables.
    ///
    /// Environment values win over file and flag values.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_env_lookup(|key| std::env::var(key).ok())
    }

    fn with_env_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(secret) = lookup("AUTHGATE_JWT_SECRET") {
            self.jwt_secret = Some(SecretString::from(secret));
        }
        if let Some(url) = lookup("AUTHGATE_VERIFIER_URL") {
            self.verifier_url = url;
        }
        if let Some(url) = lookup("AUTHGATE_UPSTREAM_URL") {
            self.upstream_url = url;
        }
        self
    }
}

/// Builder for [`GatewayConfig`].
#[derive(Debug, Default)]
pub struct GatewayConfigBuilder {
    config: GatewayConfig,
}

impl GatewayConfigBuilder {
    /// Set the bind address.
    #[must_use]
    pub fn bind_address(mut self, address: impl Into<String>) -> Self {
        self.config.bind_address = address.into();
        self
    }

    /// Set the listen port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the protected upstream base URL.
    #[must_use]
    pub fn upstream_url(mut self, url: impl Into<String>) -> Self {
        self.config.upstream_url = url.into();
        self
    }

    /// Set the token verifier base URL.
    #[must_use]
    pub fn verifier_url(mut self, url: impl Into<String>) -> Self {
        self.config.verifier_url = url.into();
        self
    }

    /// Set the hex-encoded signing secret.
    #[must_use]
    pub fn jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.jwt_secret = Some(SecretString::from(secret.into()));
        self
    }

    /// Set the credential cookie names.
    #[must_use]
    pub fn cookies(mut self, cookies: CookieNames) -> Self {
        self.config.cookies = cookies;
        self
    }

    /// Set the session-token lifetime in seconds.
    #[must_use]
    pub const fn session_ttl_secs(mut self, secs: u64) -> Self {
        self.config.session_ttl_secs = secs;
        self
    }

    /// Set the backend verification timeout in seconds.
    #[must_use]
    pub const fn verify_timeout_secs(mut self, secs: u64) -> Self {
        self.config.verify_timeout_secs = secs;
        self
    }

    /// Build the config.
    #[must_use]
    pub fn build(self) -> GatewayConfig {
        self.config
    }
}
