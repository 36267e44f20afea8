//! Credential extraction from inbound requests.
//!
//! A request can carry a long-lived API token (Authorization header or a
//! configured cookie) and a short-lived session token (a second configured
//! cookie). Both are tracked independently; either or both may be absent,
//! which is a normal outcome rather than an error.

use serde::{Deserialize, Serialize};

/// The kind of credential a request presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    /// Long-lived API token, verified against the backend.
    ApiToken,
    /// Short-lived signed session token minted by this gateway.
    SessionToken,
}

/// A single extracted credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// What kind of credential this is.
    pub kind: CredentialKind,
    /// The opaque token value, with any `Bearer` prefix already stripped.
    pub value: String,
}

impl Credential {
    /// Create a credential of the given kind.
    #[must_use]
    pub fn new(kind: CredentialKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

/// Cookie names carrying the two credential kinds.
///
/// Names are deployment configuration, not part of the protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieNames {
    /// Cookie carrying the long-lived API token.
    #[serde(default = "default_api_cookie")]
    pub api: String,
    /// Cookie carrying the short-lived session token.
    #[serde(default = "default_session_cookie")]
    pub session: String,
}

fn default_api_cookie() -> String {
    "ag_token".to_string()
}

fn default_session_cookie() -> String {
    "ag_session_token".to_string()
}

impl Default for CookieNames {
    fn default() -> Self {
        Self {
            api: default_api_cookie(),
            session: default_session_cookie(),
        }
    }
}

/// The credentials extracted from one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestCredentials {
    /// API token, if the request presented one.
    pub api_token: Option<Credential>,
    /// Session token, if the request presented one.
    pub session_token: Option<Credential>,
}

impl RequestCredentials {
    /// True when the request presented no credential at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.api_token.is_none() && self.session_token.is_none()
    }
}

/// Extract both credentials from the raw `Authorization` and `Cookie`
/// header values.
///
/// The Authorization header wins over the API cookie; the session cookie is
/// an independent input and is read regardless.
#[must_use]
pub fn extract(
    authorization: Option<&str>,
    cookie_header: Option<&str>,
    names: &CookieNames,
) -> RequestCredentials {
    let api_raw = authorization
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
        .or_else(|| cookie_header.and_then(|c| cookie_value(c, &names.api)));
    let session_raw = cookie_header.and_then(|c| cookie_value(c, &names.session));

    RequestCredentials {
        api_token: api_raw
            .as_deref()
            .and_then(normalize)
            .map(|v| Credential::new(CredentialKind::ApiToken, v)),
        session_token: session_raw
            .as_deref()
            .and_then(normalize)
            .map(|v| Credential::new(CredentialKind::SessionToken, v)),
    }
}

/// Strip the `Bearer` scheme literal and surrounding whitespace.
///
/// The literal is matched case-sensitively anywhere in the value, not only
/// as a prefix, and only its first occurrence is removed. Values that end
/// up empty normalize to `None`.
#[must_use]
pub fn normalize(raw: &str) -> Option<String> {
    let stripped = if raw.contains("Bearer") {
        raw.replacen("Bearer", "", 1)
    } else {
        raw.to_string()
    };
    let trimmed = stripped.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Pull a single value out of a `Cookie` header (RFC 6265 `name=value`
/// pairs separated by `;`).
fn cookie_value(cookie_header: &str, name: &str) -> Option<String> {
    cookie_header.split(';').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if key.trim() == name {
            Some(value.trim().to_string())
        } else {
            None
        }
    })
}
