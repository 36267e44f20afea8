//! Session-cookie issuance.

use std::sync::Arc;

use authgate_core::{AuthError, SessionCodec};

/// A freshly minted session cookie, ready to attach to a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    name: String,
    token: String,
    max_age_secs: u64,
}

impl SessionCookie {
    /// The signed session token carried by the cookie.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Render the `Set-Cookie` header value.
    #[must_use]
    pub fn header_value(&self) -> String {
        format!(
            "{}={}; HttpOnly; Path=/; Max-Age={}",
            self.name, self.token, self.max_age_secs
        )
    }
}

/// Mints session cookies scoped to a single verified permission.
///
/// Issuing is idempotent: a second issue simply overwrites the cookie with
/// a fresh validity window, and never invalidates earlier tokens.
#[derive(Debug, Clone)]
pub struct SessionIssuer {
    codec: Arc<SessionCodec>,
    cookie_name: String,
}

impl SessionIssuer {
    /// Create an issuer writing to the given cookie name.
    #[must_use]
    pub fn new(codec: Arc<SessionCodec>, cookie_name: impl Into<String>) -> Self {
        Self {
            codec,
            cookie_name: cookie_name.into(),
        }
    }

    /// Mint a session token for `permission` and wrap it as a cookie.
    ///
    /// # Errors
    ///
    /// Returns error if token encoding fails.
    pub fn issue(&self, permission: &str) -> Result<SessionCookie, AuthError> {
        let token = self.codec.mint(permission)?;
        Ok(SessionCookie {
            name: self.cookie_name.clone(),
            token,
            max_age_secs: self.codec.ttl().as_secs(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;

    fn create_issuer() -> (SessionIssuer, Arc<SessionCodec>) {
        let codec = Arc::new(SessionCodec::new(
            &SessionCodec::generate_secret(),
            Duration::from_secs(900),
        ));
        (
            SessionIssuer::new(codec.clone(), "ag_session_token"),
            codec,
        )
    }

    #[test]
    fn test_issue_sets_cookie_attributes() {
        let (issuer, _) = create_issuer();
        let cookie = issuer.issue("projects/p1#read").unwrap();

        let value = cookie.header_value();
        assert!(value.starts_with("ag_session_token="));
        assert!(value.ends_with("; HttpOnly; Path=/; Max-Age=900"));
    }

    #[test]
    fn test_issued_token_is_narrowly_scoped() {
        let (issuer, codec) = create_issuer();
        let cookie = issuer.issue("projects/p1#read").unwrap();

        let claims = codec.verify(cookie.token()).unwrap();
        assert_eq!(claims.permissions, vec!["projects/p1#read".to_string()]);
    }

    #[test]
    fn test_reissue_does_not_invalidate_prior_cookie() {
        let (issuer, codec) = create_issuer();
        let first = issuer.issue("projects/p1#read").unwrap();
        let second = issuer.issue("projects/p1#read").unwrap();

        assert!(codec.verify(first.token()).is_ok());
        assert!(codec.verify(second.token()).is_ok());
    }
}
