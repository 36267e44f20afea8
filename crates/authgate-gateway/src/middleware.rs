//! Authorization middleware for axum.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderValue, Method, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use authgate_core::credentials;

use crate::orchestrator::Decision;
use crate::server::GatewayState;

/// Derives the required permission for a route.
///
/// The required permission comes from the calling context (the route),
/// never from the caller's credential. A `None` means the route is public
/// and the request passes through unchecked.
pub trait PermissionResolver: Send + Sync {
    /// Resolve the permission a request to `path` with `method` must hold.
    fn resolve(&self, method: &Method, path: &str) -> Option<String>;
}

/// Resolver that guards every route behind one fixed permission.
#[derive(Debug, Clone)]
pub struct FixedResolver {
    permission: String,
}

impl FixedResolver {
    /// Create a resolver requiring `permission` everywhere.
    #[must_use]
    pub fn new(permission: impl Into<String>) -> Self {
        Self {
            permission: permission.into(),
        }
    }
}

impl PermissionResolver for FixedResolver {
    fn resolve(&self, _method: &Method, _path: &str) -> Option<String> {
        Some(self.permission.clone())
    }
}

/// Resolver for project-scoped routes.
///
/// Maps `/projects/{id}/...` to `projects/{id}#read` for GET and HEAD and
/// `projects/{id}#write` for everything else. Routes outside the project
/// tree resolve to nothing and stay public.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectRouteResolver;

impl PermissionResolver for ProjectRouteResolver {
    fn resolve(&self, method: &Method, path: &str) -> Option<String> {
        let mut segments = path.trim_start_matches('/').split('/');
        if segments.next()? != "projects" {
            return None;
        }
        let project = segments.next().filter(|s| !s.is_empty())?;

        let level = if method == Method::GET || method == Method::HEAD {
            "read"
        } else {
            "write"
        };
        Some(format!("projects/{project}#{level}"))
    }
}

/// Axum middleware running the authorization pipeline for each request.
///
/// Forwarding dispatches to the inner service; rejecting writes the 403
/// here and dispatches nothing. A fresh session cookie, when one was
/// minted, is appended to the forwarded response.
pub async fn authorize_request(
    State(state): State<Arc<GatewayState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(permission) = state
        .resolver
        .resolve(request.method(), request.uri().path())
    else {
        return next.run(request).await;
    };

    let creds = {
        let headers = request.headers();
        credentials::extract(
            headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok()),
            headers.get(header::COOKIE).and_then(|v| v.to_str().ok()),
            &state.cookies,
        )
    };

    match state.orchestrator.authorize(&creds, &permission).await {
        Decision::Forward { cookie } => {
            let mut response = next.run(request).await;
            if let Some(cookie) = cookie {
                match HeaderValue::from_str(&cookie.header_value()) {
                    Ok(value) => {
                        response.headers_mut().append(header::SET_COOKIE, value);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Session cookie not header-encodable, dropped");
                    }
                }
            }
            response
        }
        Decision::Reject(reason) => {
            tracing::debug!(permission = %permission, reason = reason.message(), "Request rejected");
            (reason.status(), reason.message()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_project_route_read_write_levels() {
        let resolver = ProjectRouteResolver;
        assert_eq!(
            resolver.resolve(&Method::GET, "/projects/p1/services/s1"),
            Some("projects/p1#read".to_string())
        );
        assert_eq!(
            resolver.resolve(&Method::HEAD, "/projects/p1"),
            Some("projects/p1#read".to_string())
        );
        assert_eq!(
            resolver.resolve(&Method::POST, "/projects/p1/files"),
            Some("projects/p1#write".to_string())
        );
        assert_eq!(
            resolver.resolve(&Method::DELETE, "/projects/p1"),
            Some("projects/p1#write".to_string())
        );
    }

    #[test]
    fn test_project_route_non_project_paths_public() {
        let resolver = ProjectRouteResolver;
        assert_eq!(resolver.resolve(&Method::GET, "/health"), None);
        assert_eq!(resolver.resolve(&Method::GET, "/"), None);
        assert_eq!(resolver.resolve(&Method::GET, "/projects"), None);
        assert_eq!(resolver.resolve(&Method::GET, "/projects/"), None);
    }

    #[test]
    fn test_fixed_resolver() {
        let resolver = FixedResolver::new("projects/p1#read");
        assert_eq!(
            resolver.resolve(&Method::DELETE, "/anything/at/all"),
            Some("projects/p1#read".to_string())
        );
    }
}
