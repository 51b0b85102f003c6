//! Bearer-token authentication for the metrics routes.
//!
//! Callers send `Authorization: Bearer <token>`; the token is a shared
//! secret from configuration. A missing or wrong token is a 401 with the
//! standard error envelope.

use std::fmt;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::handlers::AppError;
use crate::AppState;

/// Shared-secret bearer authentication settings.
#[derive(Clone)]
pub struct AuthConfig {
    token: Option<String>,
}

impl AuthConfig {
    /// Require `Authorization: Bearer <token>` on every protected route.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// Accept every request. Meant for embedding behind another auth layer.
    pub fn disabled() -> Self {
        Self { token: None }
    }

    pub fn requires_auth(&self) -> bool {
        self.token.is_some()
    }

    /// `true` when auth is disabled or `provided` equals the configured token.
    pub fn validate(&self, provided: Option<&str>) -> bool {
        match (&self.token, provided) {
            (None, _) => true,
            (Some(expected), Some(provided)) => constant_time_eq(expected, provided),
            (Some(_), None) => false,
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.token {
            Some(_) => write!(f, "Bearer(*****)"),
            None => write!(f, "Disabled"),
        }
    }
}

/// The token part of an `Authorization: Bearer ...` header, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") {
        Some(token.trim()).filter(|t| !t.is_empty())
    } else {
        None
    }
}

/// Route layer: rejects the request before it reaches a handler.
pub async fn require_bearer(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    if state.auth.validate(bearer_token(req.headers())) {
        return next.run(req).await;
    }

    tracing::warn!(path = %req.uri().path(), "rejected unauthenticated metrics request");
    AppError::Unauthorized.into_response()
}

/// Compares every byte regardless of where the first mismatch is.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(auth: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(auth).unwrap());
        headers
    }

    #[test]
    fn bearer_config_checks_token() {
        let auth = AuthConfig::bearer("s3cret");
        assert!(auth.requires_auth());
        assert!(auth.validate(Some("s3cret")));
        assert!(!auth.validate(Some("s3cret2")));
        assert!(!auth.validate(Some("")));
        assert!(!auth.validate(None));
    }

    #[test]
    fn disabled_config_accepts_anything() {
        let auth = AuthConfig::disabled();
        assert!(!auth.requires_auth());
        assert!(auth.validate(None));
        assert!(auth.validate(Some("whatever")));
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(bearer_token(&headers("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("Basic abc")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn debug_hides_token() {
        assert_eq!(format!("{:?}", AuthConfig::bearer("s3cret")), "Bearer(*****)");
        assert_eq!(format!("{:?}", AuthConfig::disabled()), "Disabled");
    }

    #[test]
    fn constant_time_eq_basics() {
        assert!(constant_time_eq("same", "same"));
        assert!(!constant_time_eq("same", "sane"));
        assert!(!constant_time_eq("short", "longer"));
    }
}
