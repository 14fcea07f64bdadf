//! Request-layer concerns: the administrator capability check and caller identity.

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::convert::Infallible;
use tower_http::cors::{Any, CorsLayer};

/// Header carrying the authenticated user id, set by the upstream auth layer.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// Access configuration loaded from environment variables.
#[derive(Clone, Debug, Default)]
pub struct AccessConfig {
    /// Key granting the administrator capability (from FEATURE_TOGGLE_ADMIN_KEY).
    /// When unset, administrator routes are open (local development).
    pub admin_key: Option<String>,
    /// Allowed CORS origins (from FEATURE_TOGGLE_CORS_ORIGINS, comma-separated)
    pub cors_origins: Option<Vec<String>>,
}

impl AccessConfig {
    pub fn from_env() -> Self {
        let admin_key = std::env::var("FEATURE_TOGGLE_ADMIN_KEY")
            .ok()
            .filter(|key| !key.is_empty());

        let cors_origins = std::env::var("FEATURE_TOGGLE_CORS_ORIGINS")
            .ok()
            .map(|s| s.split(',').map(|s| s.trim().to_string()).collect());

        Self {
            admin_key,
            cors_origins,
        }
    }

    /// No capability check (for local development/testing).
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn with_admin_key(key: impl Into<String>) -> Self {
        Self {
            admin_key: Some(key.into()),
            cors_origins: None,
        }
    }

    pub fn with_cors_origins(origins: Vec<String>) -> Self {
        Self {
            admin_key: None,
            cors_origins: Some(origins),
        }
    }

    pub(crate) fn cors_layer(&self) -> CorsLayer {
        match &self.cors_origins {
            Some(origins) => {
                let origins: Vec<HeaderValue> = origins
                    .iter()
                    .filter_map(|origin| origin.parse().ok())
                    .collect();
                CorsLayer::new()
                    .allow_origin(origins)
                    .allow_methods(Any)
                    .allow_headers(Any)
            }
            None => CorsLayer::permissive(),
        }
    }
}

/// Rejects requests lacking the administrator capability with 403.
pub async fn admin_middleware(
    State(config): State<AccessConfig>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let expected_key = match &config.admin_key {
        Some(key) => key,
        None => return Ok(next.run(request).await),
    };

    let token = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    match token {
        Some(token) if token == expected_key => Ok(next.run(request).await),
        Some(_) => {
            tracing::warn!("Invalid administrator key provided");
            Err(StatusCode::FORBIDDEN)
        }
        None => {
            tracing::warn!("Missing administrator credentials");
            Err(StatusCode::FORBIDDEN)
        }
    }
}

/// The caller of an entitlement query: a user id, or `None` when anonymous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(pub Option<String>);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);
        Ok(Caller(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn access_config_disabled_has_no_admin_key() {
        let config = AccessConfig::disabled();
        assert!(config.admin_key.is_none());
        assert!(config.cors_origins.is_none());
    }

    #[test]
    fn access_config_with_admin_key() {
        let config = AccessConfig::with_admin_key("secret");
        assert_eq!(config.admin_key, Some("secret".to_string()));
    }

    #[tokio::test]
    async fn caller_reads_user_header() {
        let request = Request::builder()
            .header(USER_ID_HEADER, " alice ")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();

        let caller = Caller::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(caller, Caller(Some("alice".to_string())));
    }

    #[tokio::test]
    async fn caller_without_header_is_anonymous() {
        let request = Request::builder().body(()).unwrap();
        let (mut parts, _) = request.into_parts();

        let caller = Caller::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(caller, Caller(None));
    }
}
