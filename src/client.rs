//! HTTP client for the feature toggle API.
//!
//! Services embed this client to ask whether a feature is enabled for the user
//! they are serving. Configuration is via environment variables:
//! - `FEATURE_TOGGLE_URL` - Base URL (default: `http://localhost:3000/api/v1`)
//! - `FEATURE_TOGGLE_ADMIN_KEY` - administrator key, needed for management calls

use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::api::USER_ID_HEADER;
use crate::models::*;

/// Default URL for local development.
pub const DEFAULT_URL: &str = "http://localhost:3000/api/v1";

/// HTTP client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unprocessable: {0}")]
    Unprocessable(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Forbidden: administrator key required or invalid")]
    Forbidden,

    #[error("Server error: {0}")]
    Server(String),
}

#[derive(Debug, Clone)]
pub struct ToggleClient {
    base_url: String,
    admin_key: Option<String>,
    user_id: Option<String>,
    client: Client,
}

impl ToggleClient {
    /// Create client from environment variables.
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("FEATURE_TOGGLE_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
        let admin_key = std::env::var("FEATURE_TOGGLE_ADMIN_KEY").ok();
        Self::new(base_url, admin_key)
    }

    pub fn new(base_url: impl Into<String>, admin_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            admin_key,
            user_id: None,
            client: Client::new(),
        }
    }

    /// A copy of this client that queries entitlements on behalf of `user_id`.
    pub fn with_user(&self, user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..self.clone()
        }
    }

    /// Append `segments` to the base URL, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(
        &self,
        method: Method,
        segments: &[&str],
    ) -> Result<reqwest::RequestBuilder, ClientError> {
        let mut req = self.client.request(method, self.url(segments)?);
        if let Some(ref key) = self.admin_key {
            req = req.bearer_auth(key);
        }
        if let Some(ref user_id) = self.user_id {
            req = req.header(USER_ID_HEADER, user_id);
        }
        Ok(req)
    }

    async fn error_from(response: reqwest::Response) -> ClientError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::NOT_FOUND => ClientError::NotFound(body),
            StatusCode::CONFLICT => ClientError::Conflict(body),
            StatusCode::UNPROCESSABLE_ENTITY => ClientError::Unprocessable(body),
            StatusCode::BAD_REQUEST => ClientError::BadRequest(body),
            StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => ClientError::Forbidden,
            _ => ClientError::Server(format!("{}: {}", status, body)),
        }
    }

    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(Self::error_from(response).await)
        }
    }

    /// Handle response that returns an empty body (204 No Content).
    async fn handle_empty_response(response: reqwest::Response) -> Result<(), ClientError> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_from(response).await)
        }
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ClientError> {
        let response = self.request(Method::GET, segments)?.send().await?;
        Self::handle_response(response).await
    }

    pub async fn health(&self) -> Result<(), ClientError> {
        let response = self.request(Method::GET, &["health"])?.send().await?;
        Self::handle_empty_response(response).await
    }

    // ============================================================
    // Entitlements
    // ============================================================

    /// Whether a feature is enabled for this client's user (or anonymously).
    pub async fn is_enabled(&self, feature_id: i64) -> Result<bool, ClientError> {
        let response: EnabledResponse = self
            .get(&["features", feature_id.to_string().as_str(), "enabled"])
            .await?;
        Ok(response.enabled)
    }

    /// All features enabled for this client's user (or anonymously).
    pub async fn enabled_features(&self) -> Result<Vec<Feature>, ClientError> {
        self.get(&["features", "enabled"]).await
    }

    // ============================================================
    // Management
    // ============================================================

    pub async fn list_features(&self) -> Result<Vec<Feature>, ClientError> {
        self.get(&["features"]).await
    }

    pub async fn feature_tree(&self) -> Result<Vec<FeatureTreeNode>, ClientError> {
        self.get(&["features", "tree"]).await
    }

    pub async fn create_feature(&self, input: &FeatureArgs) -> Result<Feature, ClientError> {
        let response = self
            .request(Method::POST, &["features"])?
            .json(input)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    pub async fn enable_feature(&self, feature_id: i64, group_id: i64) -> Result<(), ClientError> {
        let (feature_id, group_id) = (feature_id.to_string(), group_id.to_string());
        let response = self
            .request(Method::PUT, &["features", feature_id.as_str(), "groups", group_id.as_str()])?
            .send()
            .await?;
        Self::handle_empty_response(response).await
    }

    pub async fn list_groups(&self) -> Result<Vec<Group>, ClientError> {
        self.get(&["groups"]).await
    }

    pub async fn create_group(&self, input: &GroupArgs) -> Result<Group, ClientError> {
        let response = self
            .request(Method::POST, &["groups"])?
            .json(input)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Move a user into a group. The user id is sent as a single path segment.
    pub async fn move_user(&self, user_id: &str, group_id: i64) -> Result<User, ClientError> {
        let response = self
            .request(
                Method::PUT,
                &["users", user_id, "group", group_id.to_string().as_str()],
            )?
            .send()
            .await?;
        Self::handle_response(response).await
    }
}
