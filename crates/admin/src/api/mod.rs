//! Catalog API client.
//!
//! Thin typed wrapper over the REST API:
//!
//! - JSON bodies for promo codes
//! - multipart forms for products (images are uploaded inline)
//! - `Authorization: Bearer <token>` on every mutating call except the public
//!   promo verification
//!
//! Every non-success status is reported the same way, as
//! [`ApiError::Server`], carrying the server's message when it sent one.
//! No request is retried.
//!
//! # Example
//!
//! ```rust,ignore
//! use atelier_admin::api::ApiClient;
//!
//! let client = ApiClient::new(&config.api)?;
//! let promos = client.list_promos().await?;
//! client.toggle_promo(promos[0].id).await?;
//! ```

mod products;
mod promo;

pub use products::IMAGE_PART;

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, Response};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use url::Url;

use crate::config::{ApiConfig, bearer_token};

/// Errors that can occur when talking to the catalog API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("Server error {status}: {}", message.as_deref().unwrap_or("no details"))]
    Server {
        status: u16,
        message: Option<String>,
    },

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A path could not be resolved against the base URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// A mutating call was attempted without a bearer token.
    #[error("No API token configured (set ATELIER_API_TOKEN)")]
    MissingToken,
}

impl ApiError {
    /// The message the server sent with a failed response, if any.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Server { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

/// Whether a request carries the bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Auth {
    Public,
    Bearer,
}

/// Catalog API client.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    config: ApiConfig,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                config: config.clone(),
            }),
        })
    }

    /// The API base origin.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.config.base_url
    }

    /// Whether a bearer token is configured.
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.inner.config.token.is_some()
    }

    /// Resolve a server-relative path (such as an image URL) against the base
    /// origin. Absolute URLs are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Url` if the path cannot be joined.
    pub fn resolve_url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.config.base_url.join(path)?)
    }

    fn request(&self, method: Method, path: &str, auth: Auth) -> Result<RequestBuilder, ApiError> {
        let url = self.resolve_url(path)?;
        let builder = self.inner.client.request(method, url);
        match auth {
            Auth::Public => Ok(builder),
            Auth::Bearer => {
                let token = bearer_token(&self.inner.config).ok_or(ApiError::MissingToken)?;
                Ok(builder.bearer_auth(token))
            }
        }
    }

    /// Execute a GET request and decode the JSON response.
    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.request(Method::GET, path, Auth::Public)?.send().await?;
        Self::handle_response(response).await
    }

    /// Execute an authenticated request with a JSON body, ignoring the response body.
    pub(crate) async fn send_json<B: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<(), ApiError> {
        let response = self
            .request(method, path, Auth::Bearer)?
            .json(body)
            .send()
            .await?;
        Self::expect_success(response).await
    }

    /// Execute a public POST with a JSON body and decode the JSON response.
    pub(crate) async fn post_public<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self
            .request(Method::POST, path, Auth::Public)?
            .json(body)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Execute an authenticated request without a body.
    pub(crate) async fn send_empty(&self, method: Method, path: &str) -> Result<(), ApiError> {
        let response = self.request(method, path, Auth::Bearer)?.send().await?;
        Self::expect_success(response).await
    }

    /// Execute an authenticated multipart request.
    pub(crate) async fn send_multipart(
        &self,
        method: Method,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<(), ApiError> {
        let response = self
            .request(method, path, Auth::Bearer)?
            .multipart(form)
            .send()
            .await?;
        Self::expect_success(response).await
    }

    /// Decode a successful JSON response.
    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        if response.status().is_success() {
            let bytes = response.bytes().await?;
            return Ok(serde_json::from_slice(&bytes)?);
        }
        Err(Self::parse_error(response).await)
    }

    async fn expect_success(response: Response) -> Result<(), ApiError> {
        if response.status().is_success() {
            return Ok(());
        }
        Err(Self::parse_error(response).await)
    }

    /// Build an error from a failed response.
    ///
    /// The message is taken from a JSON `message` or `error` field, or else
    /// the raw body text.
    async fn parse_error(response: Response) -> ApiError {
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        let message = extract_message(&text);

        tracing::warn!(status, message = ?message, "API request failed");
        ApiError::Server { status, message }
    }
}

fn extract_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let field = ["message", "error"]
            .iter()
            .find_map(|key| value.get(*key).and_then(serde_json::Value::as_str));
        return field
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(String::from);
    }
    Some(body.to_string())
}
