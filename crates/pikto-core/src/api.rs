//! Authenticated HTTP plumbing shared by the photo-service endpoints.
//!
//! One decoding policy applies to every response body: check the status,
//! then deserialize the full body with serde. Partial decodes never produce
//! partially-valid values.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::DEFAULT_API_BASE_URL;

/// Standard User-Agent header for pikto API requests.
pub const USER_AGENT: &str = concat!("pikto/", env!("CARGO_PKG_VERSION"));

/// Categories of data-layer errors for consistent handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    /// HTTP status error (non-2xx), carries the status code
    HttpStatus,
    /// Connection failure or request timeout
    Transport,
    /// Failed to parse a response body
    Decode,
    /// Auth-code exchange repeated with the code most recently exchanged
    DuplicateRequest,
    /// Request superseded by a newer one of the same kind (or by logout)
    Cancelled,
    /// Token-store persistence failure
    Storage,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiErrorKind::HttpStatus => write!(f, "http_status"),
            ApiErrorKind::Transport => write!(f, "transport"),
            ApiErrorKind::Decode => write!(f, "decode"),
            ApiErrorKind::DuplicateRequest => write!(f, "duplicate_request"),
            ApiErrorKind::Cancelled => write!(f, "cancelled"),
            ApiErrorKind::Storage => write!(f, "storage"),
        }
    }
}

/// Structured error from the data layer with kind and details.
#[derive(Debug, Clone)]
pub struct ApiError {
    /// Error category
    pub kind: ApiErrorKind,
    /// One-line summary suitable for display
    pub message: String,
    /// HTTP status code, for `HttpStatus` errors
    pub status: Option<u16>,
    /// Optional additional details (e.g., raw error body)
    pub details: Option<String>,
}

impl ApiError {
    /// Creates a new error with no status or details.
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            details: None,
        }
    }

    /// Creates an HTTP status error, extracting a cleaner message from a
    /// JSON error body when one is present.
    pub fn http_status(status: u16, body: &str) -> Self {
        let mut message = format!("HTTP {status}");
        let details = if body.is_empty() {
            None
        } else {
            if let Ok(json) = serde_json::from_str::<Value>(body) {
                if let Some(errors) = json.get("errors").and_then(|v| v.as_array()) {
                    if let Some(first) = errors.first().and_then(|v| v.as_str()) {
                        message = format!("HTTP {status}: {first}");
                    }
                }
            }
            Some(body.to_string())
        };
        Self {
            kind: ApiErrorKind::HttpStatus,
            message,
            status: Some(status),
            details,
        }
    }

    /// Creates a transport error from a reqwest failure.
    pub fn transport(err: &reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("request timed out: {err}")
        } else {
            format!("request failed: {err}")
        };
        Self::new(ApiErrorKind::Transport, message)
    }

    /// Creates a decode error for a response body.
    pub fn decode(what: &str, err: &serde_json::Error) -> Self {
        Self::new(ApiErrorKind::Decode, format!("failed to decode {what}: {err}"))
    }

    /// Guard error for a repeated auth code.
    pub fn duplicate_request() -> Self {
        Self::new(
            ApiErrorKind::DuplicateRequest,
            "authorization code was already exchanged",
        )
    }

    /// Supersession error for the cancel-previous-start-new policy.
    pub fn cancelled(what: &str) -> Self {
        Self::new(ApiErrorKind::Cancelled, what)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

/// Result type for data-layer operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Bearer-authenticated client for the photo-service REST API.
///
/// Holding a token is a construction requirement, so an authenticated
/// request can never be built without one.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    /// Creates a new client for `base_url` authenticating with `token`.
    ///
    /// # Panics
    /// - In test builds, panics if `base_url` is the production API.
    /// - At runtime, panics if `PIKTO_BLOCK_REAL_API=1` and `base_url` is the
    ///   production API.
    ///
    /// This prevents tests from accidentally making real network requests.
    /// Point tests at a mock server (e.g., wiremock) instead.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url = base_url.into();

        #[cfg(test)]
        if base_url == DEFAULT_API_BASE_URL {
            panic!(
                "Tests must not use the production photo API!\n\
                 Set PIKTO_API_BASE_URL to a mock server (e.g., wiremock).\n\
                 Found base_url: {base_url}"
            );
        }

        #[cfg(not(test))]
        if std::env::var("PIKTO_BLOCK_REAL_API").is_ok_and(|v| v == "1")
            && base_url == DEFAULT_API_BASE_URL
        {
            panic!(
                "PIKTO_BLOCK_REAL_API=1 but trying to use the production photo API!\n\
                 Set PIKTO_API_BASE_URL to a mock server.\n\
                 Found base_url: {base_url}"
            );
        }

        Self {
            http: reqwest::Client::new(),
            base_url,
            token: token.into(),
        }
    }

    /// Sends an authenticated GET and decodes the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ApiResult<T> {
        let url = format!("{}/{path}", self.base_url);
        let request = self.http.get(&url).query(query);
        self.send_json(request, path).await
    }

    /// Sends an authenticated POST with an empty body and decodes the JSON response.
    pub async fn post_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let url = format!("{}/{path}", self.base_url);
        self.send_json(self.http.post(&url), path).await
    }

    /// Sends an authenticated DELETE and decodes the JSON response.
    pub async fn delete_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let url = format!("{}/{path}", self.base_url);
        self.send_json(self.http.delete(&url), path).await
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        path: &str,
    ) -> ApiResult<T> {
        let response = request
            .header(reqwest::header::AUTHORIZATION, format!("Bearer {}", self.token))
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .map_err(|e| ApiError::transport(&e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| ApiError::transport(&e))?;

        if !status.is_success() {
            return Err(ApiError::http_status(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| ApiError::decode(path, &e))
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The bearer token is never printed in full.
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("token", &mask_token(&self.token))
            .finish_non_exhaustive()
    }
}

/// Returns a masked version of a token for display (first 8 chars + ...).
pub fn mask_token(token: &str) -> String {
    if token.len() <= 12 {
        return "***".to_string();
    }
    // Split on characters, not bytes; a multi-byte prefix must not panic.
    let prefix: String = token.chars().take(8).collect();
    format!("{prefix}...")
}
