//! OAuth code exchange and persistent token storage.
//!
//! The token lives in `${PIKTO_HOME}/token.json` with owner-only permissions.
//! `AuthSession` guards the exchange against the two failure modes of a
//! paste-the-code flow: resubmitting the same code, and a newer exchange
//! starting while an older one is still in flight.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::{ApiError, ApiErrorKind, ApiResult, USER_AGENT};
use crate::config::{paths, Config, DEFAULT_AUTH_BASE_URL};

const TOKEN_FILE: &str = "token.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct TokenFile {
    bearer_token: Option<String>,
}

/// File-backed bearer-token storage.
///
/// All accessors are infallible with respect to concurrency: the token file
/// is tiny and rewritten atomically enough for a single-user CLI.
#[derive(Debug, Clone)]
pub struct TokenStore {
    base_dir: PathBuf,
}

impl TokenStore {
    /// Store rooted at an explicit directory (tests point this at a tempdir).
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Store rooted at the pikto home directory.
    pub fn default_location() -> Self {
        Self::new(paths::pikto_home())
    }

    fn token_path(&self) -> PathBuf {
        self.base_dir.join(TOKEN_FILE)
    }

    /// Returns the stored token, or `None` when none has been saved.
    pub fn get(&self) -> Result<Option<String>> {
        let path = self.token_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read token from {}", path.display()))?;
        let file: TokenFile = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse token file {}", path.display()))?;
        Ok(file.bearer_token.filter(|t| !t.is_empty()))
    }

    /// Persists `token`, creating the directory and restricting permissions.
    pub fn set(&self, token: &str) -> Result<()> {
        fs::create_dir_all(&self.base_dir).with_context(|| {
            format!("Failed to create directory {}", self.base_dir.display())
        })?;
        let path = self.token_path();
        let file = TokenFile {
            bearer_token: Some(token.to_string()),
        };
        let contents = serde_json::to_string_pretty(&file).context("Failed to serialize token")?;
        fs::write(&path, contents)
            .with_context(|| format!("Failed to write token to {}", path.display()))?;

        // Token file is a credential: owner read/write only.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&path, perms)
                .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
        }

        Ok(())
    }

    /// Removes the stored token. A missing file is not an error.
    pub fn clear(&self) -> Result<()> {
        let path = self.token_path();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to remove token file {}", path.display()))
            }
        }
    }
}

/// Token endpoint response body.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Default)]
struct AuthState {
    /// Most recently submitted authorization code (process lifetime).
    last_code: Option<String>,
    /// Monotonic exchange counter; a completed exchange whose number is no
    /// longer current has been superseded and must not store its token.
    seq: u64,
}

/// Performs the authorization-code exchange and writes the token store.
#[derive(Debug)]
pub struct AuthSession {
    http: reqwest::Client,
    token_url: String,
    redirect_uri: String,
    access_key: String,
    secret_key: String,
    store: TokenStore,
    state: Mutex<AuthState>,
}

impl AuthSession {
    /// Builds a session from resolved configuration.
    ///
    /// # Errors
    /// Returns an error if the access key or secret key is missing.
    ///
    /// # Panics
    /// In test builds, panics if the auth host is the production OAuth host.
    pub fn new(config: &Config, store: TokenStore) -> Result<Self> {
        assert!(
            !(cfg!(test) && config.auth_base_url == DEFAULT_AUTH_BASE_URL),
            "Tests must not use the production OAuth host!\n\
             Set PIKTO_AUTH_BASE_URL to a mock server (e.g., wiremock)."
        );

        Ok(Self {
            http: reqwest::Client::new(),
            token_url: config.token_url(),
            redirect_uri: config.redirect_uri.clone(),
            access_key: config.resolved_access_key()?,
            secret_key: config.resolved_secret_key()?,
            store,
            state: Mutex::new(AuthState::default()),
        })
    }

    /// Exchanges an authorization code for a bearer token and persists it.
    ///
    /// Resubmitting the code most recently exchanged in this process returns
    /// a `DuplicateRequest` error without touching the network. If a newer
    /// exchange starts before this one completes, the older completion is
    /// discarded with a `Cancelled` error and the newer token wins.
    pub async fn exchange_code(&self, code: &str) -> ApiResult<String> {
        let my_seq = {
            let mut state = self.state.lock().expect("auth state lock poisoned");
            if state.last_code.as_deref() == Some(code) {
                return Err(ApiError::duplicate_request());
            }
            state.last_code = Some(code.to_string());
            state.seq += 1;
            state.seq
        };

        let params = [
            ("client_id", self.access_key.as_str()),
            ("client_secret", self.secret_key.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
        ];
        let response = self
            .http
            .post(&self.token_url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .query(&params)
            .send()
            .await
            .map_err(|e| ApiError::transport(&e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| ApiError::transport(&e))?;
        if !status.is_success() {
            return Err(ApiError::http_status(status.as_u16(), &body));
        }
        let token: TokenResponse =
            serde_json::from_str(&body).map_err(|e| ApiError::decode("token response", &e))?;

        {
            let state = self.state.lock().expect("auth state lock poisoned");
            if state.seq != my_seq {
                return Err(ApiError::cancelled(
                    "token exchange superseded by a newer request",
                ));
            }
        }

        self.store
            .set(&token.access_token)
            .map_err(|e| ApiError::new(ApiErrorKind::Storage, format!("{e:#}")))?;

        tracing::info!("bearer token stored");
        Ok(token.access_token)
    }

    /// Forgets the duplicate-code guard (called on logout).
    pub fn reset(&self) {
        let mut state = self.state.lock().expect("auth state lock poisoned");
        state.last_code = None;
    }
}

/// Extracts an authorization code from whatever the user pasted.
///
/// Accepts a full redirect URL with a `code` query parameter, a raw
/// `code=...` query fragment, or the bare code itself. Returns `None` for
/// blank input.
pub fn parse_authorization_input(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(url) = url::Url::parse(trimmed) {
        if let Some((_, code)) = url.query_pairs().find(|(k, _)| k == "code") {
            return Some(code.into_owned());
        }
    }

    if let Some(rest) = trimmed.strip_prefix("code=") {
        let code = rest.split('&').next().unwrap_or(rest);
        if !code.is_empty() {
            return Some(code.to_string());
        }
        return None;
    }

    Some(trimmed.to_string())
}
