//! Session lifecycle: startup routing, login, and logout.
//!
//! `SessionLifecycle` ties the other modules together. Startup routes on the
//! presence of a stored token: with one, the profile is fetched and the
//! authenticated services are handed back; without one (or when the service
//! rejects the token) the caller is told to run the login flow. Logout tears
//! everything down idempotently.

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{ApiClient, ApiError, ApiErrorKind, ApiResult};
use crate::catalog::PhotoCatalog;
use crate::config::Config;
use crate::oauth::{parse_authorization_input, AuthSession, TokenStore};
use crate::profile::{Profile, ProfileDirectory};

const STATE_FILE: &str = "state.json";

/// Session metadata persisted alongside the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub username: String,
    pub logged_in_at: DateTime<Utc>,
}

/// The authenticated service handles produced by a successful start or login.
#[derive(Debug, Clone)]
pub struct Services {
    /// Profile fetched at session start.
    pub profile: Profile,
    pub profiles: Arc<ProfileDirectory>,
    pub catalog: Arc<PhotoCatalog>,
}

/// Where startup routed.
#[derive(Debug)]
pub enum SessionStart {
    /// A valid token was found; the session is live.
    Authenticated(Services),
    /// No usable token; the caller must run the login flow.
    NeedsLogin,
}

/// Owns the token store and drives login, startup routing, and logout.
#[derive(Debug)]
pub struct SessionLifecycle {
    config: Config,
    base_dir: PathBuf,
    store: TokenStore,
    auth: Mutex<Option<Arc<AuthSession>>>,
    current: Mutex<Option<Services>>,
}

impl SessionLifecycle {
    /// Creates a lifecycle rooted at `base_dir` (token and session state
    /// live there).
    pub fn new(config: Config, base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            config,
            store: TokenStore::new(&base_dir),
            base_dir,
            auth: Mutex::new(None),
            current: Mutex::new(None),
        }
    }

    /// Lifecycle rooted at the pikto home directory.
    pub fn default_location(config: Config) -> Self {
        Self::new(config, crate::config::paths::pikto_home())
    }

    fn state_path(&self) -> PathBuf {
        self.base_dir.join(STATE_FILE)
    }

    /// Routes startup on the stored token.
    ///
    /// A token rejected by the service (401) is treated the same as a
    /// missing one: it is cleared and the caller is told to log in again.
    pub async fn start(&self) -> Result<SessionStart> {
        let Some(token) = self.store.get()? else {
            tracing::debug!("no stored token");
            return Ok(SessionStart::NeedsLogin);
        };

        match self.build_services(&token).await {
            Ok(services) => Ok(SessionStart::Authenticated(services)),
            Err(err) if err.status == Some(401) => {
                tracing::warn!("stored token rejected by the service, clearing it");
                self.store.clear()?;
                Ok(SessionStart::NeedsLogin)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Runs the code exchange and brings up the authenticated services.
    ///
    /// `input` is whatever the user pasted: a redirect URL, a `code=...`
    /// fragment, or the bare code.
    pub async fn login(&self, input: &str) -> Result<Services> {
        let code = parse_authorization_input(input)
            .context("no authorization code found in the pasted input")?;
        let auth = self.auth_session()?;
        let token = auth.exchange_code(&code).await?;
        let services = self.build_services(&token).await?;
        Ok(services)
    }

    /// Tears the session down. Safe to call repeatedly or when not logged in.
    pub fn logout(&self) -> Result<()> {
        self.store.clear()?;

        let state_path = self.state_path();
        match fs::remove_file(&state_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to remove session state file {}", state_path.display())
                })
            }
        }

        if let Some(services) = self.current.lock().expect("session lock poisoned").take() {
            services.catalog.clear();
            services.profiles.reset();
        }

        if let Some(auth) = self.auth.lock().expect("auth lock poisoned").as_ref() {
            auth.reset();
        }

        tracing::info!("logged out");
        Ok(())
    }

    /// Reads the persisted session state, if any.
    pub fn session_state(&self) -> Result<Option<SessionState>> {
        let path = self.state_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read session state from {}", path.display()))?;
        let state = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse session state {}", path.display()))?;
        Ok(Some(state))
    }

    /// Lazily builds the auth session (needs the OAuth keys, which a
    /// logged-in run never touches).
    fn auth_session(&self) -> Result<Arc<AuthSession>> {
        let mut slot = self.auth.lock().expect("auth lock poisoned");
        if let Some(auth) = slot.as_ref() {
            return Ok(Arc::clone(auth));
        }
        let auth = Arc::new(AuthSession::new(&self.config, self.store.clone())?);
        *slot = Some(Arc::clone(&auth));
        Ok(auth)
    }

    async fn build_services(&self, token: &str) -> ApiResult<Services> {
        let api = ApiClient::new(self.config.api_base_url.clone(), token);
        let profiles = Arc::new(ProfileDirectory::new(api.clone()));
        let profile = profiles.fetch_profile().await?;

        let catalog = Arc::new(PhotoCatalog::new(api));
        catalog.set_username(&profile.username);

        self.write_state(&profile.username)
            .map_err(|e| ApiError::new(ApiErrorKind::Storage, format!("{e:#}")))?;

        // Avatar is wanted soon but never blocks startup.
        {
            let profiles = Arc::clone(&profiles);
            tokio::spawn(async move {
                if let Err(err) = profiles.fetch_avatar_url().await {
                    tracing::warn!(%err, "avatar prefetch failed");
                }
            });
        }

        let services = Services {
            profile,
            profiles,
            catalog,
        };
        *self.current.lock().expect("session lock poisoned") = Some(services.clone());
        Ok(services)
    }

    fn write_state(&self, username: &str) -> Result<()> {
        fs::create_dir_all(&self.base_dir).with_context(|| {
            format!("Failed to create directory {}", self.base_dir.display())
        })?;
        let state = SessionState {
            username: username.to_string(),
            logged_in_at: Utc::now(),
        };
        let contents =
            serde_json::to_string_pretty(&state).context("Failed to serialize session state")?;
        let path = self.state_path();
        fs::write(&path, contents)
            .with_context(|| format!("Failed to write session state to {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::catalog::Collection;

    use super::*;

    fn test_config(server: &MockServer) -> Config {
        Config {
            api_base_url: server.uri(),
            auth_base_url: server.uri(),
            access_key: Some("ak-test".to_string()),
            secret_key: Some("sk-test".to_string()),
            ..Config::default()
        }
    }

    async fn mount_me(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "username": "ada",
                "first_name": "Ada",
                "total_likes": 2
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/ada"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "profile_image": { "medium": "https://img.test/ada.jpg" }
            })))
            .mount(server)
            .await;
    }

    /// Test: no stored token routes to login.
    #[tokio::test]
    async fn test_start_without_token_needs_login() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let session = SessionLifecycle::new(test_config(&server), dir.path());

        assert!(matches!(
            session.start().await.unwrap(),
            SessionStart::NeedsLogin
        ));
    }

    /// Test: login exchanges the pasted redirect URL, persists the token and
    /// session state, and hands back live services.
    #[tokio::test]
    async fn test_login_flow() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(query_param("code", "code-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok-1"
            })))
            .expect(1)
            .mount(&server)
            .await;
        mount_me(&server).await;

        let dir = tempfile::tempdir().unwrap();
        let session = SessionLifecycle::new(test_config(&server), dir.path());

        let services = session
            .login("https://example.test/cb?code=code-1")
            .await
            .unwrap();
        assert_eq!(services.profile.username, "ada");

        let store = TokenStore::new(dir.path());
        assert_eq!(store.get().unwrap().as_deref(), Some("tok-1"));
        let state = session.session_state().unwrap().unwrap();
        assert_eq!(state.username, "ada");
    }

    /// Test: a stored token goes straight to an authenticated session.
    #[tokio::test]
    async fn test_start_with_stored_token() {
        let server = MockServer::start().await;
        mount_me(&server).await;

        let dir = tempfile::tempdir().unwrap();
        TokenStore::new(dir.path()).set("tok-1").unwrap();
        let session = SessionLifecycle::new(test_config(&server), dir.path());

        match session.start().await.unwrap() {
            SessionStart::Authenticated(services) => {
                assert_eq!(services.profile.login_name, "@ada");
            }
            SessionStart::NeedsLogin => panic!("expected authenticated start"),
        }
    }

    /// Test: a rejected token is cleared and startup routes to login.
    #[tokio::test]
    async fn test_start_with_rejected_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({"errors": ["invalid token"]})),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path());
        store.set("tok-stale").unwrap();
        let session = SessionLifecycle::new(test_config(&server), dir.path());

        assert!(matches!(
            session.start().await.unwrap(),
            SessionStart::NeedsLogin
        ));
        assert!(store.get().unwrap().is_none());
    }

    /// Test: logout clears every piece of session state and is idempotent.
    #[tokio::test]
    async fn test_logout_clears_everything() {
        let server = MockServer::start().await;
        mount_me(&server).await;

        let dir = tempfile::tempdir().unwrap();
        TokenStore::new(dir.path()).set("tok-1").unwrap();
        let session = SessionLifecycle::new(test_config(&server), dir.path());

        let SessionStart::Authenticated(services) = session.start().await.unwrap() else {
            panic!("expected authenticated start");
        };

        session.logout().unwrap();

        assert!(TokenStore::new(dir.path()).get().unwrap().is_none());
        assert!(session.session_state().unwrap().is_none());
        assert_eq!(services.catalog.count(Collection::Feed), 0);
        assert!(services.profiles.cached_profile().is_none());

        // Logging out again is harmless.
        session.logout().unwrap();
    }
}
