//! Configuration management for pikto.
//!
//! Loads configuration from ${PIKTO_HOME}/config.toml with sensible defaults.
//! Environment variables override config values, which override defaults.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default base URL for the photo-service REST API.
pub const DEFAULT_API_BASE_URL: &str = "https://api.unsplash.com";

/// Default base URL for the OAuth host (token exchange and authorization).
pub const DEFAULT_AUTH_BASE_URL: &str = "https://unsplash.com";

/// Out-of-band redirect URI used by the manual (paste-the-code) flow.
pub const DEFAULT_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

/// OAuth scopes required for feed browsing, profile access and like toggling.
pub const DEFAULT_ACCESS_SCOPE: &str = "public+read_user+write_likes";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL for authenticated API requests.
    pub api_base_url: String,
    /// Base URL for the OAuth host (`/oauth/token`, `/oauth/authorize`).
    pub auth_base_url: String,
    /// OAuth application access key (client id).
    pub access_key: Option<String>,
    /// OAuth application secret key (client secret).
    pub secret_key: Option<String>,
    /// Redirect URI registered with the OAuth application.
    pub redirect_uri: String,
    /// Requested OAuth scope.
    pub access_scope: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            auth_base_url: DEFAULT_AUTH_BASE_URL.to_string(),
            access_key: None,
            secret_key: None,
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            access_scope: DEFAULT_ACCESS_SCOPE.to_string(),
        }
    }
}

impl Config {
    /// Loads the configuration from the default path, applying env overrides.
    ///
    /// A missing config file yields the defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads the configuration from an explicit path, applying env overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))?
        } else {
            Self::default()
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Saves the configuration to the default path, creating directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = paths::config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&path, contents)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        Ok(())
    }

    /// Applies env-var overrides: env > config > default.
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(value) = non_empty_env("PIKTO_API_BASE_URL") {
            validate_url(&value, "API")?;
            self.api_base_url = value;
        }
        if let Some(value) = non_empty_env("PIKTO_AUTH_BASE_URL") {
            validate_url(&value, "auth")?;
            self.auth_base_url = value;
        }
        if let Some(value) = non_empty_env("PIKTO_ACCESS_KEY") {
            self.access_key = Some(value);
        }
        if let Some(value) = non_empty_env("PIKTO_SECRET_KEY") {
            self.secret_key = Some(value);
        }
        Ok(())
    }

    /// Resolves the OAuth access key.
    ///
    /// # Errors
    /// Returns an error if neither the config file nor `PIKTO_ACCESS_KEY` provides one.
    pub fn resolved_access_key(&self) -> Result<String> {
        resolve_secret(self.access_key.as_deref(), "PIKTO_ACCESS_KEY", "access_key")
    }

    /// Resolves the OAuth secret key.
    ///
    /// # Errors
    /// Returns an error if neither the config file nor `PIKTO_SECRET_KEY` provides one.
    pub fn resolved_secret_key(&self) -> Result<String> {
        resolve_secret(self.secret_key.as_deref(), "PIKTO_SECRET_KEY", "secret_key")
    }

    /// Builds the user-facing authorization URL for the code grant.
    ///
    /// The user opens this in a browser, authorizes the app, and pastes the
    /// resulting code back (out-of-band redirect).
    pub fn build_authorize_url(&self) -> Result<String> {
        let access_key = self.resolved_access_key()?;
        let params = [
            ("client_id", access_key.as_str()),
            ("redirect_uri", &self.redirect_uri),
            ("response_type", "code"),
            ("scope", &self.access_scope),
        ];
        let query: String = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params)
            .finish();
        Ok(format!("{}/oauth/authorize?{query}", self.auth_base_url))
    }

    /// The token-exchange endpoint on the auth host.
    pub fn token_url(&self) -> String {
        format!("{}/oauth/token", self.auth_base_url)
    }
}

/// Returns the env var's value if set and non-empty.
fn non_empty_env(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        _ => None,
    }
}

/// Resolves a secret with precedence: config > env.
fn resolve_secret(config_value: Option<&str>, env_var: &str, config_key: &str) -> Result<String> {
    if let Some(value) = config_value {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }
    std::env::var(env_var).context(format!(
        "No OAuth {config_key} available. Set {env_var} or {config_key} in config.toml."
    ))
}

/// Validates that a URL is well-formed.
fn validate_url(url: &str, label: &str) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("Invalid {label} base URL: {url}"))?;
    Ok(())
}

pub mod paths {
    //! Path resolution for pikto configuration and data directories.
    //!
    //! PIKTO_HOME resolution order:
    //! 1. PIKTO_HOME environment variable (if set)
    //! 2. ~/.config/pikto (default)

    use std::path::PathBuf;

    /// Returns the pikto home directory.
    ///
    /// Checks PIKTO_HOME env var first, falls back to ~/.config/pikto.
    ///
    /// # Panics
    /// Panics if the home directory cannot be determined.
    pub fn pikto_home() -> PathBuf {
        if let Ok(home) = std::env::var("PIKTO_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("pikto"))
            .expect("Could not determine home directory")
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        pikto_home().join("config.toml")
    }

    /// Returns the directory for log files.
    pub fn logs_dir() -> PathBuf {
        pikto_home().join("logs")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.auth_base_url, DEFAULT_AUTH_BASE_URL);
        assert_eq!(config.redirect_uri, DEFAULT_REDIRECT_URI);
        assert!(config.access_key.is_none());
    }

    #[test]
    fn test_parse_partial_config() {
        let config: Config = toml::from_str(
            r#"
            access_key = "ak-123"
            api_base_url = "https://example.test"
            "#,
        )
        .unwrap();
        assert_eq!(config.access_key.as_deref(), Some("ak-123"));
        assert_eq!(config.api_base_url, "https://example.test");
        // Unspecified fields keep their defaults.
        assert_eq!(config.access_scope, DEFAULT_ACCESS_SCOPE);
    }

    #[test]
    fn test_authorize_url_format() {
        let config = Config {
            access_key: Some("ak-123".to_string()),
            ..Config::default()
        };
        let url = config.build_authorize_url().unwrap();
        assert!(url.starts_with("https://unsplash.com/oauth/authorize?"));
        assert!(url.contains("client_id=ak-123"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("redirect_uri="));
    }

    #[test]
    fn test_missing_access_key_is_an_error() {
        let config = Config::default();
        if std::env::var("PIKTO_ACCESS_KEY").is_ok() {
            return; // environment already provides one; nothing to assert
        }
        assert!(config.resolved_access_key().is_err());
    }
}
