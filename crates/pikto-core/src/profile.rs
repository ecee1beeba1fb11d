//! Signed-in user profile and avatar lookup.
//!
//! Profile data is fetched once per session and cached; the avatar URL is a
//! second, lazier lookup keyed by the cached profile's username.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::api::{ApiClient, ApiError, ApiErrorKind, ApiResult};

/// The signed-in user's profile as the rest of the crate sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    /// Account username (stable identifier).
    pub username: String,
    /// Display name; empty string when the account has none.
    pub name: String,
    /// Handle form of the username (`@username`).
    pub login_name: String,
    /// Bio text; empty string when the account has none.
    pub bio: String,
    /// Total number of photos the user has liked.
    pub total_likes: i64,
}

/// `/me` response body.
#[derive(Debug, Deserialize)]
struct ProfileResult {
    username: String,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    bio: Option<String>,
    #[serde(default)]
    total_likes: i64,
}

impl ProfileResult {
    fn into_profile(self) -> Profile {
        let name = [self.first_name, self.last_name]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        Profile {
            login_name: format!("@{}", self.username),
            username: self.username,
            name,
            bio: self.bio.unwrap_or_default(),
            total_likes: self.total_likes,
        }
    }
}

/// `/users/{username}` response body, reduced to the avatar renditions.
#[derive(Debug, Deserialize)]
struct UserResult {
    #[serde(default)]
    profile_image: Option<ProfileImageResult>,
}

#[derive(Debug, Deserialize)]
struct ProfileImageResult {
    #[serde(default)]
    medium: Option<String>,
}

/// Fetches and caches the signed-in user's profile and avatar.
#[derive(Debug)]
pub struct ProfileDirectory {
    api: ApiClient,
    profile: Mutex<Option<Profile>>,
    avatar: Mutex<Option<Url>>,
}

impl ProfileDirectory {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            profile: Mutex::new(None),
            avatar: Mutex::new(None),
        }
    }

    /// Returns the cached profile, if one has been fetched.
    pub fn cached_profile(&self) -> Option<Profile> {
        self.profile.lock().expect("profile lock poisoned").clone()
    }

    /// Returns the cached avatar URL, if one has been fetched.
    pub fn cached_avatar_url(&self) -> Option<Url> {
        self.avatar.lock().expect("avatar lock poisoned").clone()
    }

    /// Fetches the signed-in user's profile, hitting the network only once.
    pub async fn fetch_profile(&self) -> ApiResult<Profile> {
        if let Some(profile) = self.cached_profile() {
            return Ok(profile);
        }

        let result: ProfileResult = self.api.get_json("me", &[]).await?;
        let profile = result.into_profile();
        tracing::debug!(username = %profile.username, "profile loaded");

        let mut cached = self.profile.lock().expect("profile lock poisoned");
        // A concurrent fetch may have won; keep whichever landed first.
        Ok(cached.get_or_insert(profile).clone())
    }

    /// Fetches the avatar URL for the cached profile, hitting the network
    /// only once.
    ///
    /// # Panics
    /// Panics if no profile has been fetched yet. Callers fetch the profile
    /// at session start, before any avatar lookup.
    pub async fn fetch_avatar_url(&self) -> ApiResult<Url> {
        if let Some(url) = self.cached_avatar_url() {
            return Ok(url);
        }

        let username = self
            .cached_profile()
            .expect("avatar lookup requires a fetched profile")
            .username;

        let result: UserResult = self
            .api
            .get_json(&format!("users/{username}"), &[])
            .await?;
        let raw = result
            .profile_image
            .and_then(|img| img.medium)
            .ok_or_else(|| {
                ApiError::new(
                    ApiErrorKind::Decode,
                    "user record is missing a medium profile image",
                )
            })?;
        let url = Url::parse(&raw).map_err(|e| {
            ApiError::new(ApiErrorKind::Decode, format!("invalid avatar URL: {e}"))
        })?;

        let mut cached = self.avatar.lock().expect("avatar lock poisoned");
        Ok(cached.get_or_insert(url).clone())
    }

    /// Adjusts the cached profile's like total (applied after a successful
    /// like toggle). No-op when no profile is cached.
    pub fn apply_like_delta(&self, delta: i64) {
        let mut cached = self.profile.lock().expect("profile lock poisoned");
        if let Some(profile) = cached.as_mut() {
            profile.total_likes = (profile.total_likes + delta).max(0);
        }
    }

    /// Drops the cached profile and avatar (called on logout).
    pub fn reset(&self) {
        *self.profile.lock().expect("profile lock poisoned") = None;
        *self.avatar.lock().expect("avatar lock poisoned") = None;
    }
}
