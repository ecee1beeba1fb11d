//! CLI command handlers.

pub mod auth;
pub mod config;
pub mod photos;
pub mod profile;

use anyhow::{bail, Result};
use pikto_core::config::{paths, Config};
use pikto_core::session::{Services, SessionLifecycle, SessionStart};

/// Brings up an authenticated session or tells the user to log in.
pub async fn require_session(config: &Config) -> Result<(SessionLifecycle, Services)> {
    let session = SessionLifecycle::new(config.clone(), paths::pikto_home());
    match session.start().await? {
        SessionStart::Authenticated(services) => Ok((session, services)),
        SessionStart::NeedsLogin => bail!("not logged in. Run `pikto login` first."),
    }
}
