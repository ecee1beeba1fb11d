//! Show the signed-in user's profile.

use anyhow::Result;
use pikto_core::config::Config;

use super::require_session;

pub async fn run(config: &Config, json: bool) -> Result<()> {
    let (_session, services) = require_session(config).await?;
    let profile = &services.profile;

    if json {
        println!("{}", serde_json::to_string_pretty(profile)?);
        return Ok(());
    }

    println!("{}", profile.login_name);
    if !profile.name.is_empty() {
        println!("{}", profile.name);
    }
    if !profile.bio.is_empty() {
        println!("{}", profile.bio);
    }
    println!("likes: {}", profile.total_likes);

    match services.profiles.fetch_avatar_url().await {
        Ok(url) => println!("avatar: {url}"),
        Err(err) => tracing::warn!(%err, "could not fetch avatar"),
    }
    Ok(())
}
