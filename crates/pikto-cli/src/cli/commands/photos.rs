//! Feed and likes browsing, and like toggling.

use anyhow::Result;
use pikto_core::catalog::{Collection, FetchOutcome};
use pikto_core::config::Config;

use super::require_session;

pub async fn browse(config: &Config, collection: Collection, pages: u32, json: bool) -> Result<()> {
    let (_session, services) = require_session(config).await?;

    for _ in 0..pages {
        match services.catalog.fetch_next_page(collection).await? {
            FetchOutcome::Appended { page, appended } => {
                tracing::debug!(%collection, page, appended, "page loaded");
            }
            FetchOutcome::EndOfFeed => break,
            // Single-threaded dispatch never overlaps fetches or logs out
            // mid-fetch.
            FetchOutcome::AlreadyInFlight | FetchOutcome::Superseded => break,
        }
    }

    let photos = services.catalog.photos(collection);
    if json {
        println!("{}", serde_json::to_string_pretty(&photos)?);
        return Ok(());
    }

    for photo in &photos {
        let liked = if photo.is_liked { "liked" } else { "     " };
        let description = photo.description.as_deref().unwrap_or("");
        println!(
            "{:<14} {:>5}x{:<5} {} {}",
            photo.id, photo.size.width, photo.size.height, liked, description
        );
    }
    println!("{} photos in {collection}", photos.len());
    Ok(())
}

pub async fn toggle(config: &Config, id: &str, like: bool) -> Result<()> {
    let (_session, services) = require_session(config).await?;

    let updated = services.catalog.toggle_like(id, like).await?;
    services.profiles.apply_like_delta(if like { 1 } else { -1 });

    if updated.is_liked {
        println!("Liked photo {id}");
    } else {
        println!("Removed like from photo {id}");
    }
    Ok(())
}
