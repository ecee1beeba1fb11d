//! Photo domain types and the wire records they are decoded from.
//!
//! Wire records (`PhotoRecord`, `LikeResponse`) mirror the photo-service JSON
//! exactly; the domain `Photo` is what the rest of the crate works with.
//! Conversion is lenient: an unparseable URL or timestamp degrades to `None`
//! rather than failing the whole page.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Pixel dimensions of a photo as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoSize {
    pub width: u32,
    pub height: u32,
}

/// A photo as the rest of the crate sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Photo {
    /// Service-assigned opaque identifier.
    pub id: String,
    pub size: PhotoSize,
    /// Creation timestamp; `None` when missing or unparseable.
    pub created_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    /// Thumbnail rendition URL; `None` when missing or unparseable.
    pub thumb_url: Option<Url>,
    /// Full-size rendition URL; `None` when missing or unparseable.
    pub full_url: Option<Url>,
    /// Whether the current user has liked this photo.
    pub is_liked: bool,
}

impl Photo {
    /// Returns a copy of this photo with `is_liked` set to `liked`.
    ///
    /// All other fields are carried over unchanged.
    pub fn with_liked(&self, liked: bool) -> Self {
        Self {
            is_liked: liked,
            ..self.clone()
        }
    }
}

/// URL renditions block of a wire photo record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlsRecord {
    #[serde(default)]
    pub thumb: Option<String>,
    #[serde(default)]
    pub full: Option<String>,
}

/// A photo exactly as the service serializes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub id: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub urls: Option<UrlsRecord>,
    #[serde(default)]
    pub liked_by_user: bool,
}

impl PhotoRecord {
    /// Converts a wire record into a domain photo.
    ///
    /// Malformed URLs and timestamps become `None`; only the `id` and
    /// dimensions are load-bearing for a record to be usable at all.
    pub fn into_photo(self) -> Photo {
        let (thumb_url, full_url) = match self.urls {
            Some(urls) => (
                urls.thumb.as_deref().and_then(parse_url),
                urls.full.as_deref().and_then(parse_url),
            ),
            None => (None, None),
        };
        let created_at = self
            .created_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Photo {
            id: self.id,
            size: PhotoSize {
                width: self.width,
                height: self.height,
            },
            created_at,
            description: self.description,
            thumb_url,
            full_url,
            is_liked: self.liked_by_user,
        }
    }
}

fn parse_url(raw: &str) -> Option<Url> {
    match Url::parse(raw) {
        Ok(url) => Some(url),
        Err(err) => {
            tracing::debug!(raw, %err, "discarding unparseable photo URL");
            None
        }
    }
}

/// Response body of the like/unlike endpoints.
///
/// The service returns the updated photo nested under `photo`.
#[derive(Debug, Clone, Deserialize)]
pub struct LikeResponse {
    pub photo: PhotoRecord,
}
