//! Paginated photo collections and like-state mutation.
//!
//! The catalog owns two independently paginated collections (the editorial
//! feed and the user's liked photos), applies like toggles to every
//! collection holding the photo, and publishes change events through an
//! [`EventHub`]. All shared state sits behind `std::sync::Mutex` and is
//! never held across an await: each operation snapshots what it needs,
//! performs the network call, then re-locks and validates that the world
//! has not moved on (logout bumps an epoch, newer toggles bump a sequence).

use std::sync::Mutex;

use crate::api::{ApiClient, ApiError, ApiResult};
use crate::events::{CatalogEvent, CatalogEventRx, EventHub};
use crate::photos::{LikeResponse, Photo, PhotoRecord};

use serde::{Deserialize, Serialize};

/// Photos requested per page.
pub const PHOTOS_PER_PAGE: u32 = 10;

/// The two photo collections the catalog maintains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    /// The editorial photo feed.
    Feed,
    /// Photos liked by the signed-in user.
    Likes,
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Collection::Feed => write!(f, "feed"),
            Collection::Likes => write!(f, "likes"),
        }
    }
}

/// Result of a [`PhotoCatalog::fetch_next_page`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A page was fetched and appended.
    Appended { page: u32, appended: usize },
    /// A fetch for this collection was already in flight; nothing was done.
    AlreadyInFlight,
    /// The collection is exhausted (the service returned an empty page).
    EndOfFeed,
    /// The collection was cleared while the fetch was in flight; the
    /// fetched page was discarded.
    Superseded,
}

#[derive(Debug, Default)]
struct CollectionState {
    items: Vec<Photo>,
    last_loaded_page: Option<u32>,
    in_flight: bool,
    exhausted: bool,
}

impl CollectionState {
    fn next_page(&self) -> u32 {
        self.last_loaded_page.map_or(1, |p| p + 1)
    }
}

#[derive(Debug, Default)]
struct CatalogInner {
    feed: CollectionState,
    likes: CollectionState,
    /// Bumped by `clear()`; in-flight completions from an older epoch are
    /// discarded.
    epoch: u64,
    /// Bumped by each like toggle; an older toggle's completion loses to a
    /// newer one.
    toggle_seq: u64,
}

impl CatalogInner {
    fn state_mut(&mut self, collection: Collection) -> &mut CollectionState {
        match collection {
            Collection::Feed => &mut self.feed,
            Collection::Likes => &mut self.likes,
        }
    }
}

/// Paginated photo store for the signed-in user.
#[derive(Debug)]
pub struct PhotoCatalog {
    api: ApiClient,
    username: Mutex<Option<String>>,
    inner: Mutex<CatalogInner>,
    events: EventHub,
}

impl PhotoCatalog {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            username: Mutex::new(None),
            inner: Mutex::new(CatalogInner::default()),
            events: EventHub::new(),
        }
    }

    /// Sets the username whose liked photos back the likes collection.
    pub fn set_username(&self, username: impl Into<String>) {
        *self.username.lock().expect("username lock poisoned") = Some(username.into());
    }

    /// Registers a subscriber for catalog change events.
    pub fn subscribe(&self) -> CatalogEventRx {
        self.events.subscribe()
    }

    /// Snapshot of a collection's photos in load order.
    pub fn photos(&self, collection: Collection) -> Vec<Photo> {
        let mut inner = self.inner.lock().expect("catalog lock poisoned");
        inner.state_mut(collection).items.clone()
    }

    /// Number of photos currently loaded in a collection.
    pub fn count(&self, collection: Collection) -> usize {
        let mut inner = self.inner.lock().expect("catalog lock poisoned");
        inner.state_mut(collection).items.len()
    }

    /// The last page successfully loaded for a collection, if any.
    pub fn last_loaded_page(&self, collection: Collection) -> Option<u32> {
        let mut inner = self.inner.lock().expect("catalog lock poisoned");
        inner.state_mut(collection).last_loaded_page
    }

    /// Fetches the next page of `collection` and appends it.
    ///
    /// At most one fetch per collection runs at a time; a call while one is
    /// in flight is a no-op returning [`FetchOutcome::AlreadyInFlight`]. An
    /// empty page marks the collection exhausted, after which calls return
    /// [`FetchOutcome::EndOfFeed`] without touching the network. If the
    /// catalog is cleared mid-flight the fetched page is discarded and
    /// [`FetchOutcome::Superseded`] is returned.
    ///
    /// The returned future must be polled to completion: dropping it
    /// mid-flight leaves the collection marked in-flight until [`clear`]
    /// resets it. Do not wrap this call in a timeout.
    ///
    /// [`clear`]: PhotoCatalog::clear
    ///
    /// # Panics
    /// Panics if `collection` is [`Collection::Likes`] and no username has
    /// been set. Callers establish the username at session start.
    pub async fn fetch_next_page(&self, collection: Collection) -> ApiResult<FetchOutcome> {
        let path = self.collection_path(collection);

        let (page, epoch) = {
            let mut inner = self.inner.lock().expect("catalog lock poisoned");
            let state = inner.state_mut(collection);
            if state.in_flight {
                return Ok(FetchOutcome::AlreadyInFlight);
            }
            if state.exhausted {
                return Ok(FetchOutcome::EndOfFeed);
            }
            state.in_flight = true;
            (state.next_page(), inner.epoch)
        };

        tracing::debug!(%collection, page, "fetching page");
        let result: ApiResult<Vec<PhotoRecord>> = self
            .api
            .get_json(
                &path,
                &[
                    ("page", page.to_string()),
                    ("per_page", PHOTOS_PER_PAGE.to_string()),
                ],
            )
            .await;

        let (previous_count, new_count) = {
            let mut inner = self.inner.lock().expect("catalog lock poisoned");
            if inner.epoch != epoch {
                // Cleared mid-flight. The state was reset (and may already be
                // owned by a newer fetch), so leave it alone.
                return Ok(FetchOutcome::Superseded);
            }
            let state = inner.state_mut(collection);
            state.in_flight = false;

            let records = result?;
            state.last_loaded_page = Some(page);
            if records.is_empty() {
                state.exhausted = true;
                tracing::debug!(%collection, page, "collection exhausted");
                return Ok(FetchOutcome::EndOfFeed);
            }

            let previous_count = state.items.len();
            state.items.extend(records.into_iter().map(PhotoRecord::into_photo));
            (previous_count, state.items.len())
        };

        self.events.publish(CatalogEvent::PhotosAppended {
            collection,
            previous_count,
            new_count,
        });
        Ok(FetchOutcome::Appended {
            page,
            appended: new_count - previous_count,
        })
    }

    /// Sets or clears the like on a photo and updates every collection
    /// containing it.
    ///
    /// Newest wins: if another toggle starts before this one completes, or
    /// the catalog is cleared mid-flight, the stale completion is discarded
    /// with a `Cancelled` error. On success returns the photo as the service
    /// now sees it, whether or not any collection contained it.
    pub async fn toggle_like(&self, photo_id: &str, like: bool) -> ApiResult<Photo> {
        let (my_seq, epoch) = {
            let mut inner = self.inner.lock().expect("catalog lock poisoned");
            inner.toggle_seq += 1;
            (inner.toggle_seq, inner.epoch)
        };

        let path = format!("photos/{photo_id}/like");
        tracing::debug!(photo_id, like, "toggling like");
        let response: LikeResponse = if like {
            self.api.post_json(&path).await?
        } else {
            self.api.delete_json(&path).await?
        };
        let updated = response.photo.into_photo();

        let touched: Vec<Collection> = {
            let mut inner = self.inner.lock().expect("catalog lock poisoned");
            if inner.epoch != epoch {
                return Err(ApiError::cancelled("like toggle discarded by logout"));
            }
            if inner.toggle_seq != my_seq {
                return Err(ApiError::cancelled(
                    "like toggle superseded by a newer toggle",
                ));
            }

            [Collection::Feed, Collection::Likes]
                .into_iter()
                .filter(|&collection| {
                    let state = inner.state_mut(collection);
                    let mut hit = false;
                    for item in &mut state.items {
                        if item.id == photo_id {
                            *item = updated.clone();
                            hit = true;
                        }
                    }
                    hit
                })
                .collect()
        };

        for collection in touched {
            self.events.publish(CatalogEvent::LikeChanged {
                collection,
                photo: updated.clone(),
            });
        }
        Ok(updated)
    }

    /// Empties both collections and resets pagination.
    ///
    /// In-flight fetches and toggles from before the clear are discarded
    /// when they complete. Publishes [`CatalogEvent::Cleared`].
    pub fn clear(&self) {
        {
            let mut inner = self.inner.lock().expect("catalog lock poisoned");
            inner.epoch += 1;
            inner.feed = CollectionState::default();
            inner.likes = CollectionState::default();
        }
        *self.username.lock().expect("username lock poisoned") = None;
        self.events.publish(CatalogEvent::Cleared);
    }

    fn collection_path(&self, collection: Collection) -> String {
        match collection {
            Collection::Feed => "photos".to_string(),
            Collection::Likes => {
                let username = self.username.lock().expect("username lock poisoned");
                let username = username
                    .as_deref()
                    .expect("likes collection requires a username; set it at session start");
                format!("users/{username}/likes")
            }
        }
    }
}
