//! Core pikto library: photo-service data access (auth, catalog, profile, session).

pub mod api;
pub mod catalog;
pub mod config;
pub mod events;
pub mod logging;
pub mod oauth;
pub mod photos;
pub mod profile;
pub mod session;
