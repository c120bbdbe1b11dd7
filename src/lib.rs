//! Nearby Contacts - radius search and batch geocoding for CRM contacts
//!
//! This library provides the search engine behind the "contacts near me" view
//! and the batch job that backfills coordinates for contacts that lack them.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{
    distance::distance_miles, BatchGeocodeController, NearbyService, RadiusSearchEngine,
    SearchHistoryStore,
};
pub use crate::models::{BatchProgress, BatchState, Contact, Coordinate, EnrichedContact, SearchHistoryEntry};
