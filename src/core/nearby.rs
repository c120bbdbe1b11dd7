use std::sync::Arc;

use thiserror::Error;

use crate::core::{
    history::SearchHistoryStore,
    search::{filter_by_name, RadiusSearchEngine},
    sorting::{SortKey, SortableField},
};
use crate::models::{Contact, Coordinate, EnrichedContact, SearchHistoryEntry, SearchQuery};
use crate::services::{ContactSnapshot, DirectoryError, GeocodeClient, GeocodeError};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid search: {0}")]
    InvalidQuery(String),

    #[error("location not found: {0}")]
    UnresolvableAddress(String),

    #[error("please reconnect: {0}")]
    MissingCredential(String),

    #[error("upstream request failed: {0}")]
    Transport(String),
}

impl From<DirectoryError> for SearchError {
    fn from(err: DirectoryError) -> Self {
        if err.is_credential_error() {
            Self::MissingCredential(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<GeocodeError> for SearchError {
    fn from(err: GeocodeError) -> Self {
        match err {
            GeocodeError::MissingCredential => Self::MissingCredential(err.to_string()),
            other => Self::Transport(other.to_string()),
        }
    }
}

/// Result of a radius search
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub anchor: Coordinate,
    pub contacts: Vec<EnrichedContact>,
    /// Size of the snapshot the search ran over
    pub searched: usize,
}

/// Search entry point used by the HTTP layer
pub struct NearbyService {
    engine: RadiusSearchEngine,
    geocoder: Arc<dyn GeocodeClient>,
    snapshot: Arc<ContactSnapshot>,
    history: Arc<SearchHistoryStore>,
    sortable: Vec<SortableField>,
    inspect_contacts: bool,
}

impl NearbyService {
    pub fn new(
        engine: RadiusSearchEngine,
        geocoder: Arc<dyn GeocodeClient>,
        snapshot: Arc<ContactSnapshot>,
        history: Arc<SearchHistoryStore>,
        sortable: Vec<SortableField>,
        inspect_contacts: bool,
    ) -> Self {
        Self {
            engine,
            geocoder,
            snapshot,
            history,
            sortable,
            inspect_contacts,
        }
    }

    /// Sort keys clients may pass, `distance` first
    pub fn sort_keys(&self) -> Vec<String> {
        std::iter::once(crate::core::sorting::DISTANCE_SORT_KEY.to_string())
            .chain(self.sortable.iter().map(|s| s.name.clone()))
            .collect()
    }

    /// Resolve the anchor, search the snapshot, and record the search.
    ///
    /// No partial result is returned when the anchor cannot be resolved.
    pub async fn run_search(&self, query: &SearchQuery) -> Result<SearchOutcome, SearchError> {
        if !query.radius_miles.is_finite() || query.radius_miles <= 0.0 {
            return Err(SearchError::InvalidQuery(format!(
                "radius must be positive, got {}",
                query.radius_miles
            )));
        }
        let sort_key = SortKey::resolve(&query.sort_key, &self.sortable).ok_or_else(|| {
            SearchError::InvalidQuery(format!(
                "unknown sort key '{}', expected one of: {}",
                query.sort_key,
                self.sort_keys().join(", ")
            ))
        })?;

        let anchor = self.resolve_anchor(query).await?;
        let contacts = self.snapshot.get().await?;

        let mut results = self
            .engine
            .search(&contacts, anchor, query.radius_miles, &sort_key);

        if let Some(name) = query.name_filter.as_deref() {
            results = filter_by_name(&results, name).into_iter().cloned().collect();
        }

        tracing::info!(
            "Search around ({:.4}, {:.4}) within {} mi returned {} of {} contacts",
            anchor.lat,
            anchor.lng,
            query.radius_miles,
            results.len(),
            contacts.len()
        );

        self.remember(query).await;

        Ok(SearchOutcome {
            anchor,
            contacts: results,
            searched: contacts.len(),
        })
    }

    /// Recent searches, most recent first
    pub async fn history(&self) -> Vec<SearchHistoryEntry> {
        self.history.list().await
    }

    /// Reload the contact snapshot from the CRM
    pub async fn refresh_contacts(&self) -> Result<Arc<Vec<Contact>>, SearchError> {
        Ok(self.snapshot.refresh().await?)
    }

    pub async fn snapshot_loaded_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.snapshot.loaded_at().await
    }

    /// The cached contact list, only when inspection is enabled in configuration
    pub async fn debug_snapshot(&self) -> Option<Arc<Vec<Contact>>> {
        if !self.inspect_contacts {
            return None;
        }
        Some(self.snapshot.peek().await.unwrap_or_default())
    }

    async fn resolve_anchor(&self, query: &SearchQuery) -> Result<Coordinate, SearchError> {
        if let Some(anchor) = query.anchor {
            return Coordinate::checked(anchor.lat, anchor.lng).ok_or_else(|| {
                SearchError::InvalidQuery(format!(
                    "anchor out of range: {}, {}",
                    anchor.lat, anchor.lng
                ))
            });
        }

        let address = query.address.trim();
        if address.is_empty() {
            return Err(SearchError::InvalidQuery("address is required".into()));
        }

        self.geocoder
            .geocode(address)
            .await?
            .ok_or_else(|| SearchError::UnresolvableAddress(address.to_string()))
    }

    /// History failures are logged, never surfaced to the search caller
    async fn remember(&self, query: &SearchQuery) {
        let address = match (query.address.trim(), query.anchor) {
            ("", Some(anchor)) => format!("{:.6}, {:.6}", anchor.lat, anchor.lng),
            (address, _) => address.to_string(),
        };

        let entry = SearchHistoryEntry {
            address,
            radius_miles: query.radius_miles,
            sort_key: query.sort_key.clone(),
            timestamp: chrono::Utc::now().timestamp(),
        };

        if let Err(e) = self.history.record(entry).await {
            tracing::warn!("Failed to record search history: {}", e);
        }
    }
}
