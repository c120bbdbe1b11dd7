use serde::{Deserialize, Serialize};
use crate::models::domain::{Coordinate, EnrichedContact, SearchHistoryEntry};

/// Response for the search endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub anchor: Coordinate,
    pub contacts: Vec<EnrichedContact>,
    pub total_results: usize,
    pub searched_contacts: usize,
}

/// Response for the history endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub entries: Vec<SearchHistoryEntry>,
}

/// Response for a contact snapshot refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub contacts: usize,
    pub loaded_at: chrono::DateTime<chrono::Utc>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
