// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    BatchProgress, BatchState, Contact, Coordinate, CustomField, EnrichedContact,
    SearchHistoryEntry, SearchQuery,
};
pub use requests::SearchRequest;
pub use responses::{ErrorResponse, HealthResponse, HistoryResponse, RefreshResponse, SearchResponse};
