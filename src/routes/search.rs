use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use validator::Validate;

use super::{error_response, AppState};
use crate::core::SearchError;
use crate::models::{
    HealthResponse, HistoryResponse, RefreshResponse, SearchQuery, SearchRequest, SearchResponse,
};

/// Configure search-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/search", web::post().to(search))
        .route("/history", web::get().to(history))
        .route("/contacts/refresh", web::post().to(refresh_contacts))
        .route("/contacts/debug", web::get().to(debug_contacts));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let status = if state.nearby.snapshot_loaded_at().await.is_some() {
        "healthy"
    } else {
        "starting"
    };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Radius search endpoint
///
/// POST /api/v1/search
///
/// Request body:
/// ```json
/// {
///   "address": "123 Main St, Philadelphia, PA",
///   "radiusMiles": 10,
///   "sortKey": "distance",
///   "name": "optional substring"
/// }
/// ```
async fn search(state: web::Data<AppState>, req: web::Json<SearchRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for search request: field_errors={:?}", errors);
        return error_response(StatusCode::BAD_REQUEST, "Validation failed", errors.to_string());
    }

    let req = req.into_inner();
    let query = SearchQuery {
        address: req.address,
        anchor: req.anchor,
        radius_miles: req.radius_miles,
        sort_key: req.sort_key,
        name_filter: req.name,
    };

    match state.nearby.run_search(&query).await {
        Ok(outcome) => HttpResponse::Ok().json(SearchResponse {
            anchor: outcome.anchor,
            total_results: outcome.contacts.len(),
            contacts: outcome.contacts,
            searched_contacts: outcome.searched,
        }),
        Err(e) => {
            tracing::error!("Search for '{}' failed: {}", query.address, e);
            search_error_response(&e)
        }
    }
}

/// Recent searches, most recent first
async fn history(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(HistoryResponse {
        entries: state.nearby.history().await,
    })
}

/// Reload the contact snapshot from the CRM
async fn refresh_contacts(state: web::Data<AppState>) -> impl Responder {
    match state.nearby.refresh_contacts().await {
        Ok(contacts) => HttpResponse::Ok().json(RefreshResponse {
            contacts: contacts.len(),
            loaded_at: state
                .nearby
                .snapshot_loaded_at()
                .await
                .unwrap_or_else(chrono::Utc::now),
        }),
        Err(e) => {
            tracing::error!("Contact refresh failed: {}", e);
            search_error_response(&e)
        }
    }
}

/// Cached contact list, 404 unless inspection is enabled
async fn debug_contacts(state: web::Data<AppState>) -> impl Responder {
    match state.nearby.debug_snapshot().await {
        Some(contacts) => HttpResponse::Ok().json(contacts.as_slice()),
        None => error_response(
            StatusCode::NOT_FOUND,
            "Not found",
            "contact inspection is disabled".to_string(),
        ),
    }
}

pub(crate) fn search_error_status(err: &SearchError) -> StatusCode {
    match err {
        SearchError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
        SearchError::UnresolvableAddress(_) => StatusCode::NOT_FOUND,
        SearchError::MissingCredential(_) => StatusCode::UNAUTHORIZED,
        SearchError::Transport(_) => StatusCode::BAD_GATEWAY,
    }
}

fn search_error_response(err: &SearchError) -> HttpResponse {
    let error = match err {
        SearchError::InvalidQuery(_) => "Invalid search",
        SearchError::UnresolvableAddress(_) => "Location not found",
        SearchError::MissingCredential(_) => "Please reconnect",
        SearchError::Transport(_) => "Upstream request failed",
    };
    error_response(search_error_status(err), error, err.to_string())
}
