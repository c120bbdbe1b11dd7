// Route exports
pub mod batch;
pub mod search;

use actix_web::{http::StatusCode, web, HttpResponse};
use std::sync::Arc;

use crate::core::{BatchGeocodeController, NearbyService};
use crate::models::ErrorResponse;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub nearby: Arc<NearbyService>,
    pub batch: Arc<BatchGeocodeController>,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(search::configure)
            .configure(batch::configure),
    );
}

/// JSON error body with a matching status code
pub(crate) fn error_response(status: StatusCode, error: &str, message: String) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message,
        status_code: status.as_u16(),
    })
}
