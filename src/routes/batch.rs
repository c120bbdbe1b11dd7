use actix_web::{http::StatusCode, web, HttpResponse, Responder};

use super::{error_response, AppState};
use crate::core::BatchError;

/// Configure batch geocoding routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/batch/start", web::post().to(start))
        .route("/batch/pause", web::post().to(pause))
        .route("/batch/resume", web::post().to(resume))
        .route("/batch/status", web::get().to(status));
}

/// Start a fresh batch geocode in the background
async fn start(state: web::Data<AppState>) -> impl Responder {
    match state.batch.start().await {
        Ok(progress) => HttpResponse::Accepted().json(progress),
        Err(e) => batch_error_response(&e),
    }
}

/// Request a pause; takes effect before the next contact
async fn pause(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Accepted().json(state.batch.pause())
}

/// Continue a paused batch geocode
async fn resume(state: web::Data<AppState>) -> impl Responder {
    match state.batch.resume().await {
        Ok(progress) => HttpResponse::Accepted().json(progress),
        Err(e) => batch_error_response(&e),
    }
}

/// Current progress
async fn status(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.batch.progress())
}

fn batch_error_response(err: &BatchError) -> HttpResponse {
    tracing::warn!("Batch geocode request rejected: {}", err);
    match err {
        BatchError::AlreadyRunning => {
            error_response(StatusCode::CONFLICT, "Batch already running", err.to_string())
        }
        BatchError::MissingCredential(_) => {
            error_response(StatusCode::UNAUTHORIZED, "Please reconnect", err.to_string())
        }
        BatchError::Transport(_) => {
            error_response(StatusCode::BAD_GATEWAY, "Upstream request failed", err.to_string())
        }
    }
}
