// Route exports
pub mod jobs;
pub mod profile;

use crate::core::{JobCatalog, MutationController, RelevanceScorer, SessionRegistry, SyncError};
use crate::models::{ErrorResponse, HealthResponse};
use crate::services::{CacheManager, ProfileStore};
use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ProfileStore>,
    pub catalog: Arc<JobCatalog>,
    pub controller: Arc<MutationController>,
    pub scorer: Arc<RelevanceScorer>,
    pub sessions: SessionRegistry,
    pub cache: Arc<CacheManager>,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(health_check))
            .configure(jobs::configure)
            .configure(profile::configure),
    );
}

/// Health check endpoint
///
/// Reports `degraded` when a configured Redis tier is unreachable.
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let status = match state.cache.ping().await {
        Some(false) => "degraded",
        _ => "healthy",
    };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Render a [`SyncError`] with the status code the UI expects
pub fn sync_error_response(err: &SyncError) -> HttpResponse {
    let (mut builder, error, status_code) = match err {
        SyncError::Unauthenticated => (HttpResponse::Unauthorized(), "unauthenticated", 401),
        SyncError::PermissionDenied(_) => (HttpResponse::Forbidden(), "permission_denied", 403),
        SyncError::TransientRemoteFailure(_) => {
            (HttpResponse::ServiceUnavailable(), "remote_unavailable", 503)
        }
        SyncError::NotFound(_) | SyncError::UnknownJob(_) => {
            (HttpResponse::NotFound(), "not_found", 404)
        }
        SyncError::MutationInFlight(_) => (HttpResponse::Conflict(), "mutation_in_flight", 409),
        SyncError::ProfileNotLoaded => (HttpResponse::Conflict(), "profile_not_loaded", 409),
    };

    builder.json(ErrorResponse {
        error: error.to_string(),
        message: err.to_string(),
        status_code,
    })
}

pub(crate) fn validation_error(errors: validator::ValidationErrors) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "Validation failed".to_string(),
        message: errors.to_string(),
        status_code: 400,
    })
}
