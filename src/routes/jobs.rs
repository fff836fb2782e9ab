use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

use crate::core::Session;
use crate::models::{ErrorResponse, JobActionRequest, JobId, JobsResponse, MatchRequest};
use crate::routes::{sync_error_response, validation_error, AppState};
use crate::services::CacheKey;
use std::sync::Arc;

/// Configure job listing, scoring and job mutation routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/jobs", web::get().to(list_jobs))
        .route("/jobs/{id}", web::get().to(get_job))
        .route("/jobs/{id}/match", web::post().to(match_job))
        .route("/jobs/{id}/save", web::post().to(save_job))
        .route("/jobs/{id}/apply", web::post().to(apply_job));
}

async fn list_jobs(state: web::Data<AppState>) -> impl Responder {
    let jobs = state.catalog.all().to_vec();
    HttpResponse::Ok().json(JobsResponse {
        total: jobs.len(),
        jobs,
    })
}

async fn get_job(state: web::Data<AppState>, path: web::Path<JobId>) -> impl Responder {
    let id = path.into_inner();
    match state.catalog.get(id) {
        Some(job) => HttpResponse::Ok().json(job),
        None => job_not_found(id),
    }
}

/// Score a job against the caller's profile
///
/// POST /api/v1/jobs/{id}/match
///
/// Request body:
/// ```json
/// { "userId": "string" }
/// ```
///
/// Without a live session the profile summary is empty and the scorer
/// answers with the login prompt. Only model-produced results are cached.
async fn match_job(
    state: web::Data<AppState>,
    path: web::Path<JobId>,
    body: Option<web::Json<MatchRequest>>,
) -> impl Responder {
    let id = path.into_inner();
    let Some(job) = state.catalog.get(id) else {
        return job_not_found(id);
    };

    let user_id = body.and_then(|b| b.into_inner().user_id);
    let summary = match &user_id {
        Some(user_id) => match state.sessions.get(user_id).await {
            Some(session) => session.profile_summary().await,
            None => String::new(),
        },
        None => String::new(),
    };

    let cache_key = (!summary.is_empty())
        .then(|| CacheKey::match_result(&CacheKey::profile_digest(&summary), id));

    if let Some(key) = &cache_key {
        if let Ok(cached) = state.cache.get::<crate::models::MatchResult>(key).await {
            tracing::debug!("Match cache hit for job {}", id);
            return HttpResponse::Ok().json(cached);
        }
    }

    let result = state.scorer.score(&summary, &job.description).await;

    if let Some(key) = &cache_key {
        if result.is_from_model() {
            if let Err(e) = state.cache.set(key, &result).await {
                tracing::warn!("Failed to cache match result: {}", e);
            }
        }
    }

    tracing::info!(
        "Scored job {} for {}: {}",
        id,
        user_id.as_deref().unwrap_or("anonymous"),
        result.score
    );

    HttpResponse::Ok().json(result)
}

/// Toggle a job in the caller's saved list
async fn save_job(
    state: web::Data<AppState>,
    path: web::Path<JobId>,
    req: web::Json<JobActionRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }
    let id = path.into_inner();

    let session = match live_session(&state, &req.user_id).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    match state.controller.toggle_saved(&session, id).await {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(e) => {
            tracing::info!("Save of job {} rejected for {}: {}", id, req.user_id, e);
            sync_error_response(&e)
        }
    }
}

/// Record an application for the caller
async fn apply_job(
    state: web::Data<AppState>,
    path: web::Path<JobId>,
    req: web::Json<JobActionRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }
    let id = path.into_inner();

    let session = match live_session(&state, &req.user_id).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    match state.controller.apply(&session, id).await {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(e) => {
            tracing::info!("Application to job {} rejected for {}: {}", id, req.user_id, e);
            sync_error_response(&e)
        }
    }
}

/// Look up the session for `user_id`; no session means not signed in
pub(crate) async fn live_session(
    state: &AppState,
    user_id: &str,
) -> Result<Arc<Session>, HttpResponse> {
    state
        .sessions
        .get(user_id)
        .await
        .ok_or_else(|| sync_error_response(&crate::core::SyncError::Unauthenticated))
}

fn job_not_found(id: JobId) -> HttpResponse {
    HttpResponse::NotFound().json(ErrorResponse {
        error: "not_found".to_string(),
        message: format!("Unknown job id: {}", id),
        status_code: 404,
    })
}
