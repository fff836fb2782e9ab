use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use validator::Validate;

use crate::core::{summarize, AvatarUpload};
use crate::models::{OpenSessionRequest, ProfilePatch, ProfileResponse, UpdateProfileRequest};
use crate::routes::jobs::live_session;
use crate::routes::{sync_error_response, validation_error, AppState};

/// Configure session and profile routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/sessions", web::post().to(open_session))
        .route("/sessions/{user_id}", web::delete().to(close_session))
        .route("/profile/{user_id}", web::get().to(get_profile))
        .route("/profile/{user_id}", web::patch().to(update_profile))
        .route(
            "/profile/{user_id}/avatar/{file_name}",
            web::put().to(upload_avatar),
        );
}

#[derive(Debug, Deserialize)]
struct AvatarPath {
    user_id: String,
    file_name: String,
}

/// Sign in: load the profile for the identity, creating it on first login
///
/// POST /api/v1/sessions
///
/// Request body:
/// ```json
/// { "userId": "string", "email": "string" }
/// ```
async fn open_session(
    state: web::Data<AppState>,
    req: web::Json<OpenSessionRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    match state
        .sessions
        .open(state.store.as_ref(), &req.user_id, &req.email)
        .await
    {
        Ok((_, profile)) => {
            tracing::info!("Opened session for {}", req.user_id);
            HttpResponse::Ok().json(profile_response(&state, profile))
        }
        Err(e) => {
            tracing::error!("Failed to open session for {}: {}", req.user_id, e);
            sync_error_response(&e)
        }
    }
}

async fn close_session(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let user_id = path.into_inner();
    if state.sessions.close(&user_id).await {
        tracing::info!("Closed session for {}", user_id);
    }
    HttpResponse::NoContent().finish()
}

async fn get_profile(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let user_id = path.into_inner();
    let session = match live_session(&state, &user_id).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    match session.profile().await {
        Some(profile) => HttpResponse::Ok().json(profile_response(&state, profile)),
        None => sync_error_response(&crate::core::SyncError::ProfileNotLoaded),
    }
}

/// Save edited profile fields
async fn update_profile(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: web::Json<UpdateProfileRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }
    let user_id = path.into_inner();
    let session = match live_session(&state, &user_id).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    let patch = ProfilePatch::from(req.into_inner());
    match state.controller.update_profile(&session, patch, None).await {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(e) => sync_error_response(&e),
    }
}

/// Upload a new avatar image; the body is the raw file
async fn upload_avatar(
    state: web::Data<AppState>,
    path: web::Path<AvatarPath>,
    body: web::Bytes,
) -> impl Responder {
    let AvatarPath { user_id, file_name } = path.into_inner();
    let session = match live_session(&state, &user_id).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    tracing::debug!("Avatar upload for {}: {} ({} bytes)", user_id, file_name, body.len());

    let avatar = AvatarUpload {
        file_name,
        bytes: body.to_vec(),
    };
    match state
        .controller
        .update_profile(&session, ProfilePatch::default(), Some(avatar))
        .await
    {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(e) => sync_error_response(&e),
    }
}

fn profile_response(state: &AppState, profile: crate::models::UserProfile) -> ProfileResponse {
    ProfileResponse {
        summary: summarize(&profile),
        saved_jobs: state.catalog.select(&profile.saved_job_ids),
        applied_jobs: state.catalog.select(&profile.applied_job_ids),
        profile,
    }
}
