use crate::models::JobId;
use crate::services::StoreError;
use serde::Serialize;
use thiserror::Error;

/// Failures surfaced to callers of the session and mutation layer
///
/// Remote errors are converted at the component boundary; nothing below
/// this type reaches the UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum SyncError {
    #[error("Not signed in")]
    Unauthenticated,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Remote store unavailable: {0}")]
    TransientRemoteFailure(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unknown job id: {0}")]
    UnknownJob(JobId),

    #[error("Profile not loaded for the current session")]
    ProfileNotLoaded,

    #[error("Mutation already in flight: {0}")]
    MutationInFlight(String),
}

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => SyncError::NotFound(what),
            StoreError::PermissionDenied(what) => SyncError::PermissionDenied(what),
            other => SyncError::TransientRemoteFailure(other.to_string()),
        }
    }
}
