use crate::models::{JobId, ListField, ProfilePatch, UserProfile};
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when talking to the profile store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Document already exists: {0}")]
    Conflict(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Remote document store holding one profile document per user.
///
/// Implementations must keep list mutations element-scoped: `union_field`
/// and `remove_field` touch a single element of a single field and never
/// rewrite the document, and `patch_fields` writes only the fields present
/// in the patch.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fetch the profile document, `StoreError::NotFound` if absent
    async fn fetch(&self, user_id: &str) -> Result<UserProfile, StoreError>;

    /// Create the default document unless one already exists.
    ///
    /// A racing create must return the existing document instead of
    /// overwriting it.
    async fn create_default(&self, user_id: &str, seed_email: &str)
        -> Result<UserProfile, StoreError>;

    async fn patch_fields(&self, user_id: &str, patch: &ProfilePatch) -> Result<(), StoreError>;

    async fn union_field(
        &self,
        user_id: &str,
        field: ListField,
        job_id: JobId,
    ) -> Result<(), StoreError>;

    async fn remove_field(
        &self,
        user_id: &str,
        field: ListField,
        job_id: JobId,
    ) -> Result<(), StoreError>;

    /// Store an asset under the user's folder and return its download URL
    async fn upload_asset(
        &self,
        user_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StoreError>;

    /// First-login path: a missing document is created rather than reported
    async fn fetch_or_create(
        &self,
        user_id: &str,
        seed_email: &str,
    ) -> Result<UserProfile, StoreError> {
        match self.fetch(user_id).await {
            Err(StoreError::NotFound(_)) => {
                tracing::info!("No profile for {}, creating default document", user_id);
                self.create_default(user_id, seed_email).await
            }
            other => other,
        }
    }
}

/// Storage path of a user's asset
pub fn asset_path(user_id: &str, file_name: &str) -> String {
    format!("avatars/{}/{}", user_id, file_name)
}
