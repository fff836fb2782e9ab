use crate::models::{JobId, ListField, ProfilePatch, UserProfile};
use crate::services::store::{asset_path, ProfileStore, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-process profile store for local runs and tests
#[derive(Default)]
pub struct InMemoryStore {
    documents: RwLock<HashMap<String, UserProfile>>,
    assets: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document, replacing any existing one
    pub async fn insert(&self, profile: UserProfile) {
        self.documents
            .write()
            .await
            .insert(profile.user_id.clone(), profile);
    }

    pub async fn asset(&self, path: &str) -> Option<Vec<u8>> {
        self.assets.read().await.get(path).cloned()
    }

    async fn with_document<F>(&self, user_id: &str, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut UserProfile),
    {
        let mut documents = self.documents.write().await;
        let profile = documents
            .get_mut(user_id)
            .ok_or_else(|| StoreError::NotFound(format!("users/{}", user_id)))?;
        f(profile);
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for InMemoryStore {
    async fn fetch(&self, user_id: &str) -> Result<UserProfile, StoreError> {
        self.documents
            .read()
            .await
            .get(user_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("users/{}", user_id)))
    }

    async fn create_default(
        &self,
        user_id: &str,
        seed_email: &str,
    ) -> Result<UserProfile, StoreError> {
        let mut documents = self.documents.write().await;
        let profile = documents
            .entry(user_id.to_string())
            .or_insert_with(|| UserProfile::new_default(user_id, seed_email));
        Ok(profile.clone())
    }

    async fn patch_fields(&self, user_id: &str, patch: &ProfilePatch) -> Result<(), StoreError> {
        self.with_document(user_id, |profile| profile.merge(patch)).await
    }

    async fn union_field(
        &self,
        user_id: &str,
        field: ListField,
        job_id: JobId,
    ) -> Result<(), StoreError> {
        self.with_document(user_id, |profile| {
            profile.list_mut(field).insert(job_id);
        })
        .await
    }

    async fn remove_field(
        &self,
        user_id: &str,
        field: ListField,
        job_id: JobId,
    ) -> Result<(), StoreError> {
        self.with_document(user_id, |profile| {
            profile.list_mut(field).remove(&job_id);
        })
        .await
    }

    async fn upload_asset(
        &self,
        user_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StoreError> {
        let path = asset_path(user_id, file_name);
        self.assets.write().await.insert(path.clone(), bytes);
        Ok(format!("memory://{}", path))
    }
}
