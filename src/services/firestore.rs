use crate::models::{JobId, ListField, ProfilePatch, UserProfile};
use crate::services::codec;
use crate::services::store::{asset_path, ProfileStore, StoreError};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// Firestore + Firebase Storage client
///
/// Handles all communication with the remote profile store:
/// - Fetching and lazily creating `users/{userId}` documents
/// - Field-masked profile patches
/// - Element-level union/remove on the saved/applied job lists
/// - Avatar uploads to the storage bucket
pub struct FirestoreClient {
    base_url: String,
    storage_url: String,
    project_id: String,
    database_id: String,
    collection: String,
    bucket: String,
    api_key: String,
    access_token: Option<String>,
    client: Client,
}

/// Connection parameters for [`FirestoreClient`]
#[derive(Debug, Clone)]
pub struct FirestoreOptions {
    pub base_url: String,
    pub storage_url: String,
    pub project_id: String,
    pub database_id: String,
    pub collection: String,
    pub bucket: String,
    pub api_key: String,
    pub access_token: Option<String>,
    pub timeout_secs: u64,
}

impl FirestoreClient {
    /// Create a new Firestore client
    pub fn new(options: FirestoreOptions) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_secs))
            .build()?;

        Ok(Self {
            base_url: options.base_url,
            storage_url: options.storage_url,
            project_id: options.project_id,
            database_id: options.database_id,
            collection: options.collection,
            bucket: options.bucket,
            api_key: options.api_key,
            access_token: options.access_token,
            client,
        })
    }

    /// `projects/{p}/databases/{d}/documents`
    fn documents_root(&self) -> String {
        format!(
            "projects/{}/databases/{}/documents",
            self.project_id, self.database_id
        )
    }

    /// Full resource name of a user document, as used inside request bodies
    fn document_name(&self, user_id: &str) -> String {
        format!("{}/{}/{}", self.documents_root(), self.collection, user_id)
    }

    fn document_url(&self, user_id: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.documents_root(),
            self.collection,
            urlencoding::encode(user_id)
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header("x-goog-api-key", &self.api_key);

        match &self.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Turn non-success statuses into the store's error taxonomy
    async fn check(response: Response, context: &str) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read body".to_string());

        match status {
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(context.to_string())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(StoreError::PermissionDenied(format!("{}: {}", context, status)))
            }
            StatusCode::CONFLICT => Err(StoreError::Conflict(context.to_string())),
            _ => {
                tracing::error!("Firestore call failed for {}: {} - {}", context, status, body);
                Err(StoreError::ApiError(format!("{}: {}", context, status)))
            }
        }
    }

    /// Apply a single field transform to a user document via `:commit`
    async fn transform(
        &self,
        user_id: &str,
        field: ListField,
        transform: &str,
        job_id: JobId,
    ) -> Result<(), StoreError> {
        let url = format!(
            "{}/{}:commit",
            self.base_url.trim_end_matches('/'),
            self.documents_root()
        );

        let body = serde_json::json!({
            "writes": [{
                "transform": {
                    "document": self.document_name(user_id),
                    "fieldTransforms": [{
                        "fieldPath": field.field_path(),
                        transform: {
                            "values": [{ "integerValue": job_id.to_string() }]
                        }
                    }]
                },
                "currentDocument": { "exists": true }
            }]
        });

        let response = self.request(Method::POST, &url).json(&body).send().await?;
        Self::check(response, &format!("{} {} on users/{}", transform, field, user_id)).await?;

        tracing::debug!("{} {} -> {} for user {}", transform, job_id, field, user_id);
        Ok(())
    }
}

/// Decode a Firestore document into a profile
fn decode_profile(user_id: &str, document: &Value) -> Result<UserProfile, StoreError> {
    let mut data = codec::decode_fields(document.get("fields"))
        .map_err(|e| StoreError::InvalidResponse(format!("Failed to decode document: {}", e)))?;

    if let Some(obj) = data.as_object_mut() {
        // Explicit nulls fall back to field defaults
        obj.retain(|_, v| !v.is_null());
        obj.insert("userId".to_string(), Value::String(user_id.to_string()));
    }

    serde_json::from_value(data)
        .map_err(|e| StoreError::InvalidResponse(format!("Failed to parse profile: {}", e)))
}

fn encode_document<T: serde::Serialize>(value: &T) -> Result<Value, StoreError> {
    let plain = serde_json::to_value(value)
        .map_err(|e| StoreError::InvalidResponse(format!("Failed to encode document: {}", e)))?;
    let map = plain
        .as_object()
        .ok_or_else(|| StoreError::InvalidResponse("Document must be an object".into()))?;
    Ok(serde_json::json!({ "fields": codec::encode_fields(map) }))
}

fn content_type_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl ProfileStore for FirestoreClient {
    async fn fetch(&self, user_id: &str) -> Result<UserProfile, StoreError> {
        let url = self.document_url(user_id);
        tracing::debug!("Fetching profile for user: {}", user_id);

        let response = self.request(Method::GET, &url).send().await?;
        let response = Self::check(response, &format!("users/{}", user_id)).await?;

        let json: Value = response.json().await?;
        decode_profile(user_id, &json)
    }

    async fn create_default(
        &self,
        user_id: &str,
        seed_email: &str,
    ) -> Result<UserProfile, StoreError> {
        let url = format!(
            "{}/{}/{}?documentId={}",
            self.base_url.trim_end_matches('/'),
            self.documents_root(),
            self.collection,
            urlencoding::encode(user_id)
        );

        let profile = UserProfile::new_default(user_id, seed_email);
        let body = encode_document(&profile)?;

        let response = self.request(Method::POST, &url).json(&body).send().await?;
        match Self::check(response, &format!("users/{}", user_id)).await {
            Ok(response) => {
                let json: Value = response.json().await?;
                tracing::info!("Created profile document for user {}", user_id);
                decode_profile(user_id, &json)
            }
            Err(StoreError::Conflict(_)) => {
                // Lost the race against another create; keep what is there
                tracing::debug!("Profile for {} already exists, fetching it", user_id);
                self.fetch(user_id).await
            }
            Err(e) => Err(e),
        }
    }

    async fn patch_fields(&self, user_id: &str, patch: &ProfilePatch) -> Result<(), StoreError> {
        let paths = patch.field_paths();
        if paths.is_empty() {
            return Ok(());
        }

        let mask = paths
            .iter()
            .map(|p| format!("updateMask.fieldPaths={}", urlencoding::encode(p)))
            .collect::<Vec<_>>()
            .join("&");
        let url = format!(
            "{}?{}&currentDocument.exists=true",
            self.document_url(user_id),
            mask
        );

        let body = encode_document(patch)?;
        let response = self.request(Method::PATCH, &url).json(&body).send().await?;
        Self::check(response, &format!("patch users/{}", user_id)).await?;

        tracing::debug!("Patched {:?} for user {}", paths, user_id);
        Ok(())
    }

    async fn union_field(
        &self,
        user_id: &str,
        field: ListField,
        job_id: JobId,
    ) -> Result<(), StoreError> {
        self.transform(user_id, field, "appendMissingElements", job_id)
            .await
    }

    async fn remove_field(
        &self,
        user_id: &str,
        field: ListField,
        job_id: JobId,
    ) -> Result<(), StoreError> {
        self.transform(user_id, field, "removeAllFromArray", job_id)
            .await
    }

    async fn upload_asset(
        &self,
        user_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StoreError> {
        let path = asset_path(user_id, file_name);
        let storage_url = self.storage_url.trim_end_matches('/');
        let url = format!(
            "{}/b/{}/o?uploadType=media&name={}",
            storage_url,
            self.bucket,
            urlencoding::encode(&path)
        );

        let response = self
            .request(Method::POST, &url)
            .header("content-type", content_type_for(file_name))
            .body(bytes)
            .send()
            .await?;
        let response = Self::check(response, &format!("upload {}", path)).await?;

        let json: Value = response.json().await?;
        let name = json
            .get("name")
            .and_then(|n| n.as_str())
            .unwrap_or(&path)
            .to_string();

        let mut download_url = format!(
            "{}/b/{}/o/{}?alt=media",
            storage_url,
            self.bucket,
            urlencoding::encode(&name)
        );
        // Multiple tokens come comma-separated; any one of them works
        if let Some(token) = json
            .get("downloadTokens")
            .and_then(|t| t.as_str())
            .and_then(|t| t.split(',').next())
        {
            download_url.push_str("&token=");
            download_url.push_str(token);
        }

        tracing::debug!("Uploaded asset {} for user {}", name, user_id);
        Ok(download_url)
    }
}
