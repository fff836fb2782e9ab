use serde::{Deserialize, Serialize};
use crate::models::domain::{JobPosting, UserProfile};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

/// Profile page payload: the cached document plus derived views
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub profile: UserProfile,
    pub summary: String,
    #[serde(rename = "savedJobs")]
    pub saved_jobs: Vec<JobPosting>,
    #[serde(rename = "appliedJobs")]
    pub applied_jobs: Vec<JobPosting>,
}

/// Job listing response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsResponse {
    pub jobs: Vec<JobPosting>,
    pub total: usize,
}
