use serde::{Deserialize, Serialize};
use validator::Validate;
use crate::models::domain::{Certification, Experience, ProfilePatch};

/// Request to open a session for an authenticated identity
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OpenSessionRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub email: String,
}

/// Request body for save/apply actions
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct JobActionRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
}

/// Request body for a match score; anonymous callers omit `userId`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchRequest {
    #[serde(alias = "user_id", rename = "userId", default)]
    pub user_id: Option<String>,
}

/// Profile edit form
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2, message = "Name must be at least 2 characters."))]
    pub name: Option<String>,
    #[validate(length(min = 2, message = "Major must be at least 2 characters."))]
    pub major: Option<String>,
    #[validate(length(min = 2, message = "University must be at least 2 characters."))]
    pub university: Option<String>,
    #[validate(length(max = 300, message = "Bio cannot exceed 300 characters."))]
    pub bio: Option<String>,
    #[serde(rename = "avatarUrl")]
    pub avatar_url: Option<String>,
    pub skills: Option<Vec<String>>,
    pub experience: Option<Vec<Experience>>,
    pub certifications: Option<Vec<Certification>>,
}

impl From<UpdateProfileRequest> for ProfilePatch {
    fn from(req: UpdateProfileRequest) -> Self {
        ProfilePatch {
            name: req.name,
            major: req.major,
            university: req.university,
            bio: req.bio,
            avatar_url: req.avatar_url,
            skills: req.skills,
            experience: req.experience,
            certifications: req.certifications,
        }
    }
}
