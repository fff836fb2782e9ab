use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Catalog identifier of a job posting
pub type JobId = u32;

/// Student profile document stored under `users/{userId}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub major: String,
    #[serde(default)]
    pub university: String,
    #[serde(default)]
    pub bio: String,
    #[serde(rename = "avatarUrl", default)]
    pub avatar_url: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience: Vec<Experience>,
    #[serde(default)]
    pub certifications: Vec<Certification>,
    #[serde(rename = "savedJobIds", default)]
    pub saved_job_ids: BTreeSet<JobId>,
    #[serde(rename = "appliedJobIds", default)]
    pub applied_job_ids: BTreeSet<JobId>,
}

impl UserProfile {
    /// Fresh document written on first login
    pub fn new_default(user_id: &str, email: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            email: email.to_string(),
            ..Self::default()
        }
    }

    pub fn list(&self, field: ListField) -> &BTreeSet<JobId> {
        match field {
            ListField::Saved => &self.saved_job_ids,
            ListField::Applied => &self.applied_job_ids,
        }
    }

    pub fn list_mut(&mut self, field: ListField) -> &mut BTreeSet<JobId> {
        match field {
            ListField::Saved => &mut self.saved_job_ids,
            ListField::Applied => &mut self.applied_job_ids,
        }
    }

    /// Merge the fields present in `patch` into this profile
    pub fn merge(&mut self, patch: &ProfilePatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(major) = &patch.major {
            self.major = major.clone();
        }
        if let Some(university) = &patch.university {
            self.university = university.clone();
        }
        if let Some(bio) = &patch.bio {
            self.bio = bio.clone();
        }
        if let Some(avatar_url) = &patch.avatar_url {
            self.avatar_url = avatar_url.clone();
        }
        if let Some(skills) = &patch.skills {
            self.skills = skills.clone();
        }
        if let Some(experience) = &patch.experience {
            self.experience = experience.clone();
        }
        if let Some(certifications) = &patch.certifications {
            self.certifications = certifications.clone();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Certification {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub issuer: String,
    #[serde(default)]
    pub verified: bool,
}

/// Set-valued profile fields that support element-level union/remove
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListField {
    Saved,
    Applied,
}

impl ListField {
    /// Document field name in the remote store
    pub fn field_path(self) -> &'static str {
        match self {
            ListField::Saved => "savedJobIds",
            ListField::Applied => "appliedJobIds",
        }
    }
}

impl fmt::Display for ListField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_path())
    }
}

/// Partial profile update; only `Some` fields are written
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfilePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub university: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(rename = "avatarUrl", default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience: Option<Vec<Experience>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certifications: Option<Vec<Certification>>,
}

impl ProfilePatch {
    pub fn avatar(url: impl Into<String>) -> Self {
        Self {
            avatar_url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.field_paths().is_empty()
    }

    /// Patch that puts back the values `previous` held for every field this
    /// patch touches
    pub fn inverse(&self, previous: &UserProfile) -> ProfilePatch {
        ProfilePatch {
            name: self.name.as_ref().map(|_| previous.name.clone()),
            major: self.major.as_ref().map(|_| previous.major.clone()),
            university: self.university.as_ref().map(|_| previous.university.clone()),
            bio: self.bio.as_ref().map(|_| previous.bio.clone()),
            avatar_url: self.avatar_url.as_ref().map(|_| previous.avatar_url.clone()),
            skills: self.skills.as_ref().map(|_| previous.skills.clone()),
            experience: self.experience.as_ref().map(|_| previous.experience.clone()),
            certifications: self
                .certifications
                .as_ref()
                .map(|_| previous.certifications.clone()),
        }
    }

    /// Document field names touched by this patch, in a stable order
    pub fn field_paths(&self) -> Vec<&'static str> {
        let mut paths = Vec::new();
        if self.name.is_some() {
            paths.push("name");
        }
        if self.major.is_some() {
            paths.push("major");
        }
        if self.university.is_some() {
            paths.push("university");
        }
        if self.bio.is_some() {
            paths.push("bio");
        }
        if self.avatar_url.is_some() {
            paths.push("avatarUrl");
        }
        if self.skills.is_some() {
            paths.push("skills");
        }
        if self.experience.is_some() {
            paths.push("experience");
        }
        if self.certifications.is_some() {
            paths.push("certifications");
        }
        paths
    }
}

/// Job posting from the static catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: JobId,
    pub title: String,
    pub company: String,
    pub location: String,
    #[serde(rename = "type")]
    pub job_type: String,
    pub skills: Vec<String>,
    pub description: String,
    pub rating: f32,
    #[serde(rename = "reviewCount")]
    pub review_count: u32,
}

/// Relevance of one job to one profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub score: u8,
    pub justification: String,
    #[serde(skip)]
    pub origin: MatchOrigin,
}

impl MatchResult {
    pub fn new(score: u8, justification: impl Into<String>, origin: MatchOrigin) -> Self {
        Self {
            score: score.min(100),
            justification: justification.into(),
            origin,
        }
    }

    /// Only model-produced results are worth caching
    pub fn is_from_model(&self) -> bool {
        self.origin == MatchOrigin::Model
    }
}

/// Where a `MatchResult` came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchOrigin {
    #[default]
    Model,
    EmptyProfile,
    Unavailable,
    Failed,
}

/// User-visible signal raised by a mutation (a toast in the UI)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub description: String,
    #[serde(rename = "raisedAt")]
    pub raised_at: chrono::DateTime<chrono::Utc>,
}

impl Notice {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, title, description)
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, title, description)
    }

    fn new(level: NoticeLevel, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            description: description.into(),
            raised_at: chrono::Utc::now(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverse_patch_restores_only_touched_fields() {
        let previous = UserProfile {
            name: "Old Name".to_string(),
            bio: "old bio".to_string(),
            ..UserProfile::new_default("u1", "a@b.c")
        };
        let patch = ProfilePatch {
            name: Some("New Name".to_string()),
            ..ProfilePatch::default()
        };

        let mut current = previous.clone();
        current.merge(&patch);
        current.bio = "changed elsewhere".to_string();
        current.saved_job_ids.insert(4);

        current.merge(&patch.inverse(&previous));

        assert_eq!(current.name, "Old Name");
        assert_eq!(current.bio, "changed elsewhere");
        assert!(current.saved_job_ids.contains(&4));
        assert_eq!(patch.inverse(&previous).field_paths(), vec!["name"]);
    }

    #[test]
    fn test_profile_deserializes_with_missing_fields() {
        let json = r#"{"userId": "u1", "savedJobIds": [2, 1, 2]}"#;
        let profile: UserProfile = serde_json::from_str(json).unwrap();

        assert_eq!(profile.user_id, "u1");
        assert!(profile.skills.is_empty());
        assert_eq!(profile.saved_job_ids.iter().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert!(profile.applied_job_ids.is_empty());
    }

    #[test]
    fn test_merge_only_touches_present_fields() {
        let mut profile = UserProfile::new_default("u1", "a@b.c");
        profile.bio = "old bio".to_string();
        profile.saved_job_ids.insert(3);

        let patch = ProfilePatch {
            name: Some("Alex".to_string()),
            skills: Some(vec!["Rust".to_string()]),
            ..ProfilePatch::default()
        };
        profile.merge(&patch);

        assert_eq!(profile.name, "Alex");
        assert_eq!(profile.skills, vec!["Rust"]);
        assert_eq!(profile.bio, "old bio");
        assert!(profile.saved_job_ids.contains(&3));
    }

    #[test]
    fn test_patch_field_paths() {
        let patch = ProfilePatch {
            bio: Some(String::new()),
            avatar_url: Some("https://x".to_string()),
            ..ProfilePatch::default()
        };
        assert_eq!(patch.field_paths(), vec!["bio", "avatarUrl"]);
        assert!(ProfilePatch::default().is_empty());

        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({"bio": "", "avatarUrl": "https://x"}));
    }

    #[test]
    fn test_match_result_clamps_and_hides_origin() {
        let result = MatchResult::new(140, "great", MatchOrigin::Model);
        assert_eq!(result.score, 100);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json, serde_json::json!({"score": 100, "justification": "great"}));
    }

    #[test]
    fn test_list_field_paths() {
        assert_eq!(ListField::Saved.field_path(), "savedJobIds");
        assert_eq!(ListField::Applied.to_string(), "appliedJobIds");
    }
}
