// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    Certification, Experience, JobId, JobPosting, ListField, MatchOrigin, MatchResult, Notice,
    NoticeLevel, ProfilePatch, UserProfile,
};
pub use requests::{JobActionRequest, MatchRequest, OpenSessionRequest, UpdateProfileRequest};
pub use responses::{ErrorResponse, HealthResponse, JobsResponse, ProfileResponse};
