//! SkillMatch - job-board relevance scoring and profile sync service
//!
//! This library provides the pieces behind the SkillMatch student job board:
//! an AI relevance scorer that rates a job posting against a profile, an
//! optimistic mutation controller for saving and applying to jobs, and a
//! per-identity profile cache kept in sync with a remote document store.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{
    summarize, JobCatalog, MutationController, MutationReport, MutationState, RelevanceScorer,
    Session, SessionRegistry, SyncError,
};
pub use models::{JobId, JobPosting, ListField, MatchResult, Notice, ProfilePatch, UserProfile};
pub use services::{InMemoryStore, ProfileStore, StoreError};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let catalog = JobCatalog::default();
        assert_eq!(catalog.all().len(), 6);

        let profile = UserProfile::new_default("u1", "u1@example.com");
        assert_eq!(summarize(&profile), "");
    }
}
