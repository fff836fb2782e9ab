//! Per-identity profile cache.
//!
//! A [`Session`] holds at most one profile, for the identity currently signed
//! in. Every identity change bumps an epoch; work that started under an older
//! epoch (a slow load, a late rollback) is discarded instead of landing in
//! the cache of a different user.

use crate::core::error::SyncError;
use crate::models::UserProfile;
use crate::services::ProfileStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct SessionState {
    identity: Option<String>,
    profile: Option<UserProfile>,
    epoch: u64,
}

/// Result of a local, not-yet-confirmed change to the cached profile
#[derive(Debug)]
pub struct LocalChange<R> {
    pub user_id: String,
    pub epoch: u64,
    /// Full copy of the profile before the change, for rollback
    pub previous: UserProfile,
    pub output: R,
}

#[derive(Debug, Default)]
pub struct Session {
    state: RwLock<SessionState>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch to `user_id` and load its document, creating it on first login
    pub async fn sign_in(
        &self,
        store: &dyn ProfileStore,
        user_id: &str,
        email: &str,
    ) -> Result<UserProfile, SyncError> {
        let epoch = {
            let mut state = self.state.write().await;
            state.identity = Some(user_id.to_string());
            state.profile = None;
            state.epoch += 1;
            state.epoch
        };

        tracing::info!("Signing in {} (epoch {})", user_id, epoch);

        let profile = store.fetch_or_create(user_id, email).await?;
        if !self.replace_if_current(epoch, profile.clone()).await {
            tracing::warn!("Identity changed while loading {}, discarding profile", user_id);
        }
        Ok(profile)
    }

    pub async fn sign_out(&self) {
        let mut state = self.state.write().await;
        if let Some(user_id) = state.identity.take() {
            tracing::info!("Signed out {}", user_id);
        }
        state.profile = None;
        state.epoch += 1;
    }

    /// Reload the cached profile from the store
    pub async fn refresh(&self, store: &dyn ProfileStore) -> Result<UserProfile, SyncError> {
        let (user_id, email, epoch) = {
            let state = self.state.read().await;
            let user_id = state.identity.clone().ok_or(SyncError::Unauthenticated)?;
            let email = state
                .profile
                .as_ref()
                .map(|p| p.email.clone())
                .unwrap_or_default();
            (user_id, email, state.epoch)
        };

        let profile = store.fetch_or_create(&user_id, &email).await?;
        if !self.replace_if_current(epoch, profile.clone()).await {
            tracing::warn!("Identity changed while refreshing {}, discarding profile", user_id);
        }
        Ok(profile)
    }

    pub async fn current_user(&self) -> Option<String> {
        self.state.read().await.identity.clone()
    }

    pub async fn epoch(&self) -> u64 {
        self.state.read().await.epoch
    }

    pub async fn is_current(&self, epoch: u64) -> bool {
        self.state.read().await.epoch == epoch
    }

    pub async fn profile(&self) -> Option<UserProfile> {
        self.state.read().await.profile.clone()
    }

    /// Free-text profile summary used as the scorer's profile argument
    pub async fn profile_summary(&self) -> String {
        self.state
            .read()
            .await
            .profile
            .as_ref()
            .map(summarize)
            .unwrap_or_default()
    }

    /// Apply `f` to the cached profile of `user_id`, returning a snapshot
    /// taken before it ran. Fails if `user_id` is no longer signed in.
    pub async fn apply_local<R, F>(&self, user_id: &str, f: F) -> Result<LocalChange<R>, SyncError>
    where
        F: FnOnce(&mut UserProfile) -> R,
    {
        let mut state = self.state.write().await;
        if state.identity.as_deref() != Some(user_id) {
            return Err(SyncError::Unauthenticated);
        }
        let user_id = user_id.to_string();
        let epoch = state.epoch;
        let profile = state.profile.as_mut().ok_or(SyncError::ProfileNotLoaded)?;

        let previous = profile.clone();
        let output = f(profile);

        Ok(LocalChange {
            user_id,
            epoch,
            previous,
            output,
        })
    }

    /// Undo a failed change on the profile as it is now, unless the
    /// identity changed since `epoch`. Changes that settled in the meantime
    /// are left alone.
    pub async fn revert<F>(&self, epoch: u64, undo: F) -> bool
    where
        F: FnOnce(&mut UserProfile),
    {
        let mut state = self.state.write().await;
        if state.epoch != epoch {
            return false;
        }
        match state.profile.as_mut() {
            Some(profile) => {
                undo(profile);
                true
            }
            None => false,
        }
    }

    pub async fn replace_if_current(&self, epoch: u64, profile: UserProfile) -> bool {
        let mut state = self.state.write().await;
        if state.epoch != epoch {
            return false;
        }
        state.profile = Some(profile);
        true
    }
}

/// `Skills: a, b; Experience: Title at Company; ...`
///
/// Empty when the profile has neither skills nor experience, so the scorer
/// asks the student to complete it instead of scoring a blank.
pub fn summarize(profile: &UserProfile) -> String {
    if profile.skills.is_empty() && profile.experience.is_empty() {
        return String::new();
    }

    let experience = profile
        .experience
        .iter()
        .map(|e| format!("{} at {}", e.title, e.company))
        .collect::<Vec<_>>()
        .join("; ");

    format!(
        "Skills: {}; Experience: {}",
        profile.skills.join(", "),
        experience
    )
}

/// Live sessions keyed by identity, evicted after a period of inactivity
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: moka::future::Cache<String, Arc<Session>>,
}

impl SessionRegistry {
    pub fn new(capacity: u64, idle_secs: u64) -> Self {
        let sessions = moka::future::CacheBuilder::new(capacity)
            .time_to_idle(Duration::from_secs(idle_secs))
            .build();
        Self { sessions }
    }

    /// Sign `user_id` in, reusing its session if one is live
    pub async fn open(
        &self,
        store: &dyn ProfileStore,
        user_id: &str,
        email: &str,
    ) -> Result<(Arc<Session>, UserProfile), SyncError> {
        let session = self
            .sessions
            .get_with(user_id.to_string(), async { Arc::new(Session::new()) })
            .await;

        match session.sign_in(store, user_id, email).await {
            Ok(profile) => Ok((session, profile)),
            Err(e) => {
                self.sessions.invalidate(user_id).await;
                Err(e)
            }
        }
    }

    pub async fn get(&self, user_id: &str) -> Option<Arc<Session>> {
        self.sessions.get(user_id).await
    }

    pub async fn close(&self, user_id: &str) -> bool {
        match self.sessions.remove(user_id).await {
            Some(session) => {
                session.sign_out().await;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Experience;
    use crate::services::InMemoryStore;

    fn profile_with_skills() -> UserProfile {
        let mut profile = UserProfile::new_default("u1", "u1@example.com");
        profile.skills = vec!["React".into(), "Python".into()];
        profile.experience = vec![
            Experience {
                title: "Software Engineer Intern".into(),
                company: "Innovatech Solutions".into(),
                ..Experience::default()
            },
            Experience {
                title: "Freelance Web Developer".into(),
                company: "Self-Employed".into(),
                ..Experience::default()
            },
        ];
        profile
    }

    #[test]
    fn test_summarize() {
        let summary = summarize(&profile_with_skills());
        assert_eq!(
            summary,
            "Skills: React, Python; Experience: Software Engineer Intern at Innovatech Solutions; \
             Freelance Web Developer at Self-Employed"
        );

        assert_eq!(summarize(&UserProfile::default()), "");
    }

    #[tokio::test]
    async fn test_sign_in_creates_and_caches() {
        let store = InMemoryStore::new();
        let session = Session::new();

        let profile = session.sign_in(&store, "u1", "u1@example.com").await.unwrap();

        assert_eq!(profile.email, "u1@example.com");
        assert_eq!(session.current_user().await.as_deref(), Some("u1"));
        assert_eq!(session.profile().await, Some(profile));
        assert_eq!(session.profile_summary().await, "");
    }

    #[tokio::test]
    async fn test_switch_identity_invalidates() {
        let store = InMemoryStore::new();
        store.insert(profile_with_skills()).await;
        let session = Session::new();

        session.sign_in(&store, "u1", "").await.unwrap();
        let first_epoch = session.epoch().await;
        assert!(session.profile_summary().await.starts_with("Skills: React"));

        session.sign_in(&store, "u2", "u2@example.com").await.unwrap();
        assert!(!session.is_current(first_epoch).await);
        assert_eq!(session.profile().await.unwrap().user_id, "u2");
        assert_eq!(session.profile_summary().await, "");
    }

    #[tokio::test]
    async fn test_stale_revert_is_ignored() {
        let store = InMemoryStore::new();
        let session = Session::new();
        session.sign_in(&store, "u1", "").await.unwrap();

        let change = session
            .apply_local("u1", |p| p.saved_job_ids.insert(3))
            .await
            .unwrap();
        session.sign_out().await;

        assert!(!session.revert(change.epoch, |p| { p.saved_job_ids.remove(&3); }).await);
        assert_eq!(session.profile().await, None);
    }

    #[tokio::test]
    async fn test_revert_keeps_later_changes() {
        let store = InMemoryStore::new();
        let session = Session::new();
        session.sign_in(&store, "u1", "").await.unwrap();

        let first = session
            .apply_local("u1", |p| p.saved_job_ids.insert(3))
            .await
            .unwrap();
        session
            .apply_local("u1", |p| p.saved_job_ids.insert(4))
            .await
            .unwrap();

        assert!(session.revert(first.epoch, |p| { p.saved_job_ids.remove(&3); }).await);
        let saved: Vec<_> = session.profile().await.unwrap().saved_job_ids.into_iter().collect();
        assert_eq!(saved, vec![4]);
    }

    #[tokio::test]
    async fn test_apply_local_preconditions() {
        let session = Session::new();
        let err = session.apply_local("u1", |_| ()).await.unwrap_err();
        assert_eq!(err, SyncError::Unauthenticated);
    }

    #[tokio::test]
    async fn test_registry_open_and_close() {
        let store = InMemoryStore::new();
        let registry = SessionRegistry::new(100, 60);

        let (session, _) = registry.open(&store, "u1", "").await.unwrap();
        assert!(registry.get("u1").await.is_some());

        assert!(registry.close("u1").await);
        assert!(registry.get("u1").await.is_none());
        assert_eq!(session.current_user().await, None);
        assert!(!registry.close("u1").await);
    }
}
