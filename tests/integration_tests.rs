// Integration tests for SkillMatch

use async_trait::async_trait;
use parking_lot::Mutex;
use skillmatch::core::{JobCatalog, MutationController, MutationOp, MutationState, Session};
use skillmatch::models::{JobId, ListField, ProfilePatch, UserProfile};
use skillmatch::services::{InMemoryStore, ProfileStore, StoreError};
use skillmatch::SyncError;
use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Store wrapper that fails list writes for chosen job ids and can hold
/// the next write open until the test releases it
#[derive(Default)]
struct FlakyStore {
    inner: InMemoryStore,
    failing_jobs: Mutex<HashSet<JobId>>,
    fail_patches: Mutex<bool>,
    union_calls: AtomicUsize,
    remove_calls: AtomicUsize,
    gate: Mutex<Option<(Arc<Notify>, Arc<Notify>)>>,
}

impl FlakyStore {
    fn fail_job(&self, job_id: JobId) {
        self.failing_jobs.lock().insert(job_id);
    }

    /// Hold the next write until `release` is notified; `entered`
    /// fires once the write has started
    fn hold_next_write(&self) -> (Arc<Notify>, Arc<Notify>) {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        *self.gate.lock() = Some((entered.clone(), release.clone()));
        (entered, release)
    }

    async fn pass_gate(&self) {
        let gate = self.gate.lock().take();
        if let Some((entered, release)) = gate {
            entered.notify_one();
            release.notified().await;
        }
    }

    async fn list_write(&self, job_id: JobId) -> Result<(), StoreError> {
        self.pass_gate().await;
        if self.failing_jobs.lock().contains(&job_id) {
            return Err(StoreError::ApiError("503 Service Unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for FlakyStore {
    async fn fetch(&self, user_id: &str) -> Result<UserProfile, StoreError> {
        self.inner.fetch(user_id).await
    }

    async fn create_default(&self, user_id: &str, seed_email: &str) -> Result<UserProfile, StoreError> {
        self.inner.create_default(user_id, seed_email).await
    }

    async fn patch_fields(&self, user_id: &str, patch: &ProfilePatch) -> Result<(), StoreError> {
        self.pass_gate().await;
        if *self.fail_patches.lock() {
            return Err(StoreError::PermissionDenied("users/u1".into()));
        }
        self.inner.patch_fields(user_id, patch).await
    }

    async fn union_field(&self, user_id: &str, field: ListField, job_id: JobId) -> Result<(), StoreError> {
        self.union_calls.fetch_add(1, Ordering::SeqCst);
        self.list_write(job_id).await?;
        self.inner.union_field(user_id, field, job_id).await
    }

    async fn remove_field(&self, user_id: &str, field: ListField, job_id: JobId) -> Result<(), StoreError> {
        self.remove_calls.fetch_add(1, Ordering::SeqCst);
        self.list_write(job_id).await?;
        self.inner.remove_field(user_id, field, job_id).await
    }

    async fn upload_asset(&self, user_id: &str, file_name: &str, bytes: Vec<u8>) -> Result<String, StoreError> {
        self.inner.upload_asset(user_id, file_name, bytes).await
    }
}

fn ids(items: &[JobId]) -> BTreeSet<JobId> {
    items.iter().copied().collect()
}

async fn setup(saved: &[JobId]) -> (Arc<FlakyStore>, Arc<Session>, Arc<MutationController>) {
    let store = Arc::new(FlakyStore::default());
    let mut profile = UserProfile::new_default("u1", "u1@example.com");
    profile.skills = vec!["Python".into(), "SQL".into()];
    profile.saved_job_ids = ids(saved);
    store.inner.insert(profile).await;

    let session = Arc::new(Session::new());
    session.sign_in(store.as_ref(), "u1", "u1@example.com").await.unwrap();

    let controller = Arc::new(MutationController::new(
        store.clone(),
        Arc::new(JobCatalog::default()),
    ));
    (store, session, controller)
}

async fn cached_saved(session: &Session) -> BTreeSet<JobId> {
    session.profile().await.unwrap().saved_job_ids
}

#[tokio::test]
async fn test_toggle_remove_then_failed_add_rolls_back() {
    let (store, session, controller) = setup(&[1, 2]).await;

    let removed = controller.toggle_saved(&session, 2).await.unwrap();
    assert_eq!(removed.op, Some(MutationOp::Remove));
    assert_eq!(removed.state, MutationState::Committed);
    assert_eq!(cached_saved(&session).await, ids(&[1]));

    store.fail_job(5);
    let failed = controller.toggle_saved(&session, 5).await.unwrap();
    assert_eq!(failed.op, Some(MutationOp::Union));
    assert_eq!(failed.state, MutationState::RolledBack);
    assert_eq!(failed.error_count(), 1);
    assert_eq!(failed.notices[0].title, "Error");
    assert!(matches!(
        failed.failure,
        Some(SyncError::TransientRemoteFailure(_))
    ));

    // Cache is back to the exact pre-mutation set
    assert_eq!(cached_saved(&session).await, ids(&[1]));
    assert_eq!(store.fetch("u1").await.unwrap().saved_job_ids, ids(&[1]));
}

#[tokio::test]
async fn test_toggle_twice_restores_original_set() {
    let (store, session, controller) = setup(&[4]).await;
    let before = cached_saved(&session).await;

    controller.toggle_saved(&session, 3).await.unwrap();
    controller.toggle_saved(&session, 3).await.unwrap();

    assert_eq!(cached_saved(&session).await, before);
    assert_eq!(store.fetch("u1").await.unwrap().saved_job_ids, before);
    assert_eq!(store.union_calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.remove_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_apply_only_writes_once() {
    let (store, session, controller) = setup(&[]).await;

    for _ in 0..3 {
        controller.apply(&session, 6).await.unwrap();
    }

    assert_eq!(store.union_calls.load(Ordering::SeqCst), 1);
    let profile = session.profile().await.unwrap();
    assert_eq!(profile.applied_job_ids, ids(&[6]));
}

#[tokio::test]
async fn test_failed_apply_leaves_job_unapplied() {
    let (store, session, controller) = setup(&[]).await;
    store.fail_job(1);

    let report = controller.apply(&session, 1).await.unwrap();

    assert_eq!(report.state, MutationState::RolledBack);
    assert_eq!(report.error_count(), 1);
    assert_eq!(report.notices[0].title, "Application Failed");
    assert!(session.profile().await.unwrap().applied_job_ids.is_empty());
}

#[tokio::test]
async fn test_concurrent_toggle_on_same_job_is_rejected() {
    let (store, session, controller) = setup(&[]).await;
    let (entered, release) = store.hold_next_write();

    let pending = {
        let controller = controller.clone();
        let session = session.clone();
        tokio::spawn(async move { controller.toggle_saved(&session, 2).await })
    };
    entered.notified().await;

    // Local state already reflects the pending add
    assert_eq!(cached_saved(&session).await, ids(&[2]));

    let second = controller.toggle_saved(&session, 2).await;
    assert!(matches!(second, Err(SyncError::MutationInFlight(_))));

    // A different job is independent
    let other = controller.toggle_saved(&session, 3).await.unwrap();
    assert_eq!(other.state, MutationState::Committed);

    release.notify_one();
    let first = pending.await.unwrap().unwrap();
    assert_eq!(first.state, MutationState::Committed);
    assert_eq!(cached_saved(&session).await, ids(&[2, 3]));
}

#[tokio::test]
async fn test_late_rollback_after_identity_switch_is_discarded() {
    let (store, session, controller) = setup(&[1]).await;
    store.fail_job(4);
    let (entered, release) = store.hold_next_write();

    let pending = {
        let controller = controller.clone();
        let session = session.clone();
        tokio::spawn(async move { controller.toggle_saved(&session, 4).await })
    };
    entered.notified().await;

    session.sign_in(store.as_ref(), "u2", "u2@example.com").await.unwrap();
    release.notify_one();

    let report = pending.await.unwrap().unwrap();
    assert_eq!(report.state, MutationState::RolledBack);

    // u1's snapshot never lands in u2's cache
    let profile = session.profile().await.unwrap();
    assert_eq!(profile.user_id, "u2");
    assert!(profile.saved_job_ids.is_empty());
}

#[tokio::test]
async fn test_failed_profile_patch_restores_snapshot() {
    let (store, session, controller) = setup(&[]).await;
    *store.fail_patches.lock() = true;
    let before = session.profile().await.unwrap();

    let patch = ProfilePatch {
        bio: Some("Aspiring data scientist".into()),
        ..ProfilePatch::default()
    };
    let report = controller.update_profile(&session, patch, None).await.unwrap();

    assert_eq!(report.state, MutationState::RolledBack);
    assert_eq!(report.notices[0].title, "Update Failed");
    assert!(matches!(report.failure, Some(SyncError::PermissionDenied(_))));
    assert_eq!(session.profile().await.unwrap(), before);
}

#[tokio::test]
async fn test_first_login_creates_document_once() {
    let store = Arc::new(FlakyStore::default());
    let session = Session::new();

    let first = session.sign_in(store.as_ref(), "new", "new@example.com").await.unwrap();
    assert_eq!(first.email, "new@example.com");
    assert!(first.saved_job_ids.is_empty());

    // A second create never overwrites the existing document
    let controller = MutationController::new(store.clone(), Arc::new(JobCatalog::default()));
    controller.toggle_saved(&session, 1).await.unwrap();
    let again = store.create_default("new", "other@example.com").await.unwrap();
    assert_eq!(again.email, "new@example.com");
    assert_eq!(again.saved_job_ids, ids(&[1]));
}

#[tokio::test]
async fn test_failed_toggle_keeps_save_committed_meanwhile() {
    let (store, session, controller) = setup(&[]).await;
    store.fail_job(2);
    let (entered, release) = store.hold_next_write();

    let pending = {
        let controller = controller.clone();
        let session = session.clone();
        tokio::spawn(async move { controller.toggle_saved(&session, 2).await })
    };
    entered.notified().await;

    let other = controller.toggle_saved(&session, 3).await.unwrap();
    assert_eq!(other.state, MutationState::Committed);

    release.notify_one();
    let failed = pending.await.unwrap().unwrap();
    assert_eq!(failed.state, MutationState::RolledBack);

    let remote = store.fetch("u1").await.unwrap().saved_job_ids;
    assert_eq!(remote, ids(&[3]));
    assert_eq!(cached_saved(&session).await, remote);
}

#[tokio::test]
async fn test_failed_unsave_reinserts_only_its_job() {
    let (store, session, controller) = setup(&[1, 2]).await;
    store.fail_job(1);
    let (entered, release) = store.hold_next_write();

    let pending = {
        let controller = controller.clone();
        let session = session.clone();
        tokio::spawn(async move { controller.toggle_saved(&session, 1).await })
    };
    entered.notified().await;
    assert_eq!(cached_saved(&session).await, ids(&[2]));

    controller.toggle_saved(&session, 2).await.unwrap();

    release.notify_one();
    pending.await.unwrap().unwrap();

    assert_eq!(cached_saved(&session).await, ids(&[1]));
    assert_eq!(store.fetch("u1").await.unwrap().saved_job_ids, ids(&[1]));
}

#[tokio::test]
async fn test_failed_patch_keeps_concurrent_apply() {
    let (store, session, controller) = setup(&[]).await;
    *store.fail_patches.lock() = true;
    let (entered, release) = store.hold_next_write();

    let pending = {
        let controller = controller.clone();
        let session = session.clone();
        tokio::spawn(async move {
            let patch = ProfilePatch {
                major: Some("Statistics".into()),
                ..ProfilePatch::default()
            };
            controller.update_profile(&session, patch, None).await
        })
    };
    entered.notified().await;

    let applied = controller.apply(&session, 4).await.unwrap();
    assert_eq!(applied.state, MutationState::Committed);

    release.notify_one();
    let failed = pending.await.unwrap().unwrap();
    assert_eq!(failed.state, MutationState::RolledBack);

    let cached = session.profile().await.unwrap();
    let remote = store.fetch("u1").await.unwrap();
    assert_eq!(cached.major, "");
    assert_eq!(cached.applied_job_ids, ids(&[4]));
    assert_eq!(cached, remote);
}

#[tokio::test]
async fn test_failed_toggle_keeps_profile_edit_meanwhile() {
    let (store, session, controller) = setup(&[]).await;
    store.fail_job(5);
    let (entered, release) = store.hold_next_write();

    let pending = {
        let controller = controller.clone();
        let session = session.clone();
        tokio::spawn(async move { controller.toggle_saved(&session, 5).await })
    };
    entered.notified().await;

    let patch = ProfilePatch {
        name: Some("Alex Doe".into()),
        ..ProfilePatch::default()
    };
    let edited = controller.update_profile(&session, patch, None).await.unwrap();
    assert_eq!(edited.state, MutationState::Committed);

    release.notify_one();
    pending.await.unwrap().unwrap();

    let cached = session.profile().await.unwrap();
    assert_eq!(cached.name, "Alex Doe");
    assert!(cached.saved_job_ids.is_empty());
    assert_eq!(cached, store.fetch("u1").await.unwrap());
}
