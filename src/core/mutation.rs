//! Optimistic list and profile mutations.
//!
//! Each mutation moves `Idle -> Pending -> {Committed, RolledBack}`. The
//! session cache is updated before the remote call so the UI reflects the
//! target state immediately; a remote failure undoes exactly that change on
//! the cached profile, leaving mutations that settled meanwhile in place.

use crate::core::catalog::JobCatalog;
use crate::core::error::SyncError;
use crate::core::session::{LocalChange, Session};
use crate::models::{JobId, ListField, Notice, ProfilePatch, UserProfile};
use crate::services::{ProfileStore, StoreError};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MutationState {
    Idle,
    Pending,
    Committed,
    RolledBack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MutationOp {
    Union,
    Remove,
    Patch,
}

/// What a mutation writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MutationTarget {
    List {
        field: ListField,
        #[serde(rename = "jobId")]
        job_id: JobId,
    },
    Profile,
}

/// Outcome of one mutation, rendered by the UI
#[derive(Debug, Clone, Serialize)]
pub struct MutationReport {
    pub target: MutationTarget,
    pub op: Option<MutationOp>,
    pub state: MutationState,
    pub notices: Vec<Notice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<SyncError>,
    /// Cached profile once the mutation settled
    pub profile: Option<UserProfile>,
}

impl MutationReport {
    fn new(target: MutationTarget, op: Option<MutationOp>) -> Self {
        Self {
            target,
            op,
            state: MutationState::Idle,
            notices: Vec::new(),
            failure: None,
            profile: None,
        }
    }

    pub fn error_count(&self) -> usize {
        self.notices.iter().filter(|n| n.is_error()).count()
    }
}

/// New avatar image from the profile form
#[derive(Debug, Clone)]
pub struct AvatarUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

type MutationKey = (String, MutationTarget);

/// Releases the in-flight slot when the mutation settles
struct InFlightGuard<'a> {
    slots: &'a Mutex<HashSet<MutationKey>>,
    key: MutationKey,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.slots.lock().remove(&self.key);
    }
}

/// Applies save/apply/profile changes optimistically and reconciles them
/// with the remote store
pub struct MutationController {
    store: Arc<dyn ProfileStore>,
    catalog: Arc<JobCatalog>,
    in_flight: Mutex<HashSet<MutationKey>>,
}

impl MutationController {
    pub fn new(store: Arc<dyn ProfileStore>, catalog: Arc<JobCatalog>) -> Self {
        Self {
            store,
            catalog,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Add `job_id` to the saved list, or remove it if already saved
    pub async fn toggle_saved(
        &self,
        session: &Session,
        job_id: JobId,
    ) -> Result<MutationReport, SyncError> {
        let user_id = self.precheck(session, job_id).await?;
        let target = MutationTarget::List {
            field: ListField::Saved,
            job_id,
        };
        let _guard = self.acquire(&user_id, target)?;

        let change = session
            .apply_local(&user_id, |profile| {
                let saved = profile.list_mut(ListField::Saved);
                if saved.remove(&job_id) {
                    MutationOp::Remove
                } else {
                    saved.insert(job_id);
                    MutationOp::Union
                }
            })
            .await?;
        let op = change.output;

        tracing::debug!("Pending {:?} of job {} in saved list for {}", op, job_id, user_id);

        let result = match op {
            MutationOp::Remove => {
                self.store
                    .remove_field(&user_id, ListField::Saved, job_id)
                    .await
            }
            _ => {
                self.store
                    .union_field(&user_id, ListField::Saved, job_id)
                    .await
            }
        };

        let mut report = MutationReport::new(target, Some(op));
        match result {
            Ok(()) => report.state = MutationState::Committed,
            Err(e) => {
                self.roll_back(session, &change, e, &mut report, |profile| {
                    let saved = profile.list_mut(ListField::Saved);
                    match op {
                        MutationOp::Remove => saved.insert(job_id),
                        _ => saved.remove(&job_id),
                    };
                })
                .await;
                report
                    .notices
                    .push(Notice::error("Error", "Could not update saved jobs."));
            }
        }
        report.profile = session.profile().await;
        Ok(report)
    }

    /// Record an application. Applying twice is a local no-op.
    pub async fn apply(
        &self,
        session: &Session,
        job_id: JobId,
    ) -> Result<MutationReport, SyncError> {
        let user_id = self.precheck(session, job_id).await?;
        let target = MutationTarget::List {
            field: ListField::Applied,
            job_id,
        };
        let _guard = self.acquire(&user_id, target)?;

        let change = session
            .apply_local(&user_id, |profile| {
                profile.list_mut(ListField::Applied).insert(job_id)
            })
            .await?;

        let mut report = MutationReport::new(target, Some(MutationOp::Union));
        if !change.output {
            tracing::debug!("User {} already applied to job {}", user_id, job_id);
            report.profile = session.profile().await;
            return Ok(report);
        }

        match self
            .store
            .union_field(&user_id, ListField::Applied, job_id)
            .await
        {
            Ok(()) => {
                let title = self
                    .catalog
                    .get(job_id)
                    .map(|j| j.title.as_str())
                    .unwrap_or("this job");
                report.state = MutationState::Committed;
                report.notices.push(Notice::info(
                    "Application Submitted!",
                    format!("Your application for {} has been sent.", title),
                ));
            }
            Err(e) => {
                self.roll_back(session, &change, e, &mut report, |profile| {
                    profile.list_mut(ListField::Applied).remove(&job_id);
                })
                .await;
                report.notices.push(Notice::error(
                    "Application Failed",
                    "There was an error submitting your application.",
                ));
            }
        }
        report.profile = session.profile().await;
        Ok(report)
    }

    /// Save edited profile fields, then upload the avatar if one was chosen.
    ///
    /// A failed field patch restores the touched fields from the snapshot. The avatar upload settles
    /// asynchronously against the store, so it is reconciled by a full
    /// refresh whether it succeeds or not.
    pub async fn update_profile(
        &self,
        session: &Session,
        patch: ProfilePatch,
        avatar: Option<AvatarUpload>,
    ) -> Result<MutationReport, SyncError> {
        let user_id = session
            .current_user()
            .await
            .ok_or(SyncError::Unauthenticated)?;
        let target = MutationTarget::Profile;
        let _guard = self.acquire(&user_id, target)?;

        let mut report = MutationReport::new(target, Some(MutationOp::Patch));

        if !patch.is_empty() {
            let change = session
                .apply_local(&user_id, |profile| profile.merge(&patch))
                .await?;

            match self.store.patch_fields(&user_id, &patch).await {
                Ok(()) => report.notices.push(Notice::info(
                    "Profile Updated",
                    "Your profile information has been saved.",
                )),
                Err(e) => {
                    let inverse = patch.inverse(&change.previous);
                    self.roll_back(session, &change, e, &mut report, |profile| {
                        profile.merge(&inverse)
                    })
                    .await;
                    report.notices.push(Notice::error(
                        "Update Failed",
                        "There was an error updating your profile.",
                    ));
                    report.profile = session.profile().await;
                    return Ok(report);
                }
            }
        }

        if let Some(avatar) = avatar {
            let epoch = session.epoch().await;

            match self.upload_avatar(&user_id, avatar).await {
                Ok(url) => {
                    tracing::info!("Stored new avatar for {} at {}", user_id, url);
                    report.notices.push(Notice::info(
                        "Photo Updated",
                        "Your new profile photo has been saved.",
                    ));
                }
                Err(e) => {
                    tracing::error!("Avatar upload failed for {}: {}", user_id, e);
                    report.failure = Some(SyncError::from(e));
                    report.notices.push(Notice::error(
                        "Update Failed",
                        "There was an error updating your profile.",
                    ));
                }
            }

            if session.is_current(epoch).await {
                if let Err(e) = session.refresh(self.store.as_ref()).await {
                    tracing::warn!("Refresh after avatar upload failed for {}: {}", user_id, e);
                }
            }
        }

        report.state = match (&report.failure, report.notices.is_empty()) {
            (Some(_), _) => MutationState::RolledBack,
            (None, true) => MutationState::Idle,
            (None, false) => MutationState::Committed,
        };
        report.profile = session.profile().await;
        Ok(report)
    }

    async fn upload_avatar(&self, user_id: &str, avatar: AvatarUpload) -> Result<String, StoreError> {
        let url = self
            .store
            .upload_asset(user_id, &avatar.file_name, avatar.bytes)
            .await?;
        self.store
            .patch_fields(user_id, &ProfilePatch::avatar(url.clone()))
            .await?;
        Ok(url)
    }

    /// Shared preconditions of list mutations; returns the acting identity
    async fn precheck(&self, session: &Session, job_id: JobId) -> Result<String, SyncError> {
        let user_id = session
            .current_user()
            .await
            .ok_or(SyncError::Unauthenticated)?;
        if !self.catalog.contains(job_id) {
            return Err(SyncError::UnknownJob(job_id));
        }
        Ok(user_id)
    }

    /// Claim the (user, target) slot; a second claim while pending is refused
    fn acquire(&self, user_id: &str, target: MutationTarget) -> Result<InFlightGuard<'_>, SyncError> {
        let key = (user_id.to_string(), target);
        let mut slots = self.in_flight.lock();
        if !slots.insert(key.clone()) {
            tracing::debug!("Rejecting concurrent mutation {:?} for {}", target, user_id);
            return Err(SyncError::MutationInFlight(describe(&target)));
        }
        Ok(InFlightGuard {
            slots: &self.in_flight,
            key,
        })
    }

    /// Undo this mutation's own change on the current cached profile.
    /// Mutations that settled while this one was pending are kept.
    async fn roll_back<R, F>(
        &self,
        session: &Session,
        change: &LocalChange<R>,
        cause: StoreError,
        report: &mut MutationReport,
        undo: F,
    ) where
        F: FnOnce(&mut UserProfile),
    {
        tracing::error!(
            "Mutation {:?} failed for {}: {}",
            report.target,
            change.user_id,
            cause
        );

        if !session.revert(change.epoch, undo).await {
            tracing::warn!(
                "Identity changed before rollback of {:?}; ignoring late result",
                report.target
            );
        }
        report.state = MutationState::RolledBack;
        report.failure = Some(SyncError::from(cause));
    }
}

fn describe(target: &MutationTarget) -> String {
    match target {
        MutationTarget::List { field, job_id } => format!("{} job {}", field, job_id),
        MutationTarget::Profile => "profile fields".to_string(),
    }
}
