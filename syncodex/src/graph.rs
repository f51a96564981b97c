//! Follow graph service.
//!
//! Edge documents in the `follows` collection are the source of truth. Every
//! follow/unfollow writes the edge and both sides of the denormalized
//! `following`/`followers` sets in one atomic batch, so the sets never drift
//! from the edges through this service. [`FollowGraphService::reconcile`]
//! repairs sets written by anything else.

use std::{collections::BTreeSet, future::Future, sync::Arc};

use chrono::Utc;
use futures::future::join_all;
use log::{debug, warn};
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::{
    errors::{GraphError, StoreError, ValidationError},
    id::UserId,
    identity::{self, Identity},
    models::{
        FOLLOWS, FollowEdge, ProfileDefaults, RelationCounts, RelationStatus, USERS, UserProfile, decode_document,
        decode_profile, edge_document_id, encode_document, fallback_username,
    },
    retry::RetryPolicy,
    store::{BatchOutcome, Document, DocumentStore, FieldFilter, SetOptions, WriteBatch},
};

pub(crate) const CHANGE_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationChangeKind {
    Followed,
    Unfollowed,
}

/// Broadcast after a follow or unfollow changed stored state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationChange {
    pub follower: UserId,
    pub followed: UserId,
    pub kind: RelationChangeKind,
}

impl RelationChange {
    /// Whether `user`'s relation sets were affected.
    pub fn touches(&self, user: &UserId) -> bool {
        &self.follower == user || &self.followed == user
    }
}

/// Outcome of an idempotent create-if-absent.
#[derive(Debug, Clone, PartialEq)]
pub enum GetOrCreateResult<T> {
    Created(T),
    Found(T),
}

impl<T> GetOrCreateResult<T> {
    pub fn into_inner(self) -> T {
        match self {
            GetOrCreateResult::Created(value) | GetOrCreateResult::Found(value) => value,
        }
    }

    pub fn as_inner(&self) -> &T {
        match self {
            GetOrCreateResult::Created(value) | GetOrCreateResult::Found(value) => value,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, GetOrCreateResult::Created(_))
    }
}

/// Differences found and fixed by [`FollowGraphService::reconcile`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub user_id: String,
    pub following_added: Vec<String>,
    pub following_removed: Vec<String>,
    pub followers_added: Vec<String>,
    pub followers_removed: Vec<String>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.following_added.is_empty()
            && self.following_removed.is_empty()
            && self.followers_added.is_empty()
            && self.followers_removed.is_empty()
    }
}

pub struct FollowGraphService<S> {
    store: Arc<S>,
    retry: RetryPolicy,
    changes: broadcast::Sender<RelationChange>,
}

impl<S> Clone for FollowGraphService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            retry: self.retry.clone(),
            changes: self.changes.clone(),
        }
    }
}

impl<S> FollowGraphService<S>
where
    S: DocumentStore,
{
    pub fn new(store: Arc<S>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            store,
            retry: RetryPolicy::default(),
            changes,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Receiver for relation changes made through this service (and its clones).
    pub fn changes(&self) -> broadcast::Receiver<RelationChange> {
        self.changes.subscribe()
    }

    pub(crate) async fn fetch(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let store = &self.store;
        self.retry.run("get", move || store.get(collection, id)).await
    }

    pub(crate) async fn query(&self, collection: &str, filters: &[FieldFilter]) -> Result<Vec<Document>, StoreError> {
        let store = &self.store;
        self.retry.run("query", move || store.query(collection, filters)).await
    }

    pub(crate) async fn commit(&self, operation: &str, batch: WriteBatch) -> Result<BatchOutcome, GraphError> {
        let store = &self.store;
        let batch = &batch;
        self.retry
            .run(operation, move || store.commit(batch.clone()))
            .await
            .map_err(|err| match err {
                StoreError::NotFound { collection, id } if collection == USERS => {
                    GraphError::ProfileNotFound { user_id: id }
                }
                other => GraphError::from(other),
            })
    }

    pub async fn get_profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, GraphError> {
        match self.fetch(USERS, user_id.as_str()).await? {
            Some(value) => decode_profile(user_id, value).map(Some),
            None => Ok(None),
        }
    }

    pub async fn require_profile(&self, user_id: &UserId) -> Result<UserProfile, GraphError> {
        self.get_profile(user_id).await?.ok_or_else(|| GraphError::ProfileNotFound {
            user_id: user_id.to_string(),
        })
    }

    /// Whether the signed-in viewer follows `target`. Signed-out viewers
    /// never follow anyone and cause no store access.
    pub async fn relation_status(
        &self,
        viewer: Option<&Identity>,
        target: &UserId,
    ) -> Result<RelationStatus, GraphError> {
        let Some(viewer) = viewer else {
            return Ok(RelationStatus::default());
        };
        if &viewer.id == target {
            return Ok(RelationStatus::default());
        }
        let edge_id = edge_document_id(target, &viewer.id);
        let is_following = self.fetch(FOLLOWS, &edge_id).await?.is_some();
        Ok(RelationStatus { is_following })
    }

    pub async fn follow(&self, viewer: Option<&Identity>, target: &UserId) -> Result<(), GraphError> {
        let viewer = identity::require(viewer)?;
        if &viewer.id == target {
            return Err(ValidationError::single("target", "self_follow", "You cannot follow yourself.").into());
        }

        let edge = FollowEdge {
            followed_id: target.clone(),
            follower_id: viewer.id.clone(),
            created_at: Utc::now(),
        };
        let edge_id = edge.document_id();
        let batch = WriteBatch::new()
            .create_if_absent(FOLLOWS, &edge_id, encode_document(FOLLOWS, &edge_id, &edge)?)
            .add_to_set(USERS, viewer.id.as_str(), "following", target.as_str())
            .add_to_set(USERS, target.as_str(), "followers", viewer.id.as_str());

        let outcome = self.commit("follow", batch).await?;
        if outcome.applied.iter().any(|applied| *applied) {
            debug!("{} followed {}", viewer.id, target);
            self.publish(&viewer.id, target, RelationChangeKind::Followed);
        } else {
            debug!("{} already follows {}", viewer.id, target);
        }
        Ok(())
    }

    pub async fn unfollow(&self, viewer: Option<&Identity>, target: &UserId) -> Result<(), GraphError> {
        let viewer = identity::require(viewer)?;
        if &viewer.id == target {
            return Ok(());
        }

        let edge_id = edge_document_id(target, &viewer.id);
        let batch = WriteBatch::new()
            .delete(FOLLOWS, &edge_id)
            .remove_from_set(USERS, viewer.id.as_str(), "following", target.as_str())
            .remove_from_set(USERS, target.as_str(), "followers", viewer.id.as_str());

        let outcome = self.commit("unfollow", batch).await?;
        if outcome.applied.iter().any(|applied| *applied) {
            debug!("{} unfollowed {}", viewer.id, target);
            self.publish(&viewer.id, target, RelationChangeKind::Unfollowed);
        }
        Ok(())
    }

    fn publish(&self, follower: &UserId, followed: &UserId, kind: RelationChangeKind) {
        // No receivers is the common case.
        let _ = self.changes.send(RelationChange {
            follower: follower.clone(),
            followed: followed.clone(),
            kind,
        });
    }

    /// Profiles the viewer follows, in no particular order.
    pub async fn list_following(&self, viewer: Option<&Identity>) -> Result<Vec<UserProfile>, GraphError> {
        let viewer = identity::require(viewer)?;
        let profile = self.require_profile(&viewer.id).await?;
        self.resolve_profiles(profile.following).await
    }

    /// Profiles following the viewer, in no particular order.
    pub async fn list_followers(&self, viewer: Option<&Identity>) -> Result<Vec<UserProfile>, GraphError> {
        let viewer = identity::require(viewer)?;
        let profile = self.require_profile(&viewer.id).await?;
        self.resolve_profiles(profile.followers).await
    }

    /// [`list_following`](Self::list_following) that gives up as soon as
    /// `cancel` fires, discarding in-flight lookups.
    pub async fn list_following_with(
        &self,
        viewer: Option<&Identity>,
        cancel: &CancellationToken,
    ) -> Result<Vec<UserProfile>, GraphError> {
        until_cancelled(cancel, self.list_following(viewer)).await
    }

    pub async fn list_followers_with(
        &self,
        viewer: Option<&Identity>,
        cancel: &CancellationToken,
    ) -> Result<Vec<UserProfile>, GraphError> {
        until_cancelled(cancel, self.list_followers(viewer)).await
    }

    /// Users the viewer follows who also follow the viewer back.
    pub async fn mutual_follows(&self, viewer: Option<&Identity>) -> Result<Vec<UserProfile>, GraphError> {
        let viewer = identity::require(viewer)?;
        let profile = self.require_profile(&viewer.id).await?;
        let mutual: BTreeSet<UserId> = profile.following.intersection(&profile.followers).cloned().collect();
        self.resolve_profiles(mutual).await
    }

    /// Looks up every id concurrently; ids without a profile are skipped.
    pub async fn resolve_profiles<I>(&self, ids: I) -> Result<Vec<UserProfile>, GraphError>
    where
        I: IntoIterator<Item = UserId>,
    {
        let lookups = ids.into_iter().map(|id| async move {
            let profile = self.get_profile(&id).await;
            (id, profile)
        });

        let results = join_all(lookups).await;
        let mut profiles = Vec::with_capacity(results.len());
        for (id, result) in results {
            match result? {
                Some(profile) => profiles.push(profile),
                None => warn!("dangling reference: profile '{id}' no longer exists, skipping"),
            }
        }
        Ok(profiles)
    }

    pub async fn relation_counts(&self, user_id: &UserId) -> Result<RelationCounts, GraphError> {
        Ok(self.require_profile(user_id).await?.counts())
    }

    /// Creates the profile on first sight of an identity; never overwrites
    /// an existing one.
    pub async fn ensure_profile_initialized(
        &self,
        identity: &Identity,
        defaults: ProfileDefaults,
    ) -> Result<GetOrCreateResult<UserProfile>, GraphError> {
        identity.validate()?;
        if let Some(existing) = self.get_profile(&identity.id).await? {
            return Ok(GetOrCreateResult::Found(existing));
        }

        let mut defaults = defaults;
        if self.username_taken(&defaults.username, &identity.id).await? {
            let fallback = fallback_username(&identity.id);
            debug!("username '{}' is taken, using '{fallback}' for {}", defaults.username, identity.id);
            defaults.username = fallback;
        }
        let profile = UserProfile::new(identity.id.clone(), defaults, Utc::now());
        let id = identity.id.as_str();
        let batch = WriteBatch::new().create_if_absent(USERS, id, encode_document(USERS, id, &profile)?);

        let outcome = self.commit("ensure_profile", batch).await?;
        if outcome.applied(0) {
            debug!("created profile {id}");
            return Ok(GetOrCreateResult::Created(profile));
        }
        // Another writer created it between our read and the batch.
        let existing = self.require_profile(&identity.id).await?;
        Ok(GetOrCreateResult::Found(existing))
    }

    /// Whether a profile other than `owner` already uses `username`. Not
    /// atomic with the write that follows it.
    pub(crate) async fn username_taken(&self, username: &str, owner: &UserId) -> Result<bool, GraphError> {
        Ok(self
            .query(USERS, &[FieldFilter::eq("username", username)])
            .await?
            .into_iter()
            .any(|doc| doc.id != owner.as_str()))
    }

    /// Rebuilds `user_id`'s relation sets from the edge documents.
    pub async fn reconcile(&self, user_id: &UserId) -> Result<ReconcileReport, GraphError> {
        let profile = self.require_profile(user_id).await?;
        let outgoing = self.edges(FieldFilter::eq("follower_id", user_id.as_str())).await?;
        let incoming = self.edges(FieldFilter::eq("followed_id", user_id.as_str())).await?;

        let following: BTreeSet<UserId> = outgoing.into_iter().map(|edge| edge.followed_id).collect();
        let followers: BTreeSet<UserId> = incoming.into_iter().map(|edge| edge.follower_id).collect();

        let report = ReconcileReport {
            user_id: user_id.to_string(),
            following_added: difference(&following, &profile.following),
            following_removed: difference(&profile.following, &following),
            followers_added: difference(&followers, &profile.followers),
            followers_removed: difference(&profile.followers, &followers),
        };
        if report.is_clean() {
            return Ok(report);
        }

        warn!(
            "reconciling {user_id}: following +{}/-{}, followers +{}/-{}",
            report.following_added.len(),
            report.following_removed.len(),
            report.followers_added.len(),
            report.followers_removed.len()
        );
        let patch = json!({
            "following": following,
            "followers": followers,
            "updated_at": Utc::now(),
        });
        self.commit(
            "reconcile",
            WriteBatch::new().set(USERS, user_id.as_str(), patch, SetOptions::merge()),
        )
        .await?;
        Ok(report)
    }

    async fn edges(&self, filter: FieldFilter) -> Result<Vec<FollowEdge>, GraphError> {
        self.query(FOLLOWS, &[filter])
            .await?
            .into_iter()
            .map(|doc| decode_document(FOLLOWS, &doc.id, doc.data))
            .collect()
    }
}

fn difference(left: &BTreeSet<UserId>, right: &BTreeSet<UserId>) -> Vec<String> {
    left.difference(right).map(UserId::to_string).collect()
}

pub(crate) async fn until_cancelled<T, F>(cancel: &CancellationToken, work: F) -> Result<T, GraphError>
where
    F: Future<Output = Result<T, GraphError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(GraphError::Cancelled),
        result = work => result,
    }
}
