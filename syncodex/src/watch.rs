//! Live relation snapshots.
//!
//! A [`RelationSubscription`] yields the current viewer→target relation
//! first, then a fresh snapshot after every follow/unfollow made through the
//! same [`FollowGraphService`] that touches either user. Snapshots are always
//! re-read from the store, so a lagging subscriber simply catches up.

use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;

use crate::{
    errors::GraphError,
    graph::{FollowGraphService, RelationChange},
    id::UserId,
    identity::Identity,
    models::RelationCounts,
    store::DocumentStore,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationSnapshot {
    pub viewer: Option<UserId>,
    pub target: UserId,
    pub is_following: bool,
    pub target_counts: RelationCounts,
}

pub struct RelationSubscription<S> {
    graph: FollowGraphService<S>,
    viewer: Option<Identity>,
    target: UserId,
    changes: broadcast::Receiver<RelationChange>,
    cancel: CancellationToken,
    initial_sent: bool,
}

impl<S> FollowGraphService<S>
where
    S: DocumentStore,
{
    /// Starts a live stream of relation snapshots between `viewer` and `target`.
    pub fn subscribe(&self, viewer: Option<&Identity>, target: &UserId) -> RelationSubscription<S> {
        RelationSubscription {
            graph: self.clone(),
            viewer: viewer.cloned(),
            target: target.clone(),
            changes: self.changes(),
            cancel: CancellationToken::new(),
            initial_sent: false,
        }
    }
}

impl<S> RelationSubscription<S>
where
    S: DocumentStore,
{
    /// Token that ends the stream when cancelled, usable from another task.
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Next snapshot, or `None` once the subscription is cancelled.
    pub async fn next(&mut self) -> Option<Result<RelationSnapshot, GraphError>> {
        if self.cancel.is_cancelled() {
            return None;
        }
        if !self.initial_sent {
            self.initial_sent = true;
            return self.emit().await;
        }

        loop {
            let received = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return None,
                received = self.changes.recv() => received,
            };
            match received {
                Ok(change) if self.is_relevant(&change) => return self.emit().await,
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    log::debug!("relation subscription lagged by {skipped} changes, re-reading");
                    return self.emit().await;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// A cancel that lands while the store read is pending ends the stream
    /// without waiting for the read.
    async fn emit(&self) -> Option<Result<RelationSnapshot, GraphError>> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            snapshot = self.snapshot() => Some(snapshot),
        }
    }

    fn is_relevant(&self, change: &RelationChange) -> bool {
        change.touches(&self.target) || self.viewer.as_ref().is_some_and(|viewer| change.touches(&viewer.id))
    }

    async fn snapshot(&self) -> Result<RelationSnapshot, GraphError> {
        let status = self.graph.relation_status(self.viewer.as_ref(), &self.target).await?;
        let target_counts = self.graph.relation_counts(&self.target).await?;
        Ok(RelationSnapshot {
            viewer: self.viewer.as_ref().map(|viewer| viewer.id.clone()),
            target: self.target.clone(),
            is_following: status.is_following,
            target_counts,
        })
    }
}

impl<S> Drop for RelationSubscription<S> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
