//! SynCodeX follow graph core library.
//!
//! Follow/unfollow with bidirectional consistency, relation listings with
//! concurrent profile lookups, live relation snapshots, and the channel
//! (profile + public projects) operations built on top, all over a pluggable
//! [`DocumentStore`].

pub mod channel;
pub mod config;
pub mod errors;
pub mod graph;
pub mod id;
pub mod identity;
pub mod keys;
pub mod models;
pub mod retry;
pub mod store;
pub mod validators;
pub mod watch;

pub use channel::{ChannelService, ChannelView};
pub use config::SyncodexConfig;
pub use errors::*;
pub use graph::{FollowGraphService, GetOrCreateResult, ReconcileReport, RelationChange, RelationChangeKind};
pub use id::UserId;
pub use identity::Identity;
pub use models::{
    FollowEdge, NewProject, ProfileDefaults, ProfilePatch, Project, RelationCounts, RelationStatus, UserProfile,
    Visibility,
};
pub use retry::RetryPolicy;
pub use store::{DocumentStore, MemoryStore, RedisStore};
pub use watch::{RelationSnapshot, RelationSubscription};

// Re-export so callers can cancel listings without depending on tokio-util directly.
pub use tokio_util::sync::CancellationToken;
