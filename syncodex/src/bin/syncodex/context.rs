use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use serde_json::Value;
use syncodex::{
    ChannelService, FollowGraphService, Identity, MemoryStore, RedisStore, StoreError, SyncodexConfig, UserId,
    config::StoreBackend,
    store::{BatchOutcome, Document, DocumentStore, FieldFilter, WriteBatch},
};

use crate::output::OutputManager;

/// Store selected by `[store] backend`.
pub enum CliStore {
    Memory(MemoryStore),
    Redis(RedisStore),
}

impl DocumentStore for CliStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        match self {
            CliStore::Memory(store) => store.get(collection, id).await,
            CliStore::Redis(store) => store.get(collection, id).await,
        }
    }

    async fn query(&self, collection: &str, filters: &[FieldFilter]) -> Result<Vec<Document>, StoreError> {
        match self {
            CliStore::Memory(store) => store.query(collection, filters).await,
            CliStore::Redis(store) => store.query(collection, filters).await,
        }
    }

    async fn commit(&self, batch: WriteBatch) -> Result<BatchOutcome, StoreError> {
        match self {
            CliStore::Memory(store) => store.commit(batch).await,
            CliStore::Redis(store) => store.commit(batch).await,
        }
    }
}

/// Everything a command needs: the signed-in user and the services.
pub struct AppContext {
    pub identity: Option<Identity>,
    pub graph: FollowGraphService<CliStore>,
    pub channel: ChannelService<CliStore>,
}

impl AppContext {
    pub async fn connect(config_path: Option<&Path>, user: Option<&str>, output: &OutputManager) -> Result<Self> {
        let config = SyncodexConfig::load(config_path)?;
        let identity = user.map(parse_user).transpose()?.map(Identity::new);

        let store = match config.store.backend {
            StoreBackend::Memory => {
                output.warning("Using the in-memory store; nothing is kept after this command exits.");
                CliStore::Memory(MemoryStore::new())
            }
            StoreBackend::Redis => {
                let url = config
                    .redis_url()
                    .context("REDIS_URL environment variable not set. Set it to connect to Redis.")?;
                output.progress("Connecting to Redis");
                let store = RedisStore::connect(&url, config.store.prefix.as_str(), config.store.service.as_str())
                    .await
                    .context("Failed to connect to Redis")?;
                output.clear_line();
                output.verbose(&format!("Connected to {url}"));
                CliStore::Redis(store)
            }
        };

        let graph = FollowGraphService::new(Arc::new(store)).with_retry(config.retry.policy());
        Ok(Self {
            identity,
            channel: ChannelService::new(graph.clone()),
            graph,
        })
    }

    pub fn viewer(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// The user a command acts on: an explicit argument, else the signed-in user.
    pub fn subject(&self, user: Option<&str>) -> Result<UserId> {
        match (user, &self.identity) {
            (Some(user), _) => parse_user(user),
            (None, Some(identity)) => Ok(identity.id.clone()),
            (None, None) => anyhow::bail!("No user given. Pass one or sign in with --as / SYNCODEX_USER."),
        }
    }
}

pub fn parse_user(user: &str) -> Result<UserId> {
    UserId::parse(user).with_context(|| format!("'{user}' is not a valid user id"))
}
