pub(crate) use std::{sync::Arc, time::Duration};

pub(crate) use syncodex::{
    FollowGraphService, GraphError, Identity, MemoryStore, ProfileDefaults, RetryPolicy, UserId,
    store::DocumentStore,
};

use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use serde_json::Value;
use syncodex::{
    StoreError,
    store::{BatchOutcome, Document, FieldFilter, WriteBatch},
};

/// Memory store wrapper that counts calls and injects latency or failures.
#[derive(Default)]
pub(crate) struct InstrumentedStore {
    inner: MemoryStore,
    calls: AtomicUsize,
    transient_failures: AtomicUsize,
    fail_all: AtomicBool,
    delays: Mutex<HashMap<String, Duration>>,
}

impl InstrumentedStore {
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The next `count` calls fail with a transient error.
    pub(crate) fn fail_next(&self, count: usize) {
        self.transient_failures.store(count, Ordering::SeqCst);
    }

    pub(crate) fn set_unavailable(&self, unavailable: bool) {
        self.fail_all.store(unavailable, Ordering::SeqCst);
    }

    /// Delay every read of `collection/id`.
    pub(crate) fn delay(&self, collection: &str, id: &str, delay: Duration) {
        self.delays
            .lock()
            .unwrap()
            .insert(format!("{collection}/{id}"), delay);
    }

    async fn before_call(&self, collection: &str, id: Option<&str>) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = id.and_then(|id| self.delays.lock().unwrap().get(&format!("{collection}/{id}")).copied());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("injected outage"));
        }
        let remaining = self.transient_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.transient_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::unavailable("injected transient failure"));
        }
        Ok(())
    }
}

impl DocumentStore for InstrumentedStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        self.before_call(collection, Some(id)).await?;
        self.inner.get(collection, id).await
    }

    async fn query(&self, collection: &str, filters: &[FieldFilter]) -> Result<Vec<Document>, StoreError> {
        self.before_call(collection, None).await?;
        self.inner.query(collection, filters).await
    }

    async fn commit(&self, batch: WriteBatch) -> Result<BatchOutcome, StoreError> {
        self.before_call("batch", None).await?;
        self.inner.commit(batch).await
    }
}

pub(crate) fn uid(id: &str) -> UserId {
    UserId::parse(id).expect("valid user id")
}

pub(crate) fn signed_in(id: &str) -> Identity {
    Identity::new(uid(id)).with_display_name(format!("Display {id}"))
}

pub(crate) fn graph() -> (Arc<InstrumentedStore>, FollowGraphService<InstrumentedStore>) {
    let store = Arc::new(InstrumentedStore::default());
    let graph = FollowGraphService::new(Arc::clone(&store)).with_retry(RetryPolicy {
        max_attempts: 3,
        initial_backoff: Duration::from_millis(5),
        max_backoff: Duration::from_millis(20),
    });
    (store, graph)
}

/// Creates a profile for each id, as a first sign-in would.
pub(crate) async fn seed<S: DocumentStore>(graph: &FollowGraphService<S>, ids: &[&str]) {
    for id in ids {
        let identity = signed_in(id);
        graph
            .ensure_profile_initialized(&identity, ProfileDefaults::from_identity(&identity))
            .await
            .expect("seed profile");
    }
}

pub(crate) fn ids(profiles: &[syncodex::UserProfile]) -> Vec<String> {
    let mut ids: Vec<String> = profiles.iter().map(|profile| profile.id.to_string()).collect();
    ids.sort();
    ids
}
