use std::{collections::HashMap, sync::Mutex};

use serde_json::Value;
use syncodex::{
    StoreError,
    store::{BatchOutcome, Document, FieldFilter, WriteBatch, parse_document},
};

use crate::support::*;

/// Memory store whose reads can be overridden with raw stored bytes.
#[derive(Default)]
struct RawBytesStore {
    inner: MemoryStore,
    raw: Mutex<HashMap<(String, String), String>>,
}

impl RawBytesStore {
    fn overwrite(&self, collection: &str, id: &str, raw: &str) {
        self.raw
            .lock()
            .unwrap()
            .insert((collection.to_string(), id.to_string()), raw.to_string());
    }

    fn raw(&self, collection: &str, id: &str) -> Option<String> {
        self.raw
            .lock()
            .unwrap()
            .get(&(collection.to_string(), id.to_string()))
            .cloned()
    }
}

impl DocumentStore for RawBytesStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        match self.raw(collection, id) {
            Some(raw) => parse_document(collection, id, &raw).map(Some),
            None => self.inner.get(collection, id).await,
        }
    }

    async fn query(&self, collection: &str, filters: &[FieldFilter]) -> Result<Vec<Document>, StoreError> {
        let mut documents = self.inner.query(collection, filters).await?;
        for document in &mut documents {
            if let Some(raw) = self.raw(collection, &document.id) {
                document.data = parse_document(collection, &document.id, &raw)?;
            }
        }
        Ok(documents)
    }

    async fn commit(&self, batch: WriteBatch) -> Result<BatchOutcome, StoreError> {
        self.inner.commit(batch).await
    }
}

/// Decodes with a bare `?`, so failures arrive as `StoreError::Serialization`.
struct UntypedDecodeStore;

impl DocumentStore for UntypedDecodeStore {
    async fn get(&self, _collection: &str, _id: &str) -> Result<Option<Value>, StoreError> {
        Ok(Some(serde_json::from_str("not json{")?))
    }

    async fn query(&self, _collection: &str, _filters: &[FieldFilter]) -> Result<Vec<Document>, StoreError> {
        Ok(Vec::new())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<BatchOutcome, StoreError> {
        Ok(BatchOutcome {
            applied: vec![false; batch.len()],
        })
    }
}

#[tokio::test]
async fn corrupt_profile_is_reported_as_malformed() {
    let store = Arc::new(RawBytesStore::default());
    let graph = FollowGraphService::new(Arc::clone(&store));
    seed(&graph, &["u1", "u2"]).await;
    store.overwrite("users", "u2", "not json{");

    let err = graph.get_profile(&uid("u2")).await.unwrap_err();

    assert!(matches!(
        err,
        GraphError::MalformedDocument { ref collection, ref id, .. } if collection == "users" && id == "u2"
    ));
    assert_eq!(err.user_message(), "Stored data is corrupted; please contact support.");
}

#[tokio::test]
async fn corrupt_followed_profile_fails_listing_fast() {
    let store = Arc::new(RawBytesStore::default());
    let graph = FollowGraphService::new(Arc::clone(&store));
    seed(&graph, &["u1", "u2"]).await;
    let u1 = signed_in("u1");
    graph.follow(Some(&u1), &uid("u2")).await.unwrap();
    store.overwrite("users", "u2", "{\"id\": ");

    let err = graph.list_following(Some(&u1)).await.unwrap_err();
    assert!(matches!(err, GraphError::MalformedDocument { ref id, .. } if id == "u2"));
}

#[tokio::test]
async fn corrupt_edge_fails_reconcile_with_its_id() {
    let store = Arc::new(RawBytesStore::default());
    let graph = FollowGraphService::new(Arc::clone(&store));
    seed(&graph, &["u1", "u2"]).await;
    graph.follow(Some(&signed_in("u1")), &uid("u2")).await.unwrap();
    store.overwrite("follows", "u2.u1", "[[[");

    let err = graph.reconcile(&uid("u1")).await.unwrap_err();
    assert!(matches!(err, GraphError::MalformedDocument { ref id, .. } if id == "u2.u1"));
}

#[tokio::test]
async fn untyped_decode_failure_is_still_malformed() {
    let graph = FollowGraphService::new(Arc::new(UntypedDecodeStore));

    let err = graph.get_profile(&uid("u1")).await.unwrap_err();

    assert!(matches!(err, GraphError::MalformedDocument { .. }));
    assert_ne!(err.user_message(), "Could not reach the server. Please try again.");
}
