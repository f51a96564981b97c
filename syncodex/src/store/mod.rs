//! Document store seam.
//!
//! The services only ever talk to a [`DocumentStore`]: keyed JSON documents
//! grouped in collections, equality queries, and atomic write batches. Two
//! backends ship with the crate, [`MemoryStore`] and [`RedisStore`].

mod memory;
mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

use serde::Serialize;
use serde_json::Value;

use crate::errors::StoreError;

/// One write inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WriteOp {
    /// Replace the document, or shallow-merge top-level fields when `merge`.
    Set {
        collection: String,
        id: String,
        document: Value,
        merge: bool,
    },
    /// Write the document only if no document exists at that path.
    CreateIfAbsent {
        collection: String,
        id: String,
        document: Value,
    },
    Delete { collection: String, id: String },
    /// Append `value` to the array `field` unless already present.
    /// The document must exist, otherwise the whole batch fails.
    AddToSet {
        collection: String,
        id: String,
        field: String,
        value: Value,
    },
    /// Remove `value` from the array `field`. Missing documents are skipped.
    RemoveFromSet {
        collection: String,
        id: String,
        field: String,
        value: Value,
    },
}

impl WriteOp {
    pub fn collection(&self) -> &str {
        match self {
            WriteOp::Set { collection, .. }
            | WriteOp::CreateIfAbsent { collection, .. }
            | WriteOp::Delete { collection, .. }
            | WriteOp::AddToSet { collection, .. }
            | WriteOp::RemoveFromSet { collection, .. } => collection,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            WriteOp::Set { id, .. }
            | WriteOp::CreateIfAbsent { id, .. }
            | WriteOp::Delete { id, .. }
            | WriteOp::AddToSet { id, .. }
            | WriteOp::RemoveFromSet { id, .. } => id,
        }
    }
}

/// Ordered list of writes applied all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WriteBatch {
    pub ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, collection: &str, id: &str, document: Value, options: SetOptions) -> Self {
        self.ops.push(WriteOp::Set {
            collection: collection.to_string(),
            id: id.to_string(),
            document,
            merge: options.merge,
        });
        self
    }

    pub fn create_if_absent(mut self, collection: &str, id: &str, document: Value) -> Self {
        self.ops.push(WriteOp::CreateIfAbsent {
            collection: collection.to_string(),
            id: id.to_string(),
            document,
        });
        self
    }

    pub fn delete(mut self, collection: &str, id: &str) -> Self {
        self.ops.push(WriteOp::Delete {
            collection: collection.to_string(),
            id: id.to_string(),
        });
        self
    }

    pub fn add_to_set(mut self, collection: &str, id: &str, field: &str, value: impl Into<Value>) -> Self {
        self.ops.push(WriteOp::AddToSet {
            collection: collection.to_string(),
            id: id.to_string(),
            field: field.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn remove_from_set(mut self, collection: &str, id: &str, field: &str, value: impl Into<Value>) -> Self {
        self.ops.push(WriteOp::RemoveFromSet {
            collection: collection.to_string(),
            id: id.to_string(),
            field: field.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Per-op report of whether the write changed anything, in batch order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub applied: Vec<bool>,
}

impl BatchOutcome {
    pub fn applied(&self, index: usize) -> bool {
        self.applied.get(index).copied().unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    pub merge: bool,
}

impl SetOptions {
    pub fn merge() -> Self {
        Self { merge: true }
    }

    pub fn replace() -> Self {
        Self { merge: false }
    }
}

/// Equality predicate on a top-level document field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub value: Value,
}

impl FieldFilter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, document: &Value) -> bool {
        document.get(&self.field) == Some(&self.value)
    }
}

/// A document returned by [`DocumentStore::query`].
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

#[allow(async_fn_in_trait)]
pub trait DocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    /// Returns every document in `collection` matching all `filters`, in no
    /// particular order.
    async fn query(&self, collection: &str, filters: &[FieldFilter]) -> Result<Vec<Document>, StoreError>;

    async fn commit(&self, batch: WriteBatch) -> Result<BatchOutcome, StoreError>;

    async fn set(&self, collection: &str, id: &str, document: Value, options: SetOptions) -> Result<(), StoreError> {
        self.commit(WriteBatch::new().set(collection, id, document, options))
            .await
            .map(|_| ())
    }

    /// Deletes a document, returning whether it existed.
    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let outcome = self.commit(WriteBatch::new().delete(collection, id)).await?;
        Ok(outcome.applied(0))
    }

    async fn exists(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        Ok(self.get(collection, id).await?.is_some())
    }
}

/// Decodes a raw stored document; corrupt bytes are reported against the
/// document they came from.
pub fn parse_document(collection: &str, id: &str, raw: &str) -> Result<Value, StoreError> {
    serde_json::from_str(raw).map_err(|err| StoreError::malformed(collection, id, err))
}

/// Shallow merge of `patch` into `base` when both are objects; otherwise
/// `patch` replaces `base`.
pub(crate) fn merge_documents(base: &mut Value, patch: Value) {
    match (base, patch) {
        (Value::Object(base), Value::Object(patch)) => {
            for (key, value) in patch {
                base.insert(key, value);
            }
        }
        (base, patch) => *base = patch,
    }
}
