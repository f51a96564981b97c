use std::{
    collections::{BTreeMap, HashMap},
    sync::RwLock,
};

use serde_json::Value;

use super::{BatchOutcome, Document, DocumentStore, FieldFilter, WriteBatch, WriteOp, merge_documents};
use crate::errors::StoreError;

type DocumentKey = (String, String);

/// In-process store used by tests and the `memory` CLI backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<BTreeMap<DocumentKey, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in `collection`.
    pub fn len(&self, collection: &str) -> usize {
        self.documents
            .read()
            .map(|docs| docs.keys().filter(|(c, _)| c == collection).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().map(|docs| docs.is_empty()).unwrap_or(true)
    }
}

/// Writes staged on top of the committed map until the whole batch succeeds.
struct Staging<'a> {
    base: &'a BTreeMap<DocumentKey, Value>,
    staged: HashMap<DocumentKey, Option<Value>>,
}

impl<'a> Staging<'a> {
    fn new(base: &'a BTreeMap<DocumentKey, Value>) -> Self {
        Self {
            base,
            staged: HashMap::new(),
        }
    }

    fn read(&self, key: &DocumentKey) -> Option<Value> {
        match self.staged.get(key) {
            Some(entry) => entry.clone(),
            None => self.base.get(key).cloned(),
        }
    }

    fn write(&mut self, key: DocumentKey, value: Option<Value>) {
        self.staged.insert(key, value);
    }

    fn apply(&mut self, op: WriteOp) -> Result<bool, StoreError> {
        let key = (op.collection().to_string(), op.id().to_string());
        match op {
            WriteOp::Set { document, merge, .. } => {
                let next = match self.read(&key) {
                    Some(mut existing) if merge => {
                        merge_documents(&mut existing, document);
                        existing
                    }
                    _ => document,
                };
                self.write(key, Some(next));
                Ok(true)
            }
            WriteOp::CreateIfAbsent { document, .. } => {
                if self.read(&key).is_some() {
                    return Ok(false);
                }
                self.write(key, Some(document));
                Ok(true)
            }
            WriteOp::Delete { .. } => {
                let existed = self.read(&key).is_some();
                self.write(key, None);
                Ok(existed)
            }
            WriteOp::AddToSet { field, value, .. } => {
                let Some(mut document) = self.read(&key) else {
                    return Err(StoreError::NotFound {
                        collection: key.0,
                        id: key.1,
                    });
                };
                let changed = edit_array(&mut document, &field, |items| {
                    if items.contains(&value) {
                        false
                    } else {
                        items.push(value);
                        true
                    }
                })?;
                self.write(key, Some(document));
                Ok(changed)
            }
            WriteOp::RemoveFromSet { field, value, .. } => {
                let Some(mut document) = self.read(&key) else {
                    return Ok(false);
                };
                let changed = edit_array(&mut document, &field, |items| {
                    let before = items.len();
                    items.retain(|item| item != &value);
                    items.len() != before
                })?;
                self.write(key, Some(document));
                Ok(changed)
            }
        }
    }
}

fn edit_array<F>(document: &mut Value, field: &str, edit: F) -> Result<bool, StoreError>
where
    F: FnOnce(&mut Vec<Value>) -> bool,
{
    let Value::Object(fields) = document else {
        return Err(StoreError::Script {
            message: format!("cannot edit field '{field}' of a non-object document").into(),
        });
    };
    let slot = fields.entry(field.to_string()).or_insert_with(|| Value::Array(Vec::new()));
    if !slot.is_array() {
        *slot = Value::Array(Vec::new());
    }
    let Value::Array(items) = slot else {
        return Err(StoreError::Script {
            message: format!("field '{field}' is not an array").into(),
        });
    };
    Ok(edit(items))
}

impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let documents = self
            .documents
            .read()
            .map_err(|_| StoreError::unavailable("memory store lock poisoned"))?;
        Ok(documents.get(&(collection.to_string(), id.to_string())).cloned())
    }

    async fn query(&self, collection: &str, filters: &[FieldFilter]) -> Result<Vec<Document>, StoreError> {
        let documents = self
            .documents
            .read()
            .map_err(|_| StoreError::unavailable("memory store lock poisoned"))?;
        Ok(documents
            .iter()
            .filter(|((c, _), data)| c == collection && filters.iter().all(|filter| filter.matches(data)))
            .map(|((_, id), data)| Document {
                id: id.clone(),
                data: data.clone(),
            })
            .collect())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<BatchOutcome, StoreError> {
        let mut documents = self
            .documents
            .write()
            .map_err(|_| StoreError::unavailable("memory store lock poisoned"))?;

        let mut staging = Staging::new(&documents);
        let mut applied = Vec::with_capacity(batch.len());
        for op in batch.ops {
            applied.push(staging.apply(op)?);
        }

        let staged = staging.staged;
        for (key, value) in staged {
            match value {
                Some(value) => {
                    documents.insert(key, value);
                }
                None => {
                    documents.remove(&key);
                }
            }
        }
        Ok(BatchOutcome { applied })
    }
}
