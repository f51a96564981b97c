use std::sync::LazyLock;

use redis::{Script, aio::ConnectionManager, cmd};
use serde::Serialize;
use serde_json::Value;

use super::{BatchOutcome, Document, DocumentStore, FieldFilter, WriteBatch, WriteOp, parse_document};
use crate::{errors::StoreError, keys::KeyContext};

pub const WRITE_BATCH_SCRIPT_BODY: &str = include_str!("../../lua/write_batch.lua");

pub static WRITE_BATCH_SCRIPT: LazyLock<Script> = LazyLock::new(|| Script::new(WRITE_BATCH_SCRIPT_BODY));

const SCAN_COUNT: usize = 1000;
const MGET_CHUNK: usize = 256;

/// Documents stored as JSON strings under `prefix:service:collection:id`.
///
/// Batches run inside a single Lua script so they are applied atomically.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    prefix: String,
    service: String,
}

impl RedisStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            conn,
            prefix: prefix.into(),
            service: service.into(),
        }
    }

    /// Create a store from a Redis connection URL.
    pub async fn connect(url: &str, prefix: impl Into<String>, service: impl Into<String>) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::new(conn, prefix, service))
    }

    pub fn key_context(&self) -> KeyContext<'_> {
        KeyContext::new(&self.prefix, &self.service)
    }

    /// Delete every key under this store's prefix and service (test cleanup).
    pub async fn clear(&self) -> Result<u64, StoreError> {
        let pattern = format!("{}:{}:*", self.prefix, self.service);
        let mut conn = self.conn.clone();
        let keys = scan_keys(&mut conn, &pattern).await?;
        let mut total_deleted = 0;
        for chunk in keys.chunks(MGET_CHUNK) {
            let deleted: u64 = cmd("DEL").arg(chunk).query_async(&mut conn).await?;
            total_deleted += deleted;
        }
        Ok(total_deleted)
    }
}

async fn scan_keys(conn: &mut ConnectionManager, pattern: &str) -> Result<Vec<String>, StoreError> {
    let mut cursor: u64 = 0;
    let mut keys = Vec::new();
    loop {
        let (next_cursor, batch): (u64, Vec<String>) = cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(SCAN_COUNT)
            .query_async(conn)
            .await?;
        keys.extend(batch);
        cursor = next_cursor;
        if cursor == 0 {
            break;
        }
    }
    Ok(keys)
}

/// Wire shape of one op handed to `write_batch.lua`.
#[derive(Debug, Serialize)]
struct ScriptOp<'a> {
    op: &'static str,
    key: String,
    collection: &'a str,
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    document: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    merge: bool,
}

#[derive(Debug, Serialize)]
struct ScriptPayload<'a> {
    ops: Vec<ScriptOp<'a>>,
}

fn script_op<'a>(keys: &KeyContext<'_>, op: &'a WriteOp) -> Result<ScriptOp<'a>, StoreError> {
    let mut encoded = ScriptOp {
        op: "",
        key: keys.document(op.collection(), op.id()),
        collection: op.collection(),
        id: op.id(),
        document: None,
        field: None,
        value: None,
        merge: false,
    };
    match op {
        WriteOp::Set { document, merge, .. } => {
            encoded.op = "set";
            encoded.document = Some(serde_json::to_string(document)?);
            encoded.merge = *merge;
        }
        WriteOp::CreateIfAbsent { document, .. } => {
            encoded.op = "create_if_absent";
            encoded.document = Some(serde_json::to_string(document)?);
        }
        WriteOp::Delete { .. } => {
            encoded.op = "delete";
        }
        WriteOp::AddToSet { field, value, .. } => {
            encoded.op = "add_to_set";
            encoded.field = Some(field.as_str());
            encoded.value = Some(serde_json::to_string(value)?);
        }
        WriteOp::RemoveFromSet { field, value, .. } => {
            encoded.op = "remove_from_set";
            encoded.field = Some(field.as_str());
            encoded.value = Some(serde_json::to_string(value)?);
        }
    }
    Ok(encoded)
}

fn parse_script_response(raw: &str) -> Result<BatchOutcome, StoreError> {
    let value: Value = serde_json::from_str(raw)?;

    if let Some(code) = value.get("error").and_then(Value::as_str) {
        return match code {
            "document_not_found" => Err(StoreError::NotFound {
                collection: value.get("collection").and_then(Value::as_str).unwrap_or_default().to_string(),
                id: value.get("id").and_then(Value::as_str).unwrap_or_default().to_string(),
            }),
            other => Err(StoreError::Script {
                message: other.to_string().into(),
            }),
        };
    }

    let applied = value
        .get("applied")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(|item| item.as_bool().unwrap_or(false)).collect())
        .unwrap_or_default();
    Ok(BatchOutcome { applied })
}

impl DocumentStore for RedisStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let key = self.key_context().document(collection, id);
        let mut conn = self.conn.clone();
        let raw: Option<String> = cmd("GET").arg(&key).query_async(&mut conn).await?;
        match raw {
            Some(json) => parse_document(collection, id, &json).map(Some),
            None => Ok(None),
        }
    }

    async fn query(&self, collection: &str, filters: &[FieldFilter]) -> Result<Vec<Document>, StoreError> {
        let keys = self.key_context();
        let mut conn = self.conn.clone();
        let all_keys = scan_keys(&mut conn, &keys.collection_pattern(collection)).await?;

        let mut documents = Vec::new();
        for chunk in all_keys.chunks(MGET_CHUNK) {
            let raws: Vec<Option<String>> = cmd("MGET").arg(chunk).query_async(&mut conn).await?;
            for (key, raw) in chunk.iter().zip(raws) {
                let (Some(raw), Some(id)) = (raw, keys.document_id(collection, key)) else {
                    continue;
                };
                let data = parse_document(collection, id, &raw)?;
                if filters.iter().all(|filter| filter.matches(&data)) {
                    documents.push(Document { id: id.to_string(), data });
                }
            }
        }
        Ok(documents)
    }

    async fn commit(&self, batch: WriteBatch) -> Result<BatchOutcome, StoreError> {
        if batch.is_empty() {
            return Ok(BatchOutcome::default());
        }
        let keys = self.key_context();
        let payload = ScriptPayload {
            ops: batch
                .ops
                .iter()
                .map(|op| script_op(&keys, op))
                .collect::<Result<_, _>>()?,
        };
        let payload = serde_json::to_string(&payload)?;

        let mut conn = self.conn.clone();
        let mut invocation = WRITE_BATCH_SCRIPT.prepare_invoke();
        invocation.arg(payload);
        let raw: String = invocation.invoke_async(&mut conn).await?;
        parse_script_response(&raw)
    }
}
