use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::filter::Filter;
use crate::types::{Collection, UpsertAck};

use super::manager::{DatabaseError, StoreClient, StoreConnector};

#[derive(Debug, Clone)]
struct StoredDocument {
    id: Uuid,
    doc: Value,
}

#[derive(Default)]
struct MemoryInner {
    collections: RwLock<HashMap<Collection, Vec<StoredDocument>>>,
    opened: AtomicUsize,
    closed: AtomicUsize,
    unreachable: AtomicBool,
    failing: AtomicBool,
}

/// In-process document store selected by `memory://`.
///
/// Clones share the same documents and counters. The counters record every
/// client opened and closed, and the two switches simulate an unreachable
/// store (connect fails) or a broken one (connect succeeds, every operation
/// fails).
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opened(&self) -> usize {
        self.inner.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.inner.closed.load(Ordering::SeqCst)
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.inner.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub fn set_failing(&self, failing: bool) {
        self.inner.failing.store(failing, Ordering::SeqCst);
    }

    /// Insert a document directly, bypassing any client
    pub async fn seed(&self, collection: Collection, doc: Value) {
        let mut collections = self.inner.collections.write().await;
        collections
            .entry(collection)
            .or_default()
            .push(StoredDocument { id: Uuid::new_v4(), doc });
    }

    pub async fn documents(&self, collection: Collection) -> Vec<Value> {
        let collections = self.inner.collections.read().await;
        collections
            .get(&collection)
            .map(|docs| docs.iter().map(|d| d.doc.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl StoreConnector for MemoryStore {
    async fn connect(&self) -> Result<Box<dyn StoreClient>, DatabaseError> {
        if self.inner.unreachable.load(Ordering::SeqCst) {
            return Err(DatabaseError::ConnectionError("memory store is unreachable".to_string()));
        }
        self.inner.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryClient { inner: self.inner.clone() }))
    }
}

struct MemoryClient {
    inner: Arc<MemoryInner>,
}

impl MemoryClient {
    fn check(&self) -> Result<(), DatabaseError> {
        if self.inner.failing.load(Ordering::SeqCst) {
            return Err(DatabaseError::QueryError("memory store rejected the operation".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl StoreClient for MemoryClient {
    async fn find(&mut self, collection: Collection, filter: &Filter) -> Result<Vec<Value>, DatabaseError> {
        self.check()?;
        let collections = self.inner.collections.read().await;
        Ok(collections
            .get(&collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(&d.doc)).map(|d| d.doc.clone()).collect())
            .unwrap_or_default())
    }

    async fn find_one(&mut self, collection: Collection, filter: &Filter) -> Result<Option<Value>, DatabaseError> {
        self.check()?;
        let collections = self.inner.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.iter().find(|d| filter.matches(&d.doc)))
            .map(|d| d.doc.clone()))
    }

    async fn replace_one(&mut self, collection: Collection, filter: &Filter, replacement: Value) -> Result<UpsertAck, DatabaseError> {
        self.check()?;
        let mut collections = self.inner.collections.write().await;
        let docs = collections.entry(collection).or_default();

        if let Some(existing) = docs.iter_mut().find(|d| filter.matches(&d.doc)) {
            let modified = existing.doc != replacement;
            existing.doc = replacement;
            return Ok(UpsertAck::matched(modified));
        }

        let id = Uuid::new_v4();
        docs.push(StoredDocument { id, doc: replacement });
        Ok(UpsertAck::upserted(id.to_string()))
    }

    async fn set_one(&mut self, collection: Collection, filter: &Filter, field: &str, value: Value) -> Result<UpsertAck, DatabaseError> {
        self.check()?;
        let mut collections = self.inner.collections.write().await;
        let docs = collections.entry(collection).or_default();

        if let Some(existing) = docs.iter_mut().find(|d| filter.matches(&d.doc)) {
            let modified = existing.doc.get(field) != Some(&value);
            match existing.doc.as_object_mut() {
                Some(obj) => {
                    obj.insert(field.to_string(), value);
                }
                None => {
                    return Err(DatabaseError::QueryError(format!(
                        "cannot set '{}' on a non-object document in {}",
                        field, collection
                    )))
                }
            }
            return Ok(UpsertAck::matched(modified));
        }

        let mut doc: Map<String, Value> = filter.equality_fields();
        doc.insert(field.to_string(), value);
        let id = Uuid::new_v4();
        docs.push(StoredDocument { id, doc: Value::Object(doc) });
        Ok(UpsertAck::upserted(id.to_string()))
    }

    async fn close(self: Box<Self>) -> Result<(), DatabaseError> {
        self.inner.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn replace_one_upserts_then_replaces() {
        let store = MemoryStore::new();
        let mut client = store.connect().await.unwrap();
        let filter = Filter::eq("uuid", "b1");

        let first = client.replace_one(Collection::Bookdata, &filter, json!({"uuid": "b1", "title": "A"})).await.unwrap();
        assert_eq!(first.upserted_count, 1);

        let second = client.replace_one(Collection::Bookdata, &filter, json!({"uuid": "b1", "title": "B"})).await.unwrap();
        assert_eq!((second.matched_count, second.modified_count), (1, 1));

        let unchanged = client.replace_one(Collection::Bookdata, &filter, json!({"uuid": "b1", "title": "B"})).await.unwrap();
        assert_eq!((unchanged.matched_count, unchanged.modified_count), (1, 0));

        assert_eq!(store.documents(Collection::Bookdata).await, vec![json!({"uuid": "b1", "title": "B"})]);
        client.close().await.unwrap();
        assert_eq!((store.opened(), store.closed()), (1, 1));
    }

    #[tokio::test]
    async fn set_one_seeds_new_documents_from_the_filter() {
        let store = MemoryStore::new();
        let mut client = store.connect().await.unwrap();
        let filter = Filter::eq("key", "alice");

        client.set_one(Collection::Uuidmap, &filter, "alice", json!("u-1")).await.unwrap();
        let ack = client.set_one(Collection::Uuidmap, &filter, "alice", json!("u-2")).await.unwrap();
        assert_eq!(ack.matched_count, 1);

        assert_eq!(store.documents(Collection::Uuidmap).await, vec![json!({"key": "alice", "alice": "u-2"})]);
    }

    #[tokio::test]
    async fn failing_mode_rejects_operations_but_still_connects() {
        let store = MemoryStore::new();
        store.set_failing(true);
        let mut client = store.connect().await.unwrap();
        assert!(client.find(Collection::Userdata, &Filter::All).await.is_err());
        client.close().await.unwrap();
        assert_eq!(store.closed(), 1);
    }
}
