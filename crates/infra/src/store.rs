//! Document store abstraction and the in-memory implementation.
//!
//! The store is a plain document database: named collections of JSON
//! documents keyed by UUID. A [`DocumentSession`] is an all-or-nothing write
//! scope; dropping an uncommitted session discards its writes.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A panic while holding the store lock left it unusable.
    #[error("store lock poisoned")]
    Poisoned,
}

/// One transactional scope over the store.
///
/// Reads see committed state plus this session's own uncommitted writes.
/// `commit` applies every buffered write atomically; rollback is simply
/// dropping the session.
pub trait DocumentSession {
    fn find_by_id(&self, collection: &str, id: Uuid) -> Option<JsonValue>;

    /// First document in `collection` matching `predicate`, in key order.
    fn find_one(
        &self,
        collection: &str,
        predicate: &dyn Fn(&JsonValue) -> bool,
    ) -> Option<JsonValue>;

    fn upsert(&mut self, collection: &str, id: Uuid, document: JsonValue);

    fn delete_by_id(&mut self, collection: &str, id: Uuid);

    fn commit(self) -> Result<(), StoreError>;
}

pub trait DocumentStore {
    type Session: DocumentSession;

    fn begin(&self) -> Result<Self::Session, StoreError>;
}

type Collections = HashMap<String, BTreeMap<Uuid, JsonValue>>;

/// In-memory document store for tests/dev.
///
/// Sessions take a snapshot at `begin` and buffer writes; `commit` replays
/// the buffer against shared state under the write lock. Concurrent sessions
/// are last-writer-wins per document, which is enough for a single-process
/// store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentStore {
    inner: Arc<RwLock<Collections>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed state of one document, bypassing any session.
    pub fn committed(&self, collection: &str, id: Uuid) -> Result<Option<JsonValue>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.get(collection).and_then(|c| c.get(&id)).cloned())
    }

    pub fn committed_len(&self, collection: &str) -> Result<usize, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.get(collection).map_or(0, BTreeMap::len))
    }
}

impl DocumentStore for InMemoryDocumentStore {
    type Session = InMemorySession;

    fn begin(&self) -> Result<InMemorySession, StoreError> {
        let snapshot = self
            .inner
            .read()
            .map_err(|_| StoreError::Poisoned)?
            .clone();
        Ok(InMemorySession {
            shared: Arc::clone(&self.inner),
            snapshot,
            writes: Vec::new(),
        })
    }
}

#[derive(Debug)]
enum WriteOp {
    Upsert {
        collection: String,
        id: Uuid,
        document: JsonValue,
    },
    Delete {
        collection: String,
        id: Uuid,
    },
}

#[derive(Debug)]
pub struct InMemorySession {
    shared: Arc<RwLock<Collections>>,
    snapshot: Collections,
    writes: Vec<WriteOp>,
}

impl DocumentSession for InMemorySession {
    fn find_by_id(&self, collection: &str, id: Uuid) -> Option<JsonValue> {
        self.snapshot
            .get(collection)
            .and_then(|c| c.get(&id))
            .cloned()
    }

    fn find_one(
        &self,
        collection: &str,
        predicate: &dyn Fn(&JsonValue) -> bool,
    ) -> Option<JsonValue> {
        self.snapshot
            .get(collection)
            .and_then(|c| c.values().find(|doc| predicate(doc)))
            .cloned()
    }

    fn upsert(&mut self, collection: &str, id: Uuid, document: JsonValue) {
        self.snapshot
            .entry(collection.to_owned())
            .or_default()
            .insert(id, document.clone());
        self.writes.push(WriteOp::Upsert {
            collection: collection.to_owned(),
            id,
            document,
        });
    }

    fn delete_by_id(&mut self, collection: &str, id: Uuid) {
        if let Some(c) = self.snapshot.get_mut(collection) {
            c.remove(&id);
        }
        self.writes.push(WriteOp::Delete {
            collection: collection.to_owned(),
            id,
        });
    }

    fn commit(self) -> Result<(), StoreError> {
        if self.writes.is_empty() {
            return Ok(());
        }
        let mut shared = self.shared.write().map_err(|_| StoreError::Poisoned)?;
        for op in self.writes {
            match op {
                WriteOp::Upsert {
                    collection,
                    id,
                    document,
                } => {
                    shared.entry(collection).or_default().insert(id, document);
                }
                WriteOp::Delete { collection, id } => {
                    if let Some(c) = shared.get_mut(&collection) {
                        c.remove(&id);
                    }
                }
            }
        }
        Ok(())
    }
}
