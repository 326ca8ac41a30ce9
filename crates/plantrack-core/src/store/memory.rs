//! In-memory [`DocumentStore`] with optional fault injection.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use serde_json::{Map, Value};

use super::{Document, DocumentStore, Filter, StoreError, generate_id};

type Collections = BTreeMap<String, BTreeMap<String, Map<String, Value>>>;

/// Store operations that can be made to fail on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Get,
    Set,
    Delete,
    Query,
    Add,
    DeleteBatch,
}

#[derive(Debug, Default)]
struct Inner {
    collections: Collections,
    faults: Vec<StoreOp>,
}

/// Mutex-guarded map of collections.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call of `op` fail with [`StoreError::Unavailable`].
    ///
    /// Faults queue up: calling this twice for the same op fails the next
    /// two calls.
    pub fn fail_next(&self, op: StoreOp) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.faults.push(op);
        }
    }

    /// Number of documents currently held in `collection`.
    #[must_use]
    pub fn len(&self, collection: &str) -> usize {
        self.inner
            .lock()
            .map(|inner| inner.collections.get(collection).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }

    fn lock(&self, op: StoreOp) -> Result<MutexGuard<'_, Inner>, StoreError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))?;

        if let Some(pos) = inner.faults.iter().position(|f| *f == op) {
            inner.faults.remove(pos);
            return Err(StoreError::Unavailable(format!("injected {op:?} failure")));
        }
        Ok(inner)
    }
}

impl DocumentStore for MemoryStore {
    fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let inner = self.lock(StoreOp::Get)?;
        Ok(inner
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|data| Document::new(id.to_string(), data.clone())))
    }

    fn set_document(
        &self,
        collection: &str,
        id: &str,
        data: Map<String, Value>,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock(StoreOp::Set)?;
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), data);
        Ok(())
    }

    fn delete_document(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let mut inner = self.lock(StoreOp::Delete)?;
        Ok(inner
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .is_some())
    }

    fn query(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>, StoreError> {
        let inner = self.lock(StoreOp::Query)?;
        let Some(docs) = inner.collections.get(collection) else {
            return Ok(Vec::new());
        };

        Ok(docs
            .iter()
            .filter(|(_, data)| filters.iter().all(|f| f.matches(data)))
            .map(|(id, data)| Document::new(id.clone(), data.clone()))
            .collect())
    }

    fn add_document(
        &self,
        collection: &str,
        data: Map<String, Value>,
    ) -> Result<String, StoreError> {
        let mut inner = self.lock(StoreOp::Add)?;
        let docs = inner.collections.entry(collection.to_string()).or_default();

        let mut id = generate_id();
        while docs.contains_key(&id) {
            id = generate_id();
        }
        docs.insert(id.clone(), data);
        Ok(id)
    }

    fn delete_batch(&self, collection: &str, ids: &[String]) -> Result<usize, StoreError> {
        let mut inner = self.lock(StoreOp::DeleteBatch)?;
        let Some(docs) = inner.collections.get_mut(collection) else {
            return Ok(0);
        };
        Ok(ids.iter().filter(|id| docs.remove(*id).is_some()).count())
    }
}
