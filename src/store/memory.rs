//! In-process store.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;
use serde_json::Value;

use super::{merge_into, Kind, Store, StoreError};

pub(crate) type Collection = BTreeMap<String, Value>;

/// A store that keeps every collection in memory.
///
/// Contents are lost when the process exits; used for tests and ephemeral
/// runs, and as the cache behind [`FileStore`](super::FileStore).
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Kind, Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_collections(collections: HashMap<Kind, Collection>) -> Self {
        Self {
            collections: RwLock::new(collections),
        }
    }

    /// Copy of one collection, for persisting.
    pub(crate) fn collection(&self, kind: Kind) -> Collection {
        self.collections
            .read()
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    /// Swap in a collection that has already been persisted elsewhere.
    pub(crate) fn replace_collection(&self, kind: Kind, collection: Collection) {
        self.collections.write().insert(kind, collection);
    }

    /// Number of documents of a kind.
    pub fn len(&self, kind: Kind) -> usize {
        self.collections.read().get(&kind).map_or(0, |c| c.len())
    }
}

impl Store for MemoryStore {
    fn document(&self, kind: Kind, id: &str) -> Result<Option<Value>, StoreError> {
        Ok(self
            .collections
            .read()
            .get(&kind)
            .and_then(|c| c.get(id))
            .cloned())
    }

    fn documents(&self, kind: Kind) -> Result<Vec<(String, Value)>, StoreError> {
        Ok(self
            .collections
            .read()
            .get(&kind)
            .map(|c| c.iter().map(|(id, doc)| (id.clone(), doc.clone())).collect())
            .unwrap_or_default())
    }

    fn insert_document(&self, kind: Kind, id: &str, doc: Value) -> Result<bool, StoreError> {
        let mut collections = self.collections.write();
        let collection = collections.entry(kind).or_default();
        if collection.contains_key(id) {
            return Ok(false);
        }
        collection.insert(id.to_string(), doc);
        Ok(true)
    }

    fn merge_document(&self, kind: Kind, id: &str, doc: Value) -> Result<(), StoreError> {
        let mut collections = self.collections.write();
        merge_entry(collections.entry(kind).or_default(), id, doc);
        Ok(())
    }
}

/// Overlay `doc` onto the entry for `id`, inserting it if absent.
pub(crate) fn merge_entry(collection: &mut Collection, id: &str, doc: Value) {
    match collection.get_mut(id) {
        Some(existing) => merge_into(existing, doc),
        None => {
            collection.insert(id.to_string(), doc);
        }
    }
}
