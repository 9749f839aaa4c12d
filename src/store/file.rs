//! JSON file store.
//!
//! One `<collection>.json` file per entity kind under a data directory,
//! each holding an object of `id -> document`. Reads are served from memory;
//! every write rewrites the affected collection via a temp file and rename,
//! so a crash mid-write leaves the previous file intact. The cache only
//! takes a change once its file has been renamed into place.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use super::memory::{merge_entry, Collection, MemoryStore};
use super::{Kind, Store, StoreError};

/// A store persisted as JSON files in a directory.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    cache: MemoryStore,
    /// Serializes read-modify-persist so files match the cache.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let mut collections = HashMap::new();
        for kind in Kind::ALL {
            let path = collection_path(&dir, kind);
            if !path.exists() {
                continue;
            }
            let content = fs::read_to_string(&path)?;
            let collection: Collection =
                serde_json::from_str(&content).map_err(|source| StoreError::Decode {
                    kind,
                    id: path.display().to_string(),
                    source,
                })?;
            debug!("Loaded {} {} from {}", collection.len(), kind, path.display());
            collections.insert(kind, collection);
        }

        Ok(Self {
            dir,
            cache: MemoryStore::from_collections(collections),
            write_lock: Mutex::new(()),
        })
    }

    /// The data directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `collection` to disk, then make it the cached copy.
    fn commit(&self, kind: Kind, collection: Collection) -> Result<(), StoreError> {
        self.persist(kind, &collection)?;
        self.cache.replace_collection(kind, collection);
        Ok(())
    }

    fn persist(&self, kind: Kind, collection: &Collection) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(collection)
            .map_err(|source| StoreError::Encode { kind, source })?;

        let path = collection_path(&self.dir, kind);
        let tmp = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

fn collection_path(dir: &Path, kind: Kind) -> PathBuf {
    dir.join(format!("{}.json", kind.as_str()))
}

impl Store for FileStore {
    fn document(&self, kind: Kind, id: &str) -> Result<Option<Value>, StoreError> {
        self.cache.document(kind, id)
    }

    fn documents(&self, kind: Kind) -> Result<Vec<(String, Value)>, StoreError> {
        self.cache.documents(kind)
    }

    fn insert_document(&self, kind: Kind, id: &str, doc: Value) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock();
        let mut collection = self.cache.collection(kind);
        if collection.contains_key(id) {
            return Ok(false);
        }
        collection.insert(id.to_string(), doc);
        self.commit(kind, collection)?;
        Ok(true)
    }

    fn merge_document(&self, kind: Kind, id: &str, doc: Value) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        let mut collection = self.cache.collection(kind);
        merge_entry(&mut collection, id, doc);
        self.commit(kind, collection)
    }
}
