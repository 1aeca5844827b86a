//! Shared document store with write-through persistence
//!
//! The store owns the root object behind a single reader/writer lock and
//! flushes the full document to disk on every successful mutation. Readers
//! run in parallel; a mutation holds the exclusive lock for its full
//! duration including the flush, so writes are totally ordered and the
//! on-disk image always reflects the last committed write.
//!
//! Mutations are persist-then-commit: the new state is written to a sibling
//! temp file, fsynced and renamed over the database file before it replaces
//! the in-memory root. A failed flush therefore leaves both memory and disk
//! on the previous state.

use crate::document::{Object, Value};
use crate::path::{self, Key};
use parking_lot::RwLock;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("No such key")]
    NotFound,

    #[error("Database write error: {0}")]
    Persistence(#[from] std::io::Error),

    #[error("Database write error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// In-memory document store backed by a single JSON file.
pub struct Store {
    db: RwLock<Object>,
    file_path: PathBuf,
}

impl Store {
    /// Open a store backed by `file_path`.
    ///
    /// A missing, empty or unparsable file starts the store with an empty
    /// root object; the file is only (re)written on the next mutation.
    pub fn open(file_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let file_path = file_path.into();
        if let Some(parent) = file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let root = match fs::read_to_string(&file_path) {
            Ok(content) => match serde_json::from_str::<Value>(&content) {
                Ok(Value::Object(obj)) => obj,
                Ok(_) => {
                    warn!(file = %file_path.display(), "database file root is not an object, starting empty");
                    Object::new()
                }
                Err(e) => {
                    warn!(file = %file_path.display(), error = %e, "database file unparsable, starting empty");
                    Object::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(file = %file_path.display(), "no database file, starting empty");
                Object::new()
            }
            Err(e) => return Err(e.into()),
        };

        info!(file = %file_path.display(), fields = root.len(), "store opened");
        Ok(Self {
            db: RwLock::new(root),
            file_path,
        })
    }

    /// Path of the backing file.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Look up `key` under the shared lock and return a copy of the value.
    pub fn get(&self, key: &Key) -> Result<Value, StoreError> {
        let db = self.db.read();
        path::get(&db, key).cloned().ok_or(StoreError::NotFound)
    }

    /// Insert or overwrite the field at `key` and flush to disk.
    pub fn set(&self, key: &Key, value: Value) -> Result<(), StoreError> {
        let mut db = self.db.write();
        let mut next = db.clone();
        path::set(&mut next, key, value);
        self.persist(&next)?;
        *db = next;
        Ok(())
    }

    /// Remove the field at `key` and flush to disk.
    ///
    /// An unresolved key returns [`StoreError::NotFound`] without touching
    /// the file.
    pub fn delete(&self, key: &Key) -> Result<(), StoreError> {
        let mut db = self.db.write();
        let mut next = db.clone();
        if !path::remove(&mut next, key) {
            return Err(StoreError::NotFound);
        }
        self.persist(&next)?;
        *db = next;
        Ok(())
    }

    /// Serialize the full document to a temp file and atomically rename it
    /// over the database file. Called with the exclusive lock held.
    fn persist(&self, root: &Object) -> Result<(), StoreError> {
        let encoded = serde_json::to_vec(root)?;
        let tmp_path = self.file_path.with_extension("json.tmp");
        let mut tmp = File::create(&tmp_path)?;
        tmp.write_all(&encoded)?;
        tmp.sync_all()?;
        fs::rename(&tmp_path, &self.file_path)?;
        Ok(())
    }
}
