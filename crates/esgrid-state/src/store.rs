//! StateStore — redb-backed hierarchical state for esgrid.
//!
//! Nodes are stored in a single table keyed by absolute path. Writing a
//! node creates any missing ancestors with an empty value, matching the
//! `setAndCreateParents` semantics of a coordination service. The store
//! supports both on-disk and in-memory backends (the latter for testing).

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use crate::backend::StateBackend;
use crate::error::{StateError, StateResult};
use crate::path;
use crate::tables::ZNODES;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(ZNODES).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Whether a node exists at `path`.
    pub fn exists(&self, path: &str) -> StateResult<bool> {
        Ok(StateBackend::get(self, path)?.is_some())
    }

    /// Names of the direct children of `path`, in key order.
    pub fn children(&self, path: &str) -> StateResult<Vec<String>> {
        let parent = path::normalize(path)?;
        let prefix = format!("{parent}/");
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(ZNODES).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.range(prefix.as_str()..).map_err(map_err!(Read))? {
            let (key, _) = entry.map_err(map_err!(Read))?;
            let Some(rest) = key.value().strip_prefix(&prefix) else {
                break;
            };
            if !rest.contains('/') {
                results.push(rest.to_string());
            }
        }
        Ok(results)
    }

    /// Delete the node at `path` and everything beneath it. Returns the
    /// number of nodes removed.
    pub fn delete(&self, path: &str) -> StateResult<u32> {
        let target = path::normalize(path)?;
        let prefix = format!("{target}/");
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let count = {
            let mut table = txn.open_table(ZNODES).map_err(map_err!(Table))?;
            // Scan and remove under the same write transaction.
            let mut keys = Vec::new();
            for entry in table.range(target.as_str()..).map_err(map_err!(Read))? {
                let (key, _) = entry.map_err(map_err!(Read))?;
                let k = key.value();
                if k == target || k.starts_with(&prefix) {
                    keys.push(k.to_string());
                } else if !k.starts_with(target.as_str()) {
                    break;
                }
            }
            for key in &keys {
                table.remove(key.as_str()).map_err(map_err!(Write))?;
            }
            keys.len() as u32
        };
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(path = %target, count, "nodes deleted");
        Ok(count)
    }
}

impl StateBackend for StateStore {
    fn get(&self, path: &str) -> StateResult<Option<Vec<u8>>> {
        let key = path::normalize(path)?;
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(ZNODES).map_err(map_err!(Table))?;
        let value = table
            .get(key.as_str())
            .map_err(map_err!(Read))?
            .map(|guard| guard.value().to_vec());
        Ok(value)
    }

    fn set_and_create_parents(&self, path: &str, value: &[u8]) -> StateResult<()> {
        let key = path::normalize(path)?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let empty: &[u8] = &[];
        let mut created = 0u32;
        {
            let mut table = txn.open_table(ZNODES).map_err(map_err!(Table))?;
            for parent in path::ancestors(&key) {
                let missing = table
                    .get(parent.as_str())
                    .map_err(map_err!(Read))?
                    .is_none();
                if missing {
                    table
                        .insert(parent.as_str(), empty)
                        .map_err(map_err!(Write))?;
                    created += 1;
                }
            }
            table
                .insert(key.as_str(), value)
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, parents_created = created, "node stored");
        Ok(())
    }
}
