use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use rusqlite::config::DbConfig;
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;
use time::OffsetDateTime;

use crate::app::state::{AppState, FolderId, NoteId};
use crate::config::{ConfigPaths, StorageOptions};
use crate::host::{Clock, IdGenerator};

mod memory;
mod schema;

pub use memory::MemoryStore;

pub const DEFAULT_STATE_KEY: &str = "state";

#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("reading `{key}` from storage failed")]
    Read {
        key: String,
        #[source]
        source: BackendError,
    },
    #[error("persisting `{key}` failed")]
    PersistenceFailure {
        key: String,
        #[source]
        source: BackendError,
    },
    #[error("value stored under `{key}` is not a valid state blob")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("serialising state failed")]
    Serialize(#[source] serde_json::Error),
}

/// Whole-value get/set by key, the only storage surface the controller needs.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError>;
    fn set(&self, key: &str, value: &[u8]) -> Result<(), BackendError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), BackendError> {
        (**self).set(key, value)
    }
}

#[derive(Clone)]
pub struct SqliteStore {
    db_path: Arc<PathBuf>,
    options: Arc<StorageOptions>,
}

impl SqliteStore {
    pub fn connect(&self) -> Result<Connection, BackendError> {
        let conn = Connection::open(&*self.db_path)?;
        prepare_connection(&conn, &self.options)?;
        Ok(conn)
    }

    pub fn database_path(&self) -> &Path {
        &self.db_path
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        let conn = self.connect()?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
                row.get::<_, Vec<u8>>(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), BackendError> {
        let conn = self.connect()?;
        let now = OffsetDateTime::now_utc().unix_timestamp();
        conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                            updated_at = excluded.updated_at",
            params![key, value, now],
        )?;
        Ok(())
    }
}

pub fn init(paths: &ConfigPaths, storage: &StorageOptions) -> anyhow::Result<SqliteStore> {
    let db_path = if storage.database_path.as_os_str().is_empty() {
        &paths.database_path
    } else {
        &storage.database_path
    };
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating data directory {}", parent.display()))?;
    }
    let conn = Connection::open(db_path)
        .with_context(|| format!("opening database {}", db_path.display()))?;
    prepare_connection(&conn, storage).context("preparing database connection")?;
    schema::apply(&conn)?;
    Ok(SqliteStore {
        db_path: Arc::new(db_path.clone()),
        options: Arc::new(storage.clone()),
    })
}

fn prepare_connection(conn: &Connection, storage: &StorageOptions) -> Result<(), BackendError> {
    conn.set_db_config(DbConfig::SQLITE_DBCONFIG_ENABLE_FKEY, true)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(
        None,
        "wal_autocheckpoint",
        storage.wal_autocheckpoint.to_string(),
    )?;
    Ok(())
}

/// Loads and saves the whole [`AppState`] as one JSON blob under a fixed key.
pub struct StateStore<S> {
    backend: S,
    key: String,
}

impl<S: KeyValueStore> StateStore<S> {
    pub fn new(backend: S, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn read_raw(&self) -> Result<Option<Vec<u8>>, StoreError> {
        self.backend
            .get(&self.key)
            .map_err(|source| StoreError::Read {
                key: self.key.clone(),
                source,
            })
    }

    /// Returns the stored state, or seeds and persists the first-run state
    /// when nothing is stored yet.
    pub fn load(&self, ids: &dyn IdGenerator, clock: &dyn Clock) -> Result<AppState, StoreError> {
        if let Some(raw) = self.read_raw()? {
            let state: AppState =
                serde_json::from_slice(&raw).map_err(|source| StoreError::Corrupt {
                    key: self.key.clone(),
                    source,
                })?;
            tracing::info!(
                key = %self.key,
                folders = state.folders.len(),
                "loaded stored state"
            );
            return Ok(state);
        }

        tracing::info!(key = %self.key, "no stored state, seeding first-run folder");
        let state = AppState::seeded(
            FolderId::new(ids.next_id()),
            NoteId::new(ids.next_id()),
            clock.now_millis(),
        );
        self.save(&state)?;
        Ok(state)
    }

    pub fn save(&self, state: &AppState) -> Result<(), StoreError> {
        let blob = serde_json::to_vec(state).map_err(StoreError::Serialize)?;
        self.backend
            .set(&self.key, &blob)
            .map_err(|source| StoreError::PersistenceFailure {
                key: self.key.clone(),
                source,
            })?;
        tracing::trace!(key = %self.key, bytes = blob.len(), "state persisted");
        Ok(())
    }
}
