//! SQLite connection ownership for the engine.

pub mod pool;
pub mod pragmas;
pub mod writer;

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::Connection;
use spread_core::config::StorageConfig;
use spread_core::errors::StorageError;

use self::pool::ReadPool;
use self::pragmas::apply_pragmas;
use crate::{migrations, to_storage_err};

/// One serialized writer plus optional readers.
///
/// An in-memory database is private to its connection, so in that mode
/// `with_reader` borrows the writer.
pub struct DatabaseManager {
    writer: Mutex<Connection>,
    readers: Option<ReadPool>,
    path: Option<PathBuf>,
}

impl DatabaseManager {
    /// Open (creating if needed) the database file, bring its schema up to
    /// date, then attach the read pool.
    pub fn open(path: &Path, read_pool_size: usize) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| to_storage_err(format!("create {}: {e}", parent.display())))?;
        }
        let writer = prepare_writer(Connection::open(path))?;
        // Readers open after migrations so they never see a partial schema.
        let readers = ReadPool::open(path, read_pool_size)?;
        tracing::debug!(path = %path.display(), readers = readers.size(), "database opened");

        Ok(Self {
            writer: Mutex::new(writer),
            readers: Some(readers),
            path: Some(path.to_path_buf()),
        })
    }

    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        Self::open(config.db_path(), config.read_pool_size)
    }

    /// Private database for tests and one-shot tools.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Ok(Self {
            writer: Mutex::new(prepare_writer(Connection::open_in_memory())?),
            readers: None,
            path: None,
        })
    }

    /// Run `f` on the writer. Callers are serialized on its mutex.
    pub fn with_writer<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        let guard = self
            .writer
            .lock()
            .map_err(|_| to_storage_err("write lock poisoned"))?;
        f(&guard)
    }

    /// Run `f` on a reader, or on the writer for in-memory databases.
    pub fn with_reader<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        match &self.readers {
            Some(pool) => pool.with_conn(f),
            None => self.with_writer(f),
        }
    }

    /// Fold the WAL back into the main file and truncate it.
    pub fn checkpoint(&self) -> Result<(), StorageError> {
        self.with_writer(|conn| {
            conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
                .map_err(|e| to_storage_err(e.to_string()))
        })
    }

    /// `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Dedicated read connections; 0 when reads share the writer.
    pub fn reader_count(&self) -> usize {
        self.readers.as_ref().map_or(0, ReadPool::size)
    }
}

fn prepare_writer(opened: rusqlite::Result<Connection>) -> Result<Connection, StorageError> {
    let conn = opened.map_err(|e| to_storage_err(format!("open writer: {e}")))?;
    apply_pragmas(&conn)?;
    migrations::run_migrations(&conn)?;
    Ok(conn)
}
