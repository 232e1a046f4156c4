//! Read-only connections for status, history and snapshot lookups.
//!
//! A checkout prefers an idle connection so a long verification query does
//! not stall short lookups queued behind it; only when every reader is busy
//! does it wait on the next one in rotation.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, TryLockError};

use rusqlite::{Connection, OpenFlags};
use spread_core::errors::StorageError;

use super::pragmas::{configure, ConnectionRole};
use crate::to_storage_err;

const MAX_READERS: usize = 8;

pub struct ReadPool {
    readers: Vec<Mutex<Connection>>,
    cursor: AtomicUsize,
}

impl ReadPool {
    /// Open `size` readers (clamped to 1..=8) against an existing database.
    pub fn open(path: &Path, size: usize) -> Result<Self, StorageError> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let readers = (0..size.clamp(1, MAX_READERS))
            .map(|_| {
                let conn = Connection::open_with_flags(path, flags)
                    .map_err(|e| to_storage_err(format!("open reader {}: {e}", path.display())))?;
                configure(&conn, ConnectionRole::Reader)?;
                Ok(Mutex::new(conn))
            })
            .collect::<Result<Vec<_>, StorageError>>()?;
        Ok(Self {
            readers,
            cursor: AtomicUsize::new(0),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        let guard = self.checkout()?;
        f(&guard)
    }

    fn checkout(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        let start = self.cursor.fetch_add(1, Ordering::Relaxed);
        let n = self.readers.len();
        for offset in 0..n {
            match self.readers[(start + offset) % n].try_lock() {
                Ok(guard) => return Ok(guard),
                Err(TryLockError::WouldBlock) => continue,
                Err(TryLockError::Poisoned(_)) => return Err(to_storage_err("reader lock poisoned")),
            }
        }
        self.readers[start % n]
            .lock()
            .map_err(|_| to_storage_err("reader lock poisoned"))
    }

    pub fn size(&self) -> usize {
        self.readers.len()
    }
}
