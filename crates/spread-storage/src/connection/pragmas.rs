//! Per-connection PRAGMAs.
//!
//! The writer owns journal mode and foreign-key enforcement; readers are
//! pinned to `query_only` so a stray write through the pool fails loudly.

use rusqlite::Connection;
use spread_core::errors::StorageError;

use crate::to_storage_err;

/// Milliseconds a connection waits on a locked database before `SQLITE_BUSY`.
const BUSY_TIMEOUT_MS: u32 = 5_000;

/// Page cache per connection, in KiB (negative PRAGMA form).
const CACHE_KIB: i64 = 16_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionRole {
    Writer,
    Reader,
}

pub fn configure(conn: &Connection, role: ConnectionRole) -> Result<(), StorageError> {
    let role_specific = match role {
        ConnectionRole::Writer => {
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;"
        }
        ConnectionRole::Reader => "PRAGMA query_only = ON;",
    };
    let shared = format!(
        "PRAGMA busy_timeout = {BUSY_TIMEOUT_MS};
         PRAGMA cache_size = -{CACHE_KIB};
         PRAGMA temp_store = MEMORY;"
    );
    conn.execute_batch(role_specific)
        .and_then(|()| conn.execute_batch(&shared))
        .map_err(|e| to_storage_err(format!("{role:?} pragmas: {e}")))
}

/// Writer-side pragmas.
pub fn apply_pragmas(conn: &Connection) -> Result<(), StorageError> {
    configure(conn, ConnectionRole::Writer)
}

/// Current journal mode, lowercased (`wal`, `memory`, ...).
pub fn journal_mode(conn: &Connection) -> Result<String, StorageError> {
    let mode: String = conn
        .pragma_query_value(None, "journal_mode", |row| row.get(0))
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(mode.to_ascii_lowercase())
}

pub fn verify_wal_mode(conn: &Connection) -> Result<bool, StorageError> {
    Ok(journal_mode(conn)? == "wal")
}
