//! Schema migrations tracked in `PRAGMA user_version`.
//!
//! Each step runs with its version bump in one immediate transaction, so a
//! failed step leaves the schema at the previous version.

pub mod v001_initial;
pub mod v002_alerts;

use rusqlite::Connection;
use spread_core::errors::StorageError;

use crate::connection::writer::with_immediate_transaction;
use crate::to_storage_err;

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "runs, raw values, metrics, snapshots",
        sql: v001_initial::MIGRATION_SQL,
    },
    Migration {
        version: 2,
        name: "alert rules and events",
        sql: v002_alerts::MIGRATION_SQL,
    },
];

/// Newest schema version this build knows.
pub const LATEST_VERSION: u32 = 2;

/// Bring the schema up to `LATEST_VERSION`. A database written by a newer
/// build is refused rather than silently used.
pub fn run_migrations(conn: &Connection) -> Result<(), StorageError> {
    let found = current_version(conn)?;
    if found > LATEST_VERSION {
        return Err(StorageError::MigrationFailed {
            version: found,
            message: format!("schema is newer than supported version {LATEST_VERSION}"),
        });
    }

    for step in MIGRATIONS.iter().filter(|m| m.version > found) {
        with_immediate_transaction(conn, |tx| {
            tx.execute_batch(step.sql)
                .and_then(|()| tx.pragma_update(None, "user_version", step.version))
                .map_err(|e| to_storage_err(e.to_string()))
        })
        .map_err(|e| StorageError::MigrationFailed {
            version: step.version,
            message: e.to_string(),
        })?;
        tracing::info!(version = step.version, name = step.name, "applied migration");
    }
    Ok(())
}

pub fn current_version(conn: &Connection) -> Result<u32, StorageError> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| to_storage_err(e.to_string()))
}
