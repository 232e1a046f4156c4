//! Table counts for status readouts.

use rusqlite::Connection;
use spread_core::errors::StorageError;

use super::{metrics, runs, snapshots};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCounts {
    pub runs: i64,
    pub metrics: i64,
    pub snapshots: i64,
}

pub fn table_counts(conn: &Connection) -> Result<TableCounts, StorageError> {
    Ok(TableCounts {
        runs: runs::count(conn)?,
        metrics: metrics::count(conn)?,
        snapshots: snapshots::count(conn)?,
    })
}
