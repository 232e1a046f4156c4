//! Queries for grid_snapshots. Each row points at one stored array artifact.

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use spread_core::errors::StorageError;
use spread_core::types::{BoundingBox, Variable};

use super::{parse_col, ts_from_col};
use crate::to_storage_err;

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRow {
    pub id: i64,
    pub init_time: DateTime<Utc>,
    pub variable: Variable,
    pub lead_hour: u32,
    pub path: String,
    pub bbox: BoundingBox,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSnapshot {
    pub init_time: DateTime<Utc>,
    pub variable: Variable,
    pub lead_hour: u32,
    pub path: String,
    pub bbox: BoundingBox,
}

const SNAPSHOT_COLUMNS: &str = "id, init_time, variable, lead_hour, path, bbox, created_at";

fn snapshot_from_row(row: &Row<'_>) -> rusqlite::Result<SnapshotRow> {
    let variable: String = row.get(2)?;
    let bbox_json: String = row.get(5)?;
    let bbox = serde_json::from_str(&bbox_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;
    Ok(SnapshotRow {
        id: row.get(0)?,
        init_time: ts_from_col(row.get(1)?, 1)?,
        variable: parse_col(&variable, 2)?,
        lead_hour: row.get(3)?,
        path: row.get(4)?,
        bbox,
        created_at: ts_from_col(row.get(6)?, 6)?,
    })
}

pub fn insert(
    conn: &Connection,
    snapshot: &NewSnapshot,
    created_at: DateTime<Utc>,
) -> Result<i64, StorageError> {
    let bbox = serde_json::to_string(&snapshot.bbox).map_err(|e| to_storage_err(e.to_string()))?;
    conn.execute(
        "INSERT INTO grid_snapshots (init_time, variable, lead_hour, path, bbox, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            snapshot.init_time.timestamp(),
            snapshot.variable.as_str(),
            snapshot.lead_hour,
            snapshot.path,
            bbox,
            created_at.timestamp()
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(conn.last_insert_rowid())
}

/// Delete snapshot rows for `init_time` at the given lead hours. Returns the
/// artifact paths of the removed rows so callers can reclaim them.
pub fn delete_for_init_hours(
    conn: &Connection,
    init_time: DateTime<Utc>,
    lead_hours: &[u32],
) -> Result<Vec<String>, StorageError> {
    let mut select = conn
        .prepare_cached("SELECT path FROM grid_snapshots WHERE init_time = ?1 AND lead_hour = ?2")
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut paths = Vec::new();
    for hour in lead_hours {
        let rows = select
            .query_map(params![init_time.timestamp(), hour], |row| row.get::<_, String>(0))
            .map_err(|e| to_storage_err(e.to_string()))?;
        for path in rows {
            paths.push(path.map_err(|e| to_storage_err(e.to_string()))?);
        }
    }

    let mut delete = conn
        .prepare_cached("DELETE FROM grid_snapshots WHERE init_time = ?1 AND lead_hour = ?2")
        .map_err(|e| to_storage_err(e.to_string()))?;
    for hour in lead_hours {
        delete
            .execute(params![init_time.timestamp(), hour])
            .map_err(|e| to_storage_err(e.to_string()))?;
    }
    Ok(paths)
}

/// Newest snapshot for a variable and lead hour, optionally pinned to one
/// init time.
pub fn latest(
    conn: &Connection,
    variable: Variable,
    lead_hour: u32,
    init_time: Option<DateTime<Utc>>,
) -> Result<Option<SnapshotRow>, StorageError> {
    let sql = format!(
        "SELECT {SNAPSHOT_COLUMNS} FROM grid_snapshots
         WHERE variable = ?1 AND lead_hour = ?2 AND (?3 IS NULL OR init_time = ?3)
         ORDER BY init_time DESC
         LIMIT 1"
    );
    conn.query_row(
        &sql,
        params![variable.as_str(), lead_hour, init_time.map(|t| t.timestamp())],
        snapshot_from_row,
    )
    .optional()
    .map_err(|e| to_storage_err(e.to_string()))
}

/// Snapshots newest first, optionally filtered by variable.
pub fn list(
    conn: &Connection,
    variable: Option<Variable>,
    limit: usize,
) -> Result<Vec<SnapshotRow>, StorageError> {
    let sql = format!(
        "SELECT {SNAPSHOT_COLUMNS} FROM grid_snapshots
         WHERE (?1 IS NULL OR variable = ?1)
         ORDER BY init_time DESC, lead_hour, variable
         LIMIT ?2"
    );
    let mut stmt = conn
        .prepare_cached(&sql)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(
            params![variable.map(Variable::as_str), limit as i64],
            snapshot_from_row,
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}

pub fn count(conn: &Connection) -> Result<i64, StorageError> {
    conn.query_row("SELECT COUNT(*) FROM grid_snapshots", [], |row| row.get(0))
        .map_err(|e| to_storage_err(e.to_string()))
}

pub fn delete_all(conn: &Connection) -> Result<usize, StorageError> {
    conn.execute("DELETE FROM grid_snapshots", [])
        .map_err(|e| to_storage_err(e.to_string()))
}
