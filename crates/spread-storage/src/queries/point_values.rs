//! Queries for model_point_values: raw model values at monitoring points.

use rusqlite::{params, Connection};
use spread_core::errors::StorageError;
use spread_core::types::Variable;

use super::parse_col;
use crate::to_storage_err;

#[derive(Debug, Clone, PartialEq)]
pub struct PointValueRow {
    pub id: i64,
    pub run_id: String,
    pub variable: Variable,
    pub lat: f64,
    pub lon: f64,
    pub lead_hour: u32,
    pub value: f64,
}

/// A value to insert for a run.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPointValue {
    pub variable: Variable,
    pub lat: f64,
    pub lon: f64,
    pub lead_hour: u32,
    pub value: f64,
}

/// Insert values for one run. Returns the number of rows written.
pub fn insert_batch(
    conn: &Connection,
    run_id: &str,
    values: &[NewPointValue],
) -> Result<usize, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT INTO model_point_values (run_id, variable, lat, lon, lead_hour, value)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut written = 0;
    for v in values {
        written += stmt
            .execute(params![run_id, v.variable.as_str(), v.lat, v.lon, v.lead_hour, v.value])
            .map_err(|e| to_storage_err(e.to_string()))?;
    }
    Ok(written)
}

pub fn query_for_run(conn: &Connection, run_id: &str) -> Result<Vec<PointValueRow>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT id, run_id, variable, lat, lon, lead_hour, value
             FROM model_point_values WHERE run_id = ?1
             ORDER BY lead_hour, variable, id",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![run_id], |row| {
            let variable: String = row.get(2)?;
            Ok(PointValueRow {
                id: row.get(0)?,
                run_id: row.get(1)?,
                variable: parse_col(&variable, 2)?,
                lat: row.get(3)?,
                lon: row.get(4)?,
                lead_hour: row.get(5)?,
                value: row.get(6)?,
            })
        })
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}

pub fn count_for_run(conn: &Connection, run_id: &str) -> Result<i64, StorageError> {
    conn.query_row(
        "SELECT COUNT(*) FROM model_point_values WHERE run_id = ?1",
        params![run_id],
        |row| row.get(0),
    )
    .map_err(|e| to_storage_err(e.to_string()))
}

pub fn count(conn: &Connection) -> Result<i64, StorageError> {
    conn.query_row("SELECT COUNT(*) FROM model_point_values", [], |row| row.get(0))
        .map_err(|e| to_storage_err(e.to_string()))
}
