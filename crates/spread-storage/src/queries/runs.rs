//! Queries for the model_runs table. One row per (model, init_time).

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use spread_core::errors::StorageError;
use spread_core::types::{ModelId, RunStatus};

use super::{parse_col, ts_from_col};
use crate::to_storage_err;

/// A model run record.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRow {
    pub id: String,
    pub model: ModelId,
    pub init_time: DateTime<Utc>,
    /// Sorted lead hours the connector returned.
    pub forecast_hours: Vec<u32>,
    pub status: RunStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

const RUN_COLUMNS: &str =
    "id, model_name, init_time, forecast_hours, status, error, created_at";

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRow> {
    let model: String = row.get(1)?;
    let hours_json: String = row.get(3)?;
    let status: String = row.get(4)?;
    let forecast_hours = serde_json::from_str(&hours_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
    Ok(RunRow {
        id: row.get(0)?,
        model: parse_col(&model, 1)?,
        init_time: ts_from_col(row.get(2)?, 2)?,
        forecast_hours,
        status: parse_col(&status, 4)?,
        error: row.get(5)?,
        created_at: ts_from_col(row.get(6)?, 6)?,
    })
}

/// Insert a new run with status `pending`. Returns the generated id.
pub fn insert_pending(
    conn: &Connection,
    model: ModelId,
    init_time: DateTime<Utc>,
    created_at: DateTime<Utc>,
) -> Result<String, StorageError> {
    let id = uuid::Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO model_runs (id, model_name, init_time, status, created_at)
         VALUES (?1, ?2, ?3, 'pending', ?4)",
        params![id, model.as_str(), init_time.timestamp(), created_at.timestamp()],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(id)
}

/// Look up the run for a (model, init_time) pair.
pub fn get_by_model_init(
    conn: &Connection,
    model: ModelId,
    init_time: DateTime<Utc>,
) -> Result<Option<RunRow>, StorageError> {
    let sql = format!(
        "SELECT {RUN_COLUMNS} FROM model_runs WHERE model_name = ?1 AND init_time = ?2"
    );
    conn.query_row(&sql, params![model.as_str(), init_time.timestamp()], run_from_row)
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))
}

pub fn get(conn: &Connection, id: &str) -> Result<Option<RunRow>, StorageError> {
    let sql = format!("SELECT {RUN_COLUMNS} FROM model_runs WHERE id = ?1");
    conn.query_row(&sql, params![id], run_from_row)
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))
}

/// Record the lead hours a connector returned. Hours are stored sorted.
pub fn set_forecast_hours(conn: &Connection, id: &str, hours: &[u32]) -> Result<(), StorageError> {
    let mut sorted = hours.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    let json = serde_json::to_string(&sorted).map_err(|e| to_storage_err(e.to_string()))?;
    conn.execute(
        "UPDATE model_runs SET forecast_hours = ?1 WHERE id = ?2",
        params![json, id],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn mark_complete(conn: &Connection, id: &str) -> Result<(), StorageError> {
    conn.execute(
        "UPDATE model_runs SET status = 'complete', error = NULL WHERE id = ?1",
        params![id],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn mark_error(conn: &Connection, id: &str, message: &str) -> Result<(), StorageError> {
    conn.execute(
        "UPDATE model_runs SET status = 'error', error = ?1 WHERE id = ?2",
        params![message, id],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Delete a run plus its raw point values and every pairwise metric that
/// references it. Callers wrap this in a transaction.
pub fn delete_with_dependents(conn: &Connection, id: &str) -> Result<(), StorageError> {
    conn.execute(
        "DELETE FROM point_metrics WHERE run_a_id = ?1 OR run_b_id = ?1",
        params![id],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    conn.execute("DELETE FROM model_point_values WHERE run_id = ?1", params![id])
        .map_err(|e| to_storage_err(e.to_string()))?;
    conn.execute("DELETE FROM model_runs WHERE id = ?1", params![id])
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Complete runs for one init time, ordered by model name.
pub fn complete_for_init(
    conn: &Connection,
    init_time: DateTime<Utc>,
) -> Result<Vec<RunRow>, StorageError> {
    let sql = format!(
        "SELECT {RUN_COLUMNS} FROM model_runs
         WHERE init_time = ?1 AND status = 'complete'
         ORDER BY model_name"
    );
    let mut stmt = conn
        .prepare_cached(&sql)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![init_time.timestamp()], run_from_row)
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}

/// Most recent init time with at least `min_runs` complete runs.
pub fn latest_init_with_complete(
    conn: &Connection,
    min_runs: usize,
) -> Result<Option<DateTime<Utc>>, StorageError> {
    let secs: Option<i64> = conn
        .query_row(
            "SELECT init_time FROM model_runs
             WHERE status = 'complete'
             GROUP BY init_time
             HAVING COUNT(*) >= ?1
             ORDER BY init_time DESC
             LIMIT 1",
            params![min_runs as i64],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;
    match secs {
        Some(s) => DateTime::from_timestamp(s, 0)
            .map(Some)
            .ok_or_else(|| StorageError::InvalidValue {
                column: "model_runs.init_time".to_string(),
                value: s.to_string(),
            }),
        None => Ok(None),
    }
}

/// Recent runs, newest init time first, optionally filtered.
pub fn query_recent(
    conn: &Connection,
    model: Option<ModelId>,
    since: Option<DateTime<Utc>>,
    limit: usize,
) -> Result<Vec<RunRow>, StorageError> {
    let sql = format!(
        "SELECT {RUN_COLUMNS} FROM model_runs
         WHERE (?1 IS NULL OR model_name = ?1)
           AND (?2 IS NULL OR init_time >= ?2)
         ORDER BY init_time DESC, created_at DESC
         LIMIT ?3"
    );
    let mut stmt = conn
        .prepare_cached(&sql)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(
            params![
                model.map(ModelId::as_str),
                since.map(|t| t.timestamp()),
                limit as i64
            ],
            run_from_row,
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}

/// Count total runs.
pub fn count(conn: &Connection) -> Result<i64, StorageError> {
    conn.query_row("SELECT COUNT(*) FROM model_runs", [], |row| row.get(0))
        .map_err(|e| to_storage_err(e.to_string()))
}

/// Delete every run. Raw values and metrics go with them via cascade.
pub fn delete_all(conn: &Connection) -> Result<usize, StorageError> {
    conn.execute("DELETE FROM model_runs", [])
        .map_err(|e| to_storage_err(e.to_string()))
}
