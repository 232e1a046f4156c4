//! Queries for point_metrics: pairwise divergence at monitoring points.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use spread_core::errors::StorageError;
use spread_core::types::Variable;

use super::{parse_col, ts_from_col};
use crate::to_storage_err;

#[derive(Debug, Clone, PartialEq)]
pub struct MetricRow {
    pub id: i64,
    pub run_a_id: String,
    pub run_b_id: String,
    pub variable: Variable,
    pub lat: f64,
    pub lon: f64,
    pub lead_hour: u32,
    pub rmse: f64,
    pub bias: f64,
    pub spread: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMetric {
    pub run_a_id: String,
    pub run_b_id: String,
    pub variable: Variable,
    pub lat: f64,
    pub lon: f64,
    pub lead_hour: u32,
    pub rmse: f64,
    pub bias: f64,
    pub spread: f64,
}

/// Spread statistics per variable across all stored metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableSummary {
    pub variable: Variable,
    pub mean_spread: f64,
    pub max_spread: f64,
    pub num_points: i64,
}

const METRIC_COLUMNS: &str =
    "id, run_a_id, run_b_id, variable, lat, lon, lead_hour, rmse, bias, spread, created_at";

fn metric_from_row(row: &Row<'_>) -> rusqlite::Result<MetricRow> {
    let variable: String = row.get(3)?;
    Ok(MetricRow {
        id: row.get(0)?,
        run_a_id: row.get(1)?,
        run_b_id: row.get(2)?,
        variable: parse_col(&variable, 3)?,
        lat: row.get(4)?,
        lon: row.get(5)?,
        lead_hour: row.get(6)?,
        rmse: row.get(7)?,
        bias: row.get(8)?,
        spread: row.get(9)?,
        created_at: ts_from_col(row.get(10)?, 10)?,
    })
}

/// Insert metrics sharing one creation timestamp. Insert order is preserved
/// by the autoincrement id, which breaks created_at ties.
pub fn insert_batch(
    conn: &Connection,
    metrics: &[NewMetric],
    created_at: DateTime<Utc>,
) -> Result<usize, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT INTO point_metrics
                (run_a_id, run_b_id, variable, lat, lon, lead_hour, rmse, bias, spread, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let created = created_at.timestamp();
    let mut written = 0;
    for m in metrics {
        written += stmt
            .execute(params![
                m.run_a_id,
                m.run_b_id,
                m.variable.as_str(),
                m.lat,
                m.lon,
                m.lead_hour,
                m.rmse,
                m.bias,
                m.spread,
                created
            ])
            .map_err(|e| to_storage_err(e.to_string()))?;
    }
    Ok(written)
}

/// Delete metrics referencing any run of `init_time`, restricted to the
/// given lead hours. Returns the number of rows removed.
pub fn delete_for_init_hours(
    conn: &Connection,
    init_time: DateTime<Utc>,
    lead_hours: &[u32],
) -> Result<usize, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "DELETE FROM point_metrics
             WHERE lead_hour = ?1
               AND (run_a_id IN (SELECT id FROM model_runs WHERE init_time = ?2)
                 OR run_b_id IN (SELECT id FROM model_runs WHERE init_time = ?2))",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut removed = 0;
    for hour in lead_hours {
        removed += stmt
            .execute(params![hour, init_time.timestamp()])
            .map_err(|e| to_storage_err(e.to_string()))?;
    }
    Ok(removed)
}

/// Most recent metrics for a variable within `tolerance` degrees of a point,
/// newest first (ties broken by insert order, newest first).
pub fn recent_near(
    conn: &Connection,
    variable: Variable,
    lat: f64,
    lon: f64,
    tolerance: f64,
    lead_hour: Option<u32>,
    limit: usize,
) -> Result<Vec<MetricRow>, StorageError> {
    let sql = format!(
        "SELECT {METRIC_COLUMNS} FROM point_metrics
         WHERE variable = ?1
           AND lat BETWEEN ?2 AND ?3
           AND lon BETWEEN ?4 AND ?5
           AND (?6 IS NULL OR lead_hour = ?6)
         ORDER BY created_at DESC, id DESC
         LIMIT ?7"
    );
    let mut stmt = conn
        .prepare_cached(&sql)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(
            params![
                variable.as_str(),
                lat - tolerance,
                lat + tolerance,
                lon - tolerance,
                lon + tolerance,
                lead_hour,
                limit as i64
            ],
            metric_from_row,
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}

/// Metrics computed for one init time and lead hour.
pub fn query_for_init_hour(
    conn: &Connection,
    init_time: DateTime<Utc>,
    lead_hour: u32,
) -> Result<Vec<MetricRow>, StorageError> {
    let sql = format!(
        "SELECT {METRIC_COLUMNS} FROM point_metrics
         WHERE lead_hour = ?1
           AND run_a_id IN (SELECT id FROM model_runs WHERE init_time = ?2)
         ORDER BY id"
    );
    let mut stmt = conn
        .prepare_cached(&sql)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![lead_hour, init_time.timestamp()], metric_from_row)
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}

/// Mean and max spread per variable, in tracked-variable order. Variables
/// without metrics are omitted.
pub fn summary(conn: &Connection) -> Result<Vec<VariableSummary>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT variable, AVG(spread), MAX(spread), COUNT(*)
             FROM point_metrics GROUP BY variable",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map([], |row| {
            let variable: String = row.get(0)?;
            Ok(VariableSummary {
                variable: parse_col(&variable, 0)?,
                mean_spread: row.get(1)?,
                max_spread: row.get(2)?,
                num_points: row.get(3)?,
            })
        })
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut summaries = rows
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;
    summaries.sort_by_key(|s| s.variable);
    Ok(summaries)
}

pub fn count(conn: &Connection) -> Result<i64, StorageError> {
    conn.query_row("SELECT COUNT(*) FROM point_metrics", [], |row| row.get(0))
        .map_err(|e| to_storage_err(e.to_string()))
}

pub fn delete_all(conn: &Connection) -> Result<usize, StorageError> {
    conn.execute("DELETE FROM point_metrics", [])
        .map_err(|e| to_storage_err(e.to_string()))
}
