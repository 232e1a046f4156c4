//! Queries for alert_rules and alert_events.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use spread_core::errors::StorageError;
use spread_core::types::{AlertMetric, Comparison, Variable};

use super::{parse_col, ts_from_col};
use crate::to_storage_err;

// ─── Rules ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct AlertRuleRow {
    pub id: String,
    pub variable: Variable,
    /// Rules with no location apply everywhere.
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub location_label: Option<String>,
    pub metric: AlertMetric,
    pub comparison: Comparison,
    pub threshold: f64,
    pub consecutive_hours: u32,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl AlertRuleRow {
    /// `Some((lat, lon))` when the rule is scoped to a location.
    pub fn location(&self) -> Option<(f64, f64)> {
        self.lat.zip(self.lon)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAlertRule {
    pub variable: Variable,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub location_label: Option<String>,
    pub metric: AlertMetric,
    pub comparison: Comparison,
    pub threshold: f64,
    pub consecutive_hours: u32,
}

impl NewAlertRule {
    /// Unscoped `gt` rule firing on a single breach.
    pub fn new(variable: Variable, metric: AlertMetric, threshold: f64) -> Self {
        Self {
            variable,
            lat: None,
            lon: None,
            location_label: None,
            metric,
            comparison: Comparison::Gt,
            threshold,
            consecutive_hours: 1,
        }
    }
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertRuleUpdate {
    pub threshold: Option<f64>,
    pub comparison: Option<Comparison>,
    pub consecutive_hours: Option<u32>,
    pub enabled: Option<bool>,
    pub location_label: Option<String>,
}

const RULE_COLUMNS: &str = "id, variable, lat, lon, location_label, metric, comparison, \
     threshold, consecutive_hours, enabled, created_at";

fn rule_from_row(row: &Row<'_>) -> rusqlite::Result<AlertRuleRow> {
    let variable: String = row.get(1)?;
    let metric: String = row.get(5)?;
    let comparison: String = row.get(6)?;
    Ok(AlertRuleRow {
        id: row.get(0)?,
        variable: parse_col(&variable, 1)?,
        lat: row.get(2)?,
        lon: row.get(3)?,
        location_label: row.get(4)?,
        metric: parse_col(&metric, 5)?,
        comparison: parse_col(&comparison, 6)?,
        threshold: row.get(7)?,
        consecutive_hours: row.get(8)?,
        enabled: row.get(9)?,
        created_at: ts_from_col(row.get(10)?, 10)?,
    })
}

pub fn insert_rule(
    conn: &Connection,
    rule: &NewAlertRule,
    created_at: DateTime<Utc>,
) -> Result<AlertRuleRow, StorageError> {
    let id = uuid::Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO alert_rules
            (id, variable, lat, lon, location_label, metric, comparison, threshold,
             consecutive_hours, enabled, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 1, ?10)",
        params![
            id,
            rule.variable.as_str(),
            rule.lat,
            rule.lon,
            rule.location_label,
            rule.metric.as_str(),
            rule.comparison.as_str(),
            rule.threshold,
            rule.consecutive_hours.max(1),
            created_at.timestamp()
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    get_rule(conn, &id)?.ok_or_else(|| StorageError::NotFound {
        entity: "alert rule".to_string(),
        id,
    })
}

pub fn get_rule(conn: &Connection, id: &str) -> Result<Option<AlertRuleRow>, StorageError> {
    let sql = format!("SELECT {RULE_COLUMNS} FROM alert_rules WHERE id = ?1");
    conn.query_row(&sql, params![id], rule_from_row)
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))
}

/// All rules, newest first.
pub fn list_rules(conn: &Connection) -> Result<Vec<AlertRuleRow>, StorageError> {
    let sql = format!("SELECT {RULE_COLUMNS} FROM alert_rules ORDER BY created_at DESC, id");
    let mut stmt = conn
        .prepare_cached(&sql)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map([], rule_from_row)
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}

/// Enabled rules watching `variable`.
pub fn enabled_rules_for(
    conn: &Connection,
    variable: Variable,
) -> Result<Vec<AlertRuleRow>, StorageError> {
    let sql = format!(
        "SELECT {RULE_COLUMNS} FROM alert_rules
         WHERE variable = ?1 AND enabled = 1
         ORDER BY created_at, id"
    );
    let mut stmt = conn
        .prepare_cached(&sql)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![variable.as_str()], rule_from_row)
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}

/// Apply a partial update. Returns the updated rule, or `NotFound`.
pub fn update_rule(
    conn: &Connection,
    id: &str,
    update: &AlertRuleUpdate,
) -> Result<AlertRuleRow, StorageError> {
    let changed = conn
        .execute(
            "UPDATE alert_rules SET
                threshold = COALESCE(?1, threshold),
                comparison = COALESCE(?2, comparison),
                consecutive_hours = COALESCE(?3, consecutive_hours),
                enabled = COALESCE(?4, enabled),
                location_label = COALESCE(?5, location_label)
             WHERE id = ?6",
            params![
                update.threshold,
                update.comparison.map(Comparison::as_str),
                update.consecutive_hours.map(|h| h.max(1)),
                update.enabled,
                update.location_label,
                id
            ],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    if changed == 0 {
        return Err(StorageError::NotFound {
            entity: "alert rule".to_string(),
            id: id.to_string(),
        });
    }
    get_rule(conn, id)?.ok_or_else(|| StorageError::NotFound {
        entity: "alert rule".to_string(),
        id: id.to_string(),
    })
}

/// Delete a rule. Its events remain with `rule_id` cleared.
pub fn delete_rule(conn: &Connection, id: &str) -> Result<bool, StorageError> {
    let removed = conn
        .execute("DELETE FROM alert_rules WHERE id = ?1", params![id])
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(removed > 0)
}

// ─── Events ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct AlertEventRow {
    pub id: String,
    pub rule_id: Option<String>,
    pub triggered_at: DateTime<Utc>,
    pub value: f64,
    pub variable: Variable,
    pub lat: f64,
    pub lon: f64,
    pub location_label: Option<String>,
    pub lead_hour: u32,
    pub resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAlertEvent {
    pub rule_id: String,
    pub triggered_at: DateTime<Utc>,
    pub value: f64,
    pub variable: Variable,
    pub lat: f64,
    pub lon: f64,
    pub location_label: Option<String>,
    pub lead_hour: u32,
}

const EVENT_COLUMNS: &str = "id, rule_id, triggered_at, value, variable, lat, lon, \
     location_label, lead_hour, resolved, resolved_at";

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<AlertEventRow> {
    let variable: String = row.get(4)?;
    let resolved_at: Option<i64> = row.get(10)?;
    Ok(AlertEventRow {
        id: row.get(0)?,
        rule_id: row.get(1)?,
        triggered_at: ts_from_col(row.get(2)?, 2)?,
        value: row.get(3)?,
        variable: parse_col(&variable, 4)?,
        lat: row.get(5)?,
        lon: row.get(6)?,
        location_label: row.get(7)?,
        lead_hour: row.get(8)?,
        resolved: row.get(9)?,
        resolved_at: resolved_at.map(|s| ts_from_col(s, 10)).transpose()?,
    })
}

pub fn insert_event(conn: &Connection, event: &NewAlertEvent) -> Result<AlertEventRow, StorageError> {
    let id = uuid::Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO alert_events
            (id, rule_id, triggered_at, value, variable, lat, lon, location_label, lead_hour)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            id,
            event.rule_id,
            event.triggered_at.timestamp(),
            event.value,
            event.variable.as_str(),
            event.lat,
            event.lon,
            event.location_label,
            event.lead_hour
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(AlertEventRow {
        id,
        rule_id: Some(event.rule_id.clone()),
        triggered_at: event.triggered_at,
        value: event.value,
        variable: event.variable,
        lat: event.lat,
        lon: event.lon,
        location_label: event.location_label.clone(),
        lead_hour: event.lead_hour,
        resolved: false,
        resolved_at: None,
    })
}

/// Events newest first; `unresolved_only` hides resolved ones.
pub fn list_events(
    conn: &Connection,
    unresolved_only: bool,
    limit: usize,
) -> Result<Vec<AlertEventRow>, StorageError> {
    let sql = format!(
        "SELECT {EVENT_COLUMNS} FROM alert_events
         WHERE (?1 = 0 OR resolved = 0)
         ORDER BY triggered_at DESC, rowid DESC
         LIMIT ?2"
    );
    let mut stmt = conn
        .prepare_cached(&sql)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![unresolved_only, limit as i64], event_from_row)
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}

/// Mark an event resolved. Returns the updated event, or `NotFound`.
pub fn resolve_event(
    conn: &Connection,
    id: &str,
    resolved_at: DateTime<Utc>,
) -> Result<AlertEventRow, StorageError> {
    conn.execute(
        "UPDATE alert_events SET resolved = 1, resolved_at = ?1 WHERE id = ?2",
        params![resolved_at.timestamp(), id],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    let sql = format!("SELECT {EVENT_COLUMNS} FROM alert_events WHERE id = ?1");
    conn.query_row(&sql, params![id], event_from_row)
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?
        .ok_or_else(|| StorageError::NotFound {
            entity: "alert event".to_string(),
            id: id.to_string(),
        })
}

pub fn count_events(conn: &Connection) -> Result<i64, StorageError> {
    conn.query_row("SELECT COUNT(*) FROM alert_events", [], |row| row.get(0))
        .map_err(|e| to_storage_err(e.to_string()))
}
