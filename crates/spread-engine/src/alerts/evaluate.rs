//! Rule evaluation.
//!
//! A rule fires when its metric passes the comparison for the current
//! observation. Rules with `consecutive_hours = N > 1` additionally require
//! the N most recent stored metrics near the point to pass as well, each
//! judged on its own spread/rmse/bias.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use spread_core::constants::LOCATION_TOLERANCE_DEG;
use spread_core::errors::StorageError;
use spread_core::types::Variable;
use spread_storage::queries::alerts::{self, AlertEventRow, AlertRuleRow, NewAlertEvent};
use spread_storage::queries::metrics;

/// Divergence statistics for one variable at one monitoring point and lead
/// hour.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub variable: Variable,
    pub lat: f64,
    pub lon: f64,
    pub lead_hour: u32,
    pub spread: f64,
    /// Largest pairwise RMSE at the point.
    pub rmse: f64,
    /// Bias of the last pair in model-name order.
    pub bias: f64,
    pub location_label: Option<String>,
}

/// Evaluate every enabled rule for the observation's variable and persist
/// the events that fire. Runs on the caller's connection so events land in
/// the caller's transaction.
pub fn check_alerts(
    conn: &Connection,
    observation: &Observation,
    now: DateTime<Utc>,
) -> Result<Vec<AlertEventRow>, StorageError> {
    let rules = alerts::enabled_rules_for(conn, observation.variable)?;
    let mut fired = Vec::new();

    for rule in rules {
        if !covers_location(&rule, observation) {
            continue;
        }
        let value = rule
            .metric
            .select(observation.spread, observation.rmse, observation.bias);
        if !rule.comparison.passes(value, rule.threshold) {
            continue;
        }
        if rule.consecutive_hours > 1 && !sustained(conn, &rule, observation)? {
            continue;
        }

        let event = alerts::insert_event(
            conn,
            &NewAlertEvent {
                rule_id: rule.id.clone(),
                triggered_at: now,
                value,
                variable: observation.variable,
                lat: observation.lat,
                lon: observation.lon,
                location_label: observation
                    .location_label
                    .clone()
                    .or_else(|| rule.location_label.clone()),
                lead_hour: observation.lead_hour,
            },
        )?;
        tracing::debug!(
            rule_id = %rule.id,
            variable = %observation.variable,
            metric = %rule.metric,
            value = value,
            threshold = rule.threshold,
            "alert rule fired"
        );
        fired.push(event);
    }

    Ok(fired)
}

fn covers_location(rule: &AlertRuleRow, observation: &Observation) -> bool {
    match rule.location() {
        Some((lat, lon)) => {
            (lat - observation.lat).abs() <= LOCATION_TOLERANCE_DEG
                && (lon - observation.lon).abs() <= LOCATION_TOLERANCE_DEG
        }
        None => true,
    }
}

/// The most recent `consecutive_hours` metrics near the point must all
/// breach.
fn sustained(
    conn: &Connection,
    rule: &AlertRuleRow,
    observation: &Observation,
) -> Result<bool, StorageError> {
    let needed = rule.consecutive_hours as usize;
    let recent = metrics::recent_near(
        conn,
        observation.variable,
        observation.lat,
        observation.lon,
        LOCATION_TOLERANCE_DEG,
        None,
        needed,
    )?;
    if recent.len() < needed {
        return Ok(false);
    }
    Ok(recent.iter().all(|m| {
        let value = rule.metric.select(m.spread, m.rmse, m.bias);
        rule.comparison.passes(value, rule.threshold)
    }))
}
