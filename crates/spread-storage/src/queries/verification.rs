//! Forecast verification against later analyses.
//!
//! A forecast value (lead hour > 0) is scored against the same model's
//! analysis (lead hour 0) from the run whose init time equals the
//! forecast's valid time. Read-only.

use std::collections::BTreeMap;

use chrono::Duration;
use rusqlite::{params, Connection};
use spread_core::errors::StorageError;
use spread_core::types::{ModelId, Variable};

use super::{parse_col, ts_from_col};
use crate::to_storage_err;

/// Error statistics for one model at one lead hour.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationScore {
    pub model: ModelId,
    pub lead_hour: u32,
    /// Mean absolute error, rounded to 4 decimals.
    pub mae: f64,
    /// Mean signed error (forecast minus analysis), rounded to 4 decimals.
    pub bias: f64,
    pub n_samples: usize,
}

/// Score forecasts near `(lat, lon)` (within `tolerance` degrees).
/// Results are ordered by model, then lead hour.
pub fn scores(
    conn: &Connection,
    variable: Variable,
    lat: f64,
    lon: f64,
    tolerance: f64,
    model: Option<ModelId>,
) -> Result<Vec<VerificationScore>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT v.value, v.lead_hour, r.model_name, r.init_time
             FROM model_point_values v
             JOIN model_runs r ON r.id = v.run_id
             WHERE v.variable = ?1
               AND v.lat BETWEEN ?2 AND ?3
               AND v.lon BETWEEN ?4 AND ?5
               AND (?6 IS NULL OR r.model_name = ?6)
             ORDER BY v.id",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(
            params![
                variable.as_str(),
                lat - tolerance,
                lat + tolerance,
                lon - tolerance,
                lon + tolerance,
                model.map(ModelId::as_str)
            ],
            |row| {
                let model: String = row.get(2)?;
                Ok((
                    row.get::<_, f64>(0)?,
                    row.get::<_, u32>(1)?,
                    parse_col::<ModelId>(&model, 2)?,
                    ts_from_col(row.get(3)?, 3)?,
                ))
            },
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = rows
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;

    // Analyses keyed by (model, valid time); for an analysis the init time
    // is the valid time.
    let mut analyses = BTreeMap::new();
    let mut forecasts = Vec::new();
    for (value, lead_hour, model, init_time) in rows {
        if lead_hour == 0 {
            analyses.insert((model, init_time), value);
        } else {
            forecasts.push((model, lead_hour, init_time, value));
        }
    }

    let mut errors: BTreeMap<(ModelId, u32), Vec<f64>> = BTreeMap::new();
    for (model, lead_hour, init_time, value) in forecasts {
        let valid_time = init_time + Duration::hours(i64::from(lead_hour));
        if let Some(analysis) = analyses.get(&(model, valid_time)) {
            errors
                .entry((model, lead_hour))
                .or_default()
                .push(value - analysis);
        }
    }

    Ok(errors
        .into_iter()
        .map(|((model, lead_hour), errs)| {
            let n = errs.len() as f64;
            let mae = errs.iter().map(|e| e.abs()).sum::<f64>() / n;
            let bias = errs.iter().sum::<f64>() / n;
            VerificationScore {
                model,
                lead_hour,
                mae: round4(mae),
                bias: round4(bias),
                n_samples: errs.len(),
            }
        })
        .collect())
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}
