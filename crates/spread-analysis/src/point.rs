//! Point metrics: nearest-cell values, pairwise comparison, ensemble spread.

use std::collections::BTreeMap;

use spread_core::errors::FieldError;
use spread_core::types::{Coordinates, Field, FieldSet, ModelFields, ModelId, Variable};
use statrs::statistics::Statistics;

/// Comparison of two models at one point. `model_a < model_b` by name.
#[derive(Debug, Clone, PartialEq)]
pub struct PairwiseComparison {
    pub model_a: ModelId,
    pub model_b: ModelId,
    /// Single-sample RMSE: `|value_a - value_b|`.
    pub rmse: f64,
    /// `value_a - value_b`.
    pub bias: f64,
    pub value_a: f64,
    pub value_b: f64,
}

/// Value of the cell nearest to `(lat, lon)`.
pub fn extract_point(
    fields: &FieldSet,
    variable: Variable,
    lat: f64,
    lon: f64,
) -> Result<f64, FieldError> {
    let field = fields.require(variable)?;
    extract_from_field(field, variable, lat, lon)
}

fn extract_from_field(
    field: &Field,
    variable: Variable,
    lat: f64,
    lon: f64,
) -> Result<f64, FieldError> {
    let missing = || FieldError::MissingCoordinate {
        variable: variable.to_string(),
    };
    match field.coordinates().ok_or_else(missing)? {
        Coordinates::Axes {
            latitude,
            longitude,
        } => {
            let row = nearest_index(latitude, lat).ok_or_else(missing)?;
            let col = nearest_index(longitude, lon).ok_or_else(missing)?;
            Ok(field.value_at(row, col))
        }
        Coordinates::Curvilinear {
            latitude,
            longitude,
        } => {
            let idx = latitude
                .iter()
                .zip(longitude)
                .map(|(la, lo)| (la - lat).powi(2) + (lo - lon).powi(2))
                .enumerate()
                .filter(|(_, d)| !d.is_nan())
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(i, _)| i)
                .ok_or_else(missing)?;
            Ok(field.values()[idx])
        }
    }
}

/// Index of the axis entry closest to `target`, ignoring NaN entries.
pub(crate) fn nearest_index(axis: &[f64], target: f64) -> Option<usize> {
    axis.iter()
        .map(|v| (v - target).abs())
        .enumerate()
        .filter(|(_, d)| !d.is_nan())
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

/// Point value for every model that carries `variable`, keyed by model.
/// Models without the variable are skipped; a model whose field cannot be
/// sampled fails the whole point.
pub fn point_values(
    models: &ModelFields,
    variable: Variable,
    lat: f64,
    lon: f64,
) -> Result<BTreeMap<ModelId, f64>, FieldError> {
    models
        .iter()
        .filter(|(_, fields)| fields.contains(variable))
        .map(|(model, fields)| Ok((*model, extract_point(fields, variable, lat, lon)?)))
        .collect()
}

/// Pairwise bias and RMSE between every pair of models carrying `variable`.
pub fn compute_pairwise_metrics(
    models: &ModelFields,
    variable: Variable,
    lat: f64,
    lon: f64,
) -> Result<Vec<PairwiseComparison>, FieldError> {
    let values = point_values(models, variable, lat, lon)?;
    Ok(pairwise_from_values(&values))
}

/// Pairs in lexical model order. `BTreeMap<ModelId, _>` iterates by name.
pub fn pairwise_from_values(values: &BTreeMap<ModelId, f64>) -> Vec<PairwiseComparison> {
    let entries: Vec<(ModelId, f64)> = values.iter().map(|(m, v)| (*m, *v)).collect();
    let mut pairs = Vec::with_capacity(entries.len() * entries.len().saturating_sub(1) / 2);
    for (i, &(model_a, value_a)) in entries.iter().enumerate() {
        for &(model_b, value_b) in &entries[i + 1..] {
            let diff = value_a - value_b;
            pairs.push(PairwiseComparison {
                model_a,
                model_b,
                rmse: diff.abs(),
                bias: diff,
                value_a,
                value_b,
            });
        }
    }
    pairs
}

/// Sample standard deviation (N-1) across models at a point; `0.0` when
/// fewer than two models have a value.
pub fn compute_ensemble_spread(
    models: &ModelFields,
    variable: Variable,
    lat: f64,
    lon: f64,
) -> Result<f64, FieldError> {
    let values = point_values(models, variable, lat, lon)?;
    Ok(spread_of(values.values().copied()))
}

/// Sample standard deviation of the non-NaN values; `0.0` below two values.
pub fn spread_of(values: impl IntoIterator<Item = f64>) -> f64 {
    let finite: Vec<f64> = values.into_iter().filter(|v| !v.is_nan()).collect();
    if finite.len() < 2 {
        return 0.0;
    }
    finite.std_dev()
}
