//! Point extraction, pairwise metrics and ensemble spread.

use spread_analysis::point::{point_values, spread_of};
use spread_analysis::{compute_ensemble_spread, compute_pairwise_metrics, extract_point};
use spread_core::errors::FieldError;
use spread_core::types::{Field, FieldSet, ModelFields, ModelId, Variable};

/// 3x3 regular grid with `value` everywhere except the centre, which holds
/// `centre`.
fn regular(value: f64, centre: f64) -> Field {
    let mut values = vec![value; 9];
    values[4] = centre;
    Field::on_axes(vec![39.0, 40.0, 41.0], vec![-75.0, -74.0, -73.0], values).unwrap()
}

fn single(variable: Variable, value: f64) -> FieldSet {
    FieldSet::new().with(variable, regular(value, value))
}

#[test]
fn extract_point_regular_grid_picks_nearest_cell() {
    let set = FieldSet::new().with(Variable::Mslp, regular(1000.0, 1013.0));
    let v = extract_point(&set, Variable::Mslp, 40.2, -74.3).unwrap();
    assert_eq!(v, 1013.0);
    let corner = extract_point(&set, Variable::Mslp, 45.0, -80.0).unwrap();
    assert_eq!(corner, 1000.0);
}

#[test]
fn extract_point_curvilinear_uses_euclidean_argmin() {
    let field = Field::curvilinear(
        2,
        2,
        vec![30.0, 30.5, 31.0, 31.5],
        vec![-100.0, -99.0, -100.5, -99.5],
        vec![1.0, 2.0, 3.0, 4.0],
    )
    .unwrap();
    let set = FieldSet::new().with(Variable::Precip, field);
    assert_eq!(extract_point(&set, Variable::Precip, 31.4, -99.6).unwrap(), 4.0);
    assert_eq!(extract_point(&set, Variable::Precip, 30.0, -100.0).unwrap(), 1.0);
}

#[test]
fn extract_point_without_coordinates_fails() {
    let field = Field::without_coordinates(1, 2, vec![1.0, 2.0]).unwrap();
    let set = FieldSet::new().with(Variable::WindSpeed, field);
    let err = extract_point(&set, Variable::WindSpeed, 0.0, 0.0).unwrap_err();
    assert!(matches!(err, FieldError::MissingCoordinate { .. }));
}

#[test]
fn extract_point_missing_variable_fails() {
    let set = single(Variable::Mslp, 1000.0);
    let err = extract_point(&set, Variable::Precip, 40.0, -74.0).unwrap_err();
    assert!(matches!(err, FieldError::MissingVariable { .. }));
}

#[test]
fn pairwise_two_models() {
    let mut models = ModelFields::new();
    models.insert(ModelId::Gfs, single(Variable::Precip, 12.0));
    models.insert(ModelId::Ecmwf, single(Variable::Precip, 10.0));

    let pairs = compute_pairwise_metrics(&models, Variable::Precip, 40.0, -74.0).unwrap();
    assert_eq!(pairs.len(), 1);
    let pair = &pairs[0];
    assert_eq!(pair.model_a, ModelId::Ecmwf);
    assert_eq!(pair.model_b, ModelId::Gfs);
    assert_eq!(pair.rmse, 2.0);
    assert_eq!(pair.bias, -2.0);
    assert_eq!(pair.value_a, 10.0);
    assert_eq!(pair.value_b, 12.0);
}

#[test]
fn pairwise_order_is_lexical() {
    let mut models = ModelFields::new();
    models.insert(ModelId::Nam, single(Variable::Mslp, 1.0));
    models.insert(ModelId::Gfs, single(Variable::Mslp, 2.0));
    models.insert(ModelId::Ecmwf, single(Variable::Mslp, 3.0));

    let pairs = compute_pairwise_metrics(&models, Variable::Mslp, 40.0, -74.0).unwrap();
    let order: Vec<(ModelId, ModelId)> = pairs.iter().map(|p| (p.model_a, p.model_b)).collect();
    assert_eq!(
        order,
        vec![
            (ModelId::Ecmwf, ModelId::Gfs),
            (ModelId::Ecmwf, ModelId::Nam),
            (ModelId::Gfs, ModelId::Nam),
        ]
    );
}

#[test]
fn models_without_variable_are_skipped() {
    let mut models = ModelFields::new();
    models.insert(ModelId::Gfs, single(Variable::Precip, 1.0));
    models.insert(ModelId::Hrrr, single(Variable::Precip, 3.0));
    models.insert(ModelId::Aigfs, single(Variable::Mslp, 1000.0));

    let values = point_values(&models, Variable::Precip, 40.0, -74.0).unwrap();
    assert_eq!(values.len(), 2);
    assert!(!values.contains_key(&ModelId::Aigfs));

    let pairs = compute_pairwise_metrics(&models, Variable::Precip, 40.0, -74.0).unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].model_a, ModelId::Gfs);
    assert_eq!(pairs[0].model_b, ModelId::Hrrr);
}

#[test]
fn ensemble_spread_is_sample_std() {
    let mut models = ModelFields::new();
    models.insert(ModelId::Gfs, single(Variable::Precip, 10.0));
    models.insert(ModelId::Nam, single(Variable::Precip, 12.0));
    models.insert(ModelId::Ecmwf, single(Variable::Precip, 8.0));
    let spread = compute_ensemble_spread(&models, Variable::Precip, 40.0, -74.0).unwrap();
    assert!((spread - 2.0).abs() < 1e-12);
}

#[test]
fn ensemble_spread_with_one_model_is_zero() {
    let mut models = ModelFields::new();
    models.insert(ModelId::Gfs, single(Variable::Precip, 10.0));
    let spread = compute_ensemble_spread(&models, Variable::Precip, 40.0, -74.0).unwrap();
    assert_eq!(spread, 0.0);
    assert_eq!(spread_of(Vec::<f64>::new()), 0.0);
}
