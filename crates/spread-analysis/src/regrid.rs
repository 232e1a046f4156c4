//! Resampling every model onto one regular latitude/longitude grid.
//!
//! The common grid covers the intersection of the models' native extents.
//! Regular source grids are sampled nearest-neighbour per axis; curvilinear
//! grids go through an R-tree over their valid cells.

use std::collections::BTreeMap;

use rayon::prelude::*;
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use spread_core::errors::GridError;
use spread_core::types::{BoundingBox, Coordinates, Field, GridField, ModelFields, ModelId, Variable};

use crate::point::nearest_index;

/// One valid source cell of a curvilinear grid.
#[derive(Debug, Clone, Copy)]
struct SourceCell {
    lat: f64,
    lon: f64,
    value: f64,
}

impl RTreeObject for SourceCell {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.lat, self.lon])
    }
}

impl PointDistance for SourceCell {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dlat = self.lat - point[0];
        let dlon = self.lon - point[1];
        dlat * dlat + dlon * dlon
    }
}

/// Target axes for the common grid.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetGrid {
    pub latitude: Vec<f64>,
    pub longitude: Vec<f64>,
}

impl TargetGrid {
    /// Half-open axes `start, start + res, ...` strictly below each max.
    pub fn covering(bbox: &BoundingBox, resolution: f64) -> Self {
        Self {
            latitude: arange(bbox.lat_min, bbox.lat_max, resolution),
            longitude: arange(bbox.lon_min, bbox.lon_max, resolution),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.latitude.is_empty() || self.longitude.is_empty()
    }

    pub fn cells(&self) -> usize {
        self.latitude.len() * self.longitude.len()
    }
}

fn arange(start: f64, stop: f64, step: f64) -> Vec<f64> {
    if start.is_nan() || stop.is_nan() || stop <= start {
        return Vec::new();
    }
    let n = ((stop - start) / step).ceil() as usize;
    (0..n).map(|i| start + i as f64 * step).collect()
}

/// Intersection of the native extents of every model carrying `variable`
/// with usable coordinates. `None` when no model qualifies.
pub fn common_extent(models: &ModelFields, variable: Variable) -> Option<BoundingBox> {
    models
        .values()
        .filter_map(|fields| fields.get(variable)?.extent())
        .reduce(|acc, bbox| acc.intersect(&bbox))
}

/// Regrid every model's `variable` onto the common grid.
///
/// Models without the variable, without coordinates, or without any valid
/// cell are omitted. An empty intersection yields an empty map.
pub fn regrid_to_common(
    models: &ModelFields,
    variable: Variable,
    resolution: f64,
) -> Result<BTreeMap<ModelId, GridField>, GridError> {
    if !resolution.is_finite() || resolution <= 0.0 {
        return Err(GridError::InvalidResolution { resolution });
    }

    let candidates: Vec<(ModelId, &Field)> = models
        .iter()
        .filter_map(|(model, fields)| match fields.get(variable) {
            Some(field) if field.coordinates().is_some() => Some((*model, field)),
            Some(_) => {
                tracing::warn!(model = %model, variable = %variable, "field has no coordinates, omitted from regrid");
                None
            }
            None => {
                tracing::debug!(model = %model, variable = %variable, "variable missing, omitted from regrid");
                None
            }
        })
        .collect();

    let Some(bbox) = common_extent(models, variable) else {
        return Ok(BTreeMap::new());
    };
    let target = TargetGrid::covering(&bbox, resolution);
    if bbox.is_empty() || target.is_empty() {
        tracing::debug!(variable = %variable, ?bbox, "models do not overlap");
        return Ok(BTreeMap::new());
    }

    let regridded: BTreeMap<ModelId, GridField> = candidates
        .par_iter()
        .filter_map(|(model, field)| {
            match resample(field, &target) {
                Some(values) => Some((
                    *model,
                    GridField {
                        name: variable.to_string(),
                        latitude: target.latitude.clone(),
                        longitude: target.longitude.clone(),
                        values,
                    },
                )),
                None => {
                    tracing::warn!(model = %model, variable = %variable, "no valid source cells, omitted from regrid");
                    None
                }
            }
        })
        .collect();

    tracing::debug!(
        variable = %variable,
        models = regridded.len(),
        ny = target.latitude.len(),
        nx = target.longitude.len(),
        "regridded to common grid"
    );
    Ok(regridded)
}

/// Values of `field` at every target cell, row-major.
fn resample(field: &Field, target: &TargetGrid) -> Option<Vec<f64>> {
    match field.coordinates()? {
        Coordinates::Axes {
            latitude,
            longitude,
        } => {
            let rows: Vec<usize> = target
                .latitude
                .iter()
                .map(|lat| nearest_index(latitude, *lat))
                .collect::<Option<_>>()?;
            let cols: Vec<usize> = target
                .longitude
                .iter()
                .map(|lon| nearest_index(longitude, *lon))
                .collect::<Option<_>>()?;
            let mut values = Vec::with_capacity(target.cells());
            for &row in &rows {
                values.extend(cols.iter().map(|&col| field.value_at(row, col)));
            }
            Some(values)
        }
        Coordinates::Curvilinear {
            latitude,
            longitude,
        } => {
            let cells: Vec<SourceCell> = latitude
                .iter()
                .zip(longitude)
                .zip(field.values())
                .filter(|((lat, lon), value)| {
                    lat.is_finite() && lon.is_finite() && !value.is_nan()
                })
                .map(|((lat, lon), value)| SourceCell {
                    lat: *lat,
                    lon: *lon,
                    value: *value,
                })
                .collect();
            if cells.is_empty() {
                return None;
            }
            let tree = RTree::bulk_load(cells);
            let mut values = Vec::with_capacity(target.cells());
            for lat in &target.latitude {
                for lon in &target.longitude {
                    let nearest = tree.nearest_neighbor(&[*lat, *lon])?;
                    values.push(nearest.value);
                }
            }
            Some(values)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arange_is_half_open() {
        assert_eq!(arange(0.0, 1.0, 0.25), vec![0.0, 0.25, 0.5, 0.75]);
        assert_eq!(arange(0.0, 0.9, 0.25), vec![0.0, 0.25, 0.5, 0.75]);
        assert!(arange(1.0, 1.0, 0.25).is_empty());
    }

    #[test]
    fn rtree_picks_closest_cell() {
        let tree = RTree::bulk_load(vec![
            SourceCell {
                lat: 0.0,
                lon: 0.0,
                value: 1.0,
            },
            SourceCell {
                lat: 1.0,
                lon: 1.0,
                value: 2.0,
            },
        ]);
        assert_eq!(tree.nearest_neighbor(&[0.9, 0.8]).unwrap().value, 2.0);
    }
}
