//! Grid divergence: per-cell spread across models on the common grid.

use rayon::prelude::*;
use spread_core::errors::GridError;
use spread_core::types::{GridField, ModelFields, Variable};
use statrs::statistics::Statistics;

use crate::regrid::regrid_to_common;

/// Per-cell sample standard deviation (N-1) across all models that regrid
/// onto the common grid. Cells with fewer than two valid members are NaN.
pub fn compute_grid_divergence(
    models: &ModelFields,
    variable: Variable,
    resolution: f64,
) -> Result<GridField, GridError> {
    let regridded = regrid_to_common(models, variable, resolution)?;
    if regridded.len() < 2 {
        return Err(GridError::InsufficientModels {
            variable: variable.to_string(),
            available: regridded.len(),
        });
    }

    let members: Vec<&GridField> = regridded.values().collect();
    let (latitude, longitude) = (members[0].latitude.clone(), members[0].longitude.clone());
    let cells = members[0].values.len();

    let values: Vec<f64> = (0..cells)
        .into_par_iter()
        .map_init(
            || Vec::with_capacity(members.len()),
            |column: &mut Vec<f64>, cell| {
                column.clear();
                column.extend(
                    members
                        .iter()
                        .map(|grid| grid.values[cell])
                        .filter(|v| !v.is_nan()),
                );
                if column.len() < 2 {
                    f64::NAN
                } else {
                    column.iter().std_dev()
                }
            },
        )
        .collect();

    Ok(GridField {
        name: format!("{variable}_divergence"),
        latitude,
        longitude,
        values,
    })
}
