//! Regular grids produced by regridding and divergence.

use serde::{Deserialize, Serialize};

use crate::errors::FieldError;

/// Latitude/longitude bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl BoundingBox {
    /// Bounds covering every finite coordinate. `None` when none are finite.
    pub fn spanning(latitude: &[f64], longitude: &[f64]) -> Option<Self> {
        let (lat_min, lat_max) = finite_range(latitude)?;
        let (lon_min, lon_max) = finite_range(longitude)?;
        Some(Self {
            lat_min,
            lat_max,
            lon_min,
            lon_max,
        })
    }

    /// Overlap of two boxes. The result may be empty (min >= max).
    pub fn intersect(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            lat_min: self.lat_min.max(other.lat_min),
            lat_max: self.lat_max.min(other.lat_max),
            lon_min: self.lon_min.max(other.lon_min),
            lon_max: self.lon_max.min(other.lon_max),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lat_min >= self.lat_max || self.lon_min >= self.lon_max
    }
}

fn finite_range(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// A named 2-D array on a regular latitude/longitude grid, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct GridField {
    pub name: String,
    pub latitude: Vec<f64>,
    pub longitude: Vec<f64>,
    pub values: Vec<f64>,
}

impl GridField {
    pub fn new(
        name: impl Into<String>,
        latitude: Vec<f64>,
        longitude: Vec<f64>,
        values: Vec<f64>,
    ) -> Result<Self, FieldError> {
        let expected = latitude.len() * longitude.len();
        if expected != values.len() {
            return Err(FieldError::ShapeMismatch {
                expected,
                actual: values.len(),
            });
        }
        Ok(Self {
            name: name.into(),
            latitude,
            longitude,
            values,
        })
    }

    /// `(latitude.len(), longitude.len())`.
    pub fn shape(&self) -> (usize, usize) {
        (self.latitude.len(), self.longitude.len())
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.longitude.len() + col]
    }

    pub fn bbox(&self) -> Option<BoundingBox> {
        BoundingBox::spanning(&self.latitude, &self.longitude)
    }

    /// Number of non-NaN cells.
    pub fn valid_count(&self) -> usize {
        self.values.iter().filter(|v| !v.is_nan()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersection_of_disjoint_boxes_is_empty() {
        let a = BoundingBox::spanning(&[0.0, 10.0], &[0.0, 10.0]).unwrap();
        let b = BoundingBox::spanning(&[20.0, 30.0], &[0.0, 10.0]).unwrap();
        assert!(a.intersect(&b).is_empty());
    }

    #[test]
    fn grid_field_shape_checked() {
        assert!(GridField::new("x", vec![0.0, 1.0], vec![0.0], vec![1.0]).is_err());
        let g = GridField::new("x", vec![0.0, 1.0], vec![0.0, 1.0], vec![1.0, 2.0, 3.0, f64::NAN])
            .unwrap();
        assert_eq!(g.shape(), (2, 2));
        assert_eq!(g.get(1, 0), 3.0);
        assert_eq!(g.valid_count(), 3);
    }
}
