//! Gridded forecast fields as delivered by connectors.
//!
//! Values are stored flat and row-major (`ny` rows of latitude, `nx`
//! columns of longitude). Coordinates are either one axis per dimension or
//! a full latitude/longitude pair per cell.

use std::collections::BTreeMap;

use super::{BoundingBox, ModelId, Variable};
use crate::errors::FieldError;

/// Fields for every model at one lead hour.
pub type ModelFields = BTreeMap<ModelId, FieldSet>;

#[derive(Debug, Clone, PartialEq)]
pub enum Coordinates {
    /// Regular grid: `latitude.len() == ny`, `longitude.len() == nx`.
    Axes {
        latitude: Vec<f64>,
        longitude: Vec<f64>,
    },
    /// Curvilinear grid: one latitude and longitude per cell, row-major.
    Curvilinear {
        latitude: Vec<f64>,
        longitude: Vec<f64>,
    },
}

/// One 2-D variable on a model's native grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    ny: usize,
    nx: usize,
    values: Vec<f64>,
    coords: Option<Coordinates>,
}

impl Field {
    /// Field on a regular latitude/longitude grid.
    pub fn on_axes(
        latitude: Vec<f64>,
        longitude: Vec<f64>,
        values: Vec<f64>,
    ) -> Result<Self, FieldError> {
        let (ny, nx) = (latitude.len(), longitude.len());
        check_len(ny * nx, values.len())?;
        Ok(Self {
            ny,
            nx,
            values,
            coords: Some(Coordinates::Axes {
                latitude,
                longitude,
            }),
        })
    }

    /// Field on a curvilinear grid (per-cell coordinates).
    pub fn curvilinear(
        ny: usize,
        nx: usize,
        latitude: Vec<f64>,
        longitude: Vec<f64>,
        values: Vec<f64>,
    ) -> Result<Self, FieldError> {
        let cells = ny * nx;
        check_len(cells, values.len())?;
        check_len(cells, latitude.len())?;
        check_len(cells, longitude.len())?;
        Ok(Self {
            ny,
            nx,
            values,
            coords: Some(Coordinates::Curvilinear {
                latitude,
                longitude,
            }),
        })
    }

    /// Field with no coordinate metadata. Point extraction and regridding
    /// reject such fields.
    pub fn without_coordinates(ny: usize, nx: usize, values: Vec<f64>) -> Result<Self, FieldError> {
        check_len(ny * nx, values.len())?;
        Ok(Self {
            ny,
            nx,
            values,
            coords: None,
        })
    }

    /// `(ny, nx)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.ny, self.nx)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn coordinates(&self) -> Option<&Coordinates> {
        self.coords.as_ref()
    }

    pub fn value_at(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.nx + col]
    }

    /// Native latitude/longitude extent, ignoring NaN coordinates.
    pub fn extent(&self) -> Option<BoundingBox> {
        match self.coords.as_ref()? {
            Coordinates::Axes {
                latitude,
                longitude,
            }
            | Coordinates::Curvilinear {
                latitude,
                longitude,
            } => BoundingBox::spanning(latitude, longitude),
        }
    }
}

fn check_len(expected: usize, actual: usize) -> Result<(), FieldError> {
    if expected == 0 {
        return Err(FieldError::Empty);
    }
    if expected != actual {
        return Err(FieldError::ShapeMismatch { expected, actual });
    }
    Ok(())
}

/// Wind speed magnitude from u/v components on the same grid.
pub fn wind_speed_from_components(u: &Field, v: &Field) -> Result<Field, FieldError> {
    check_len(u.values.len(), v.values.len())?;
    let values = u
        .values
        .iter()
        .zip(&v.values)
        .map(|(a, b)| a.hypot(*b))
        .collect();
    Ok(Field {
        ny: u.ny,
        nx: u.nx,
        values,
        coords: u.coords.clone(),
    })
}

/// Variables one model produced for one lead hour.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSet {
    fields: BTreeMap<Variable, Field>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, variable: Variable, field: Field) -> Self {
        self.fields.insert(variable, field);
        self
    }

    pub fn insert(&mut self, variable: Variable, field: Field) -> Option<Field> {
        self.fields.insert(variable, field)
    }

    pub fn get(&self, variable: Variable) -> Option<&Field> {
        self.fields.get(&variable)
    }

    /// Like `get`, but a missing variable is an error.
    pub fn require(&self, variable: Variable) -> Result<&Field, FieldError> {
        self.fields
            .get(&variable)
            .ok_or_else(|| FieldError::MissingVariable {
                variable: variable.to_string(),
            })
    }

    pub fn contains(&self, variable: Variable) -> bool {
        self.fields.contains_key(&variable)
    }

    pub fn variables(&self) -> impl Iterator<Item = Variable> + '_ {
        self.fields.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
