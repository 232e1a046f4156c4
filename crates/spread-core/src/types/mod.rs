//! Domain types shared across the workspace.

pub mod alert;
pub mod field;
pub mod grid;
pub mod model;
pub mod point;
pub mod run;
pub mod variable;

pub use alert::{AlertMetric, Comparison};
pub use field::{wind_speed_from_components, Coordinates, Field, FieldSet, ModelFields};
pub use grid::{BoundingBox, GridField};
pub use model::{latest_cycle, CyclePolicy, ModelId};
pub use point::MonitorPoint;
pub use run::RunStatus;
pub use variable::Variable;

/// Returned when a string does not name a known enum variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
