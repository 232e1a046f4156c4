//! spread-core: foundation crate for the cross-model divergence engine.
//!
//! Field model, variable vocabulary, model identity, errors, configuration,
//! cancellation, and structured tracing. Every other crate depends on this one.

pub mod config;
pub mod constants;
pub mod errors;
pub mod traits;
pub mod tracing_setup;
pub mod types;

pub use config::SpreadConfig;
pub use errors::{EngineError, SpreadErrorCode};
pub use types::{
    BoundingBox, Coordinates, Field, FieldSet, GridField, ModelFields, ModelId, MonitorPoint,
    Variable,
};
