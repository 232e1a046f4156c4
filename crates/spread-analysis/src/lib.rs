//! spread-analysis: the numerical core of cross-model divergence.
//!
//! - `point`: nearest-cell extraction, pairwise bias/RMSE, ensemble spread
//! - `regrid`: resampling every model onto a common regular grid
//! - `divergence`: per-cell sample standard deviation across models
//! - `snapshot`: chunked, compressed array store for divergence grids

pub mod divergence;
pub mod point;
pub mod regrid;
pub mod snapshot;

pub use divergence::compute_grid_divergence;
pub use point::{
    compute_ensemble_spread, compute_pairwise_metrics, extract_point, PairwiseComparison,
};
pub use regrid::regrid_to_common;
pub use snapshot::{init_time_key, SnapshotStore};
