//! Trait seams: cancellation and model data connectors.

pub mod cancellation;
pub mod fetcher;

pub use cancellation::{Cancellable, CancellationToken};
pub use fetcher::ModelFetcher;
