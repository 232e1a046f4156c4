//! Shared constants for the divergence engine.

/// Engine version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name used in notification payloads.
pub const ENGINE_NAME: &str = "SynopticSpread";

/// Half-width, in degrees, of the box used to match a location against a
/// rule or a stored metric.
pub const LOCATION_TOLERANCE_DEG: f64 = 0.5;

/// Number of runs returned by the status readout.
pub const RECENT_RUNS_LIMIT: usize = 10;

/// Snapshot chunk edge length (cells).
pub const SNAPSHOT_CHUNK_SIZE: usize = 256;

/// Snapshot file name for array metadata.
pub const SNAPSHOT_META_FILE: &str = "meta.json";

/// Lead hours fetched when no explicit list is configured: 0 to 120 every 6 h.
pub fn default_lead_hours() -> Vec<u32> {
    (0..=120).step_by(6).collect()
}
