//! Structured log events for key engine operations.
//!
//! Each function emits a `tracing` event with structured fields.

/// Log the start of a model ingestion.
pub fn run_started(model: &str, init_time: &str, force: bool) {
    tracing::info!(
        event = "run_started",
        model = %model,
        init_time = %init_time,
        force = force,
        "ingestion started"
    );
}

/// Log an ingestion skipped because the run already exists.
pub fn run_skipped(model: &str, init_time: &str, status: &str) {
    tracing::info!(
        event = "run_skipped",
        model = %model,
        init_time = %init_time,
        status = %status,
        "run already exists, skipping"
    );
}

/// Log a completed ingestion.
pub fn run_completed(model: &str, init_time: &str, lead_hours: usize, raw_values: usize) {
    tracing::info!(
        event = "run_completed",
        model = %model,
        init_time = %init_time,
        lead_hours = lead_hours,
        raw_values = raw_values,
        "ingestion completed"
    );
}

/// Log a failed ingestion.
pub fn run_failed(model: &str, init_time: &str, code: &str, error: &str) {
    tracing::error!(
        event = "run_failed",
        model = %model,
        init_time = %init_time,
        code = %code,
        error = %error,
        "ingestion failed"
    );
}

/// Log one processed divergence lead hour.
pub fn lead_hour_processed(init_time: &str, lead_hour: u32, models: usize, metrics: usize, snapshots: usize) {
    tracing::info!(
        event = "lead_hour_processed",
        init_time = %init_time,
        lead_hour = lead_hour,
        models = models,
        metrics = metrics,
        snapshots = snapshots,
        "divergence lead hour committed"
    );
}

/// Log a lead hour skipped for lack of models.
pub fn lead_hour_skipped(init_time: &str, lead_hour: u32, available: usize) {
    tracing::warn!(
        event = "lead_hour_skipped",
        init_time = %init_time,
        lead_hour = lead_hour,
        available = available,
        "fewer than 2 models fetched, skipping lead hour"
    );
}

/// Log fired alerts.
pub fn alerts_fired(count: usize, lead_hour: u32) {
    tracing::info!(
        event = "alerts_fired",
        count = count,
        lead_hour = lead_hour,
        "alert rules triggered"
    );
}

/// Log a swallowed notification failure.
pub fn notification_failed(code: &str, error: &str) {
    tracing::warn!(
        event = "notification_failed",
        code = %code,
        error = %error,
        "alert notification failed"
    );
}

/// Log completion of a divergence recomputation.
pub fn divergence_completed(init_time: &str, hours_processed: usize, hours_skipped: usize, cancelled: bool) {
    tracing::info!(
        event = "divergence_completed",
        init_time = %init_time,
        hours_processed = hours_processed,
        hours_skipped = hours_skipped,
        cancelled = cancelled,
        "divergence recomputation finished"
    );
}
