//! V001: Initial schema.
//! model_runs, model_point_values, point_metrics, grid_snapshots.

pub const MIGRATION_SQL: &str = r#"
-- One row per (model, init_time). Timestamps are Unix seconds (UTC).
CREATE TABLE IF NOT EXISTS model_runs (
    id TEXT PRIMARY KEY,
    model_name TEXT NOT NULL,
    init_time INTEGER NOT NULL,
    forecast_hours TEXT NOT NULL DEFAULT '[]',
    status TEXT NOT NULL DEFAULT 'pending',
    error TEXT,
    created_at INTEGER NOT NULL,
    UNIQUE (model_name, init_time)
) STRICT;

CREATE INDEX IF NOT EXISTS idx_model_runs_init
    ON model_runs(init_time, status);

-- Raw values sampled at monitoring points during ingestion.
CREATE TABLE IF NOT EXISTS model_point_values (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id TEXT NOT NULL REFERENCES model_runs(id) ON DELETE CASCADE,
    variable TEXT NOT NULL,
    lat REAL NOT NULL,
    lon REAL NOT NULL,
    lead_hour INTEGER NOT NULL,
    value REAL NOT NULL
) STRICT;

CREATE INDEX IF NOT EXISTS idx_point_values_run
    ON model_point_values(run_id, lead_hour);
CREATE INDEX IF NOT EXISTS idx_point_values_location
    ON model_point_values(variable, lat, lon);

-- Pairwise divergence between two runs at one point and lead hour.
CREATE TABLE IF NOT EXISTS point_metrics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_a_id TEXT NOT NULL REFERENCES model_runs(id) ON DELETE CASCADE,
    run_b_id TEXT NOT NULL REFERENCES model_runs(id) ON DELETE CASCADE,
    variable TEXT NOT NULL,
    lat REAL NOT NULL,
    lon REAL NOT NULL,
    lead_hour INTEGER NOT NULL,
    rmse REAL NOT NULL,
    bias REAL NOT NULL,
    spread REAL NOT NULL,
    created_at INTEGER NOT NULL
) STRICT;

CREATE INDEX IF NOT EXISTS idx_point_metrics_variable
    ON point_metrics(variable, created_at);
CREATE INDEX IF NOT EXISTS idx_point_metrics_run_a
    ON point_metrics(run_a_id, lead_hour);
CREATE INDEX IF NOT EXISTS idx_point_metrics_run_b
    ON point_metrics(run_b_id, lead_hour);

-- One row per stored divergence array artifact.
CREATE TABLE IF NOT EXISTS grid_snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    init_time INTEGER NOT NULL,
    variable TEXT NOT NULL,
    lead_hour INTEGER NOT NULL,
    path TEXT NOT NULL,
    bbox TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    UNIQUE (init_time, variable, lead_hour)
) STRICT;

CREATE INDEX IF NOT EXISTS idx_grid_snapshots_variable
    ON grid_snapshots(variable, lead_hour, init_time);
"#;
