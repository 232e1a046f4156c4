//! V002: Alert rules and alert events.

pub const MIGRATION_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS alert_rules (
    id TEXT PRIMARY KEY,
    variable TEXT NOT NULL,
    lat REAL,
    lon REAL,
    location_label TEXT,
    metric TEXT NOT NULL,
    comparison TEXT NOT NULL DEFAULT 'gt',
    threshold REAL NOT NULL,
    consecutive_hours INTEGER NOT NULL DEFAULT 1 CHECK (consecutive_hours >= 1),
    enabled INTEGER NOT NULL DEFAULT 1,
    created_at INTEGER NOT NULL
) STRICT;

CREATE INDEX IF NOT EXISTS idx_alert_rules_variable
    ON alert_rules(variable) WHERE enabled = 1;

-- Events outlive their rule: deleting a rule only detaches its events.
CREATE TABLE IF NOT EXISTS alert_events (
    id TEXT PRIMARY KEY,
    rule_id TEXT REFERENCES alert_rules(id) ON DELETE SET NULL,
    triggered_at INTEGER NOT NULL,
    value REAL NOT NULL,
    variable TEXT NOT NULL,
    lat REAL NOT NULL,
    lon REAL NOT NULL,
    location_label TEXT,
    lead_hour INTEGER NOT NULL,
    resolved INTEGER NOT NULL DEFAULT 0,
    resolved_at INTEGER
) STRICT;

CREATE INDEX IF NOT EXISTS idx_alert_events_triggered
    ON alert_events(triggered_at);
CREATE INDEX IF NOT EXISTS idx_alert_events_unresolved
    ON alert_events(triggered_at) WHERE resolved = 0;
"#;
