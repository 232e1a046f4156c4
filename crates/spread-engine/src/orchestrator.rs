//! Ingestion of one model's initialization cycle.
//!
//! A run row is written as `pending` before the connector is called, so a
//! crashed or failed ingest always leaves a trace. Raw point values are
//! best-effort: a single failed extraction is skipped, not fatal.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use spread_analysis::extract_point;
use spread_core::config::IngestionConfig;
use spread_core::errors::{EngineError, EngineResult, SpreadErrorCode};
use spread_core::tracing_setup::events;
use spread_core::types::{latest_cycle, ModelId, RunStatus};
use spread_storage::connection::writer::with_immediate_transaction;
use spread_storage::queries::point_values::{self, NewPointValue};
use spread_storage::queries::runs;
use spread_storage::DatabaseManager;

use crate::blocking::run_blocking;
use crate::clock::{Clock, SystemClock};
use crate::connectors::{ConnectorRegistry, FetchRequest};
use crate::permit::IngestionPermit;

#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// A run for this model and cycle already existed; nothing was fetched.
    Skipped { run_id: String, status: RunStatus },
    Completed {
        run_id: String,
        lead_hours: Vec<u32>,
        raw_values: usize,
    },
    /// The run row was marked `error` with this message.
    Failed { run_id: String, error: String },
}

impl IngestOutcome {
    pub fn run_id(&self) -> &str {
        match self {
            Self::Skipped { run_id, .. }
            | Self::Completed { run_id, .. }
            | Self::Failed { run_id, .. } => run_id,
        }
    }
}

enum Prepared {
    Existing { run_id: String, status: RunStatus },
    Pending(String),
}

pub struct IngestionOrchestrator {
    db: Arc<DatabaseManager>,
    registry: ConnectorRegistry,
    permit: IngestionPermit,
    ingestion: IngestionConfig,
    clock: Arc<dyn Clock>,
}

impl IngestionOrchestrator {
    pub fn new(
        db: Arc<DatabaseManager>,
        registry: ConnectorRegistry,
        permit: IngestionPermit,
        ingestion: IngestionConfig,
    ) -> Self {
        Self {
            db,
            registry,
            permit,
            ingestion,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The requested cycle, or the latest published cycle for the model.
    pub fn resolve_init_time(&self, model: ModelId, init_time: Option<DateTime<Utc>>) -> DateTime<Utc> {
        init_time.unwrap_or_else(|| latest_cycle(self.clock.now(), model.cycle_policy()))
    }

    /// Ingest one model cycle. Unregistered models fail before anything is
    /// written.
    pub async fn ingest(
        &self,
        model: ModelId,
        init_time: Option<DateTime<Utc>>,
        force: bool,
    ) -> EngineResult<IngestOutcome> {
        let fetcher = self.registry.get(model)?;
        let init_time = self.resolve_init_time(model, init_time);
        let init_label = init_time.to_rfc3339();

        let _permit = self.permit.acquire().await?;
        events::run_started(model.as_str(), &init_label, force);

        let created_at = self.clock.now();
        let db = Arc::clone(&self.db);
        let prepared = run_blocking(move || {
            db.with_writer(|conn| {
                with_immediate_transaction(conn, |tx| {
                    match runs::get_by_model_init(tx, model, init_time)? {
                        Some(existing) if !force => {
                            return Ok(Prepared::Existing {
                                run_id: existing.id,
                                status: existing.status,
                            });
                        }
                        Some(existing) => runs::delete_with_dependents(tx, &existing.id)?,
                        None => {}
                    }
                    Ok(Prepared::Pending(runs::insert_pending(
                        tx, model, init_time, created_at,
                    )?))
                })
            })
            .map_err(EngineError::from)
        })
        .await?;

        let run_id = match prepared {
            Prepared::Existing { run_id, status } => {
                events::run_skipped(model.as_str(), &init_label, status.as_str());
                return Ok(IngestOutcome::Skipped { run_id, status });
            }
            Prepared::Pending(run_id) => run_id,
        };

        let request = FetchRequest::new(
            fetcher,
            init_time,
            self.ingestion.variables.clone(),
            self.ingestion.lead_hours.clone(),
        );
        match self.fetch_and_store(request, &run_id).await {
            Ok((lead_hours, raw_values)) => {
                events::run_completed(model.as_str(), &init_label, lead_hours.len(), raw_values);
                Ok(IngestOutcome::Completed {
                    run_id,
                    lead_hours,
                    raw_values,
                })
            }
            Err(e) => {
                let message = e.to_string();
                events::run_failed(model.as_str(), &init_label, e.error_code(), &message);
                let db = Arc::clone(&self.db);
                let id = run_id.clone();
                let msg = message.clone();
                run_blocking(move || {
                    db.with_writer(|conn| runs::mark_error(conn, &id, &msg))
                        .map_err(EngineError::from)
                })
                .await?;
                Ok(IngestOutcome::Failed {
                    run_id,
                    error: message,
                })
            }
        }
    }

    async fn fetch_and_store(
        &self,
        request: FetchRequest,
        run_id: &str,
    ) -> EngineResult<(Vec<u32>, usize)> {
        let variables = self.ingestion.variables.clone();
        let points = self.ingestion.monitor_points.clone();
        let by_hour = run_blocking(move || Ok(request.run()?)).await?;

        let db = Arc::clone(&self.db);
        let run_id = run_id.to_string();
        run_blocking(move || {
            let lead_hours: Vec<u32> = by_hour.keys().copied().collect();

            let mut values = Vec::new();
            for (lead_hour, fields) in &by_hour {
                for variable in &variables {
                    for point in &points {
                        match extract_point(fields, *variable, point.lat, point.lon) {
                            Ok(value) if !value.is_nan() => values.push(NewPointValue {
                                variable: *variable,
                                lat: point.lat,
                                lon: point.lon,
                                lead_hour: *lead_hour,
                                value,
                            }),
                            Ok(_) => {}
                            Err(e) => tracing::debug!(
                                lead_hour = *lead_hour,
                                variable = %variable,
                                point = %point.name,
                                error = %e,
                                "raw value extraction skipped"
                            ),
                        }
                    }
                }
            }
            drop(by_hour);

            let written = db.with_writer(|conn| {
                with_immediate_transaction(conn, |tx| {
                    runs::set_forecast_hours(tx, &run_id, &lead_hours)?;
                    let written = point_values::insert_batch(tx, &run_id, &values)?;
                    runs::mark_complete(tx, &run_id)?;
                    Ok(written)
                })
            })?;
            Ok((lead_hours, written))
        })
        .await
    }
}
