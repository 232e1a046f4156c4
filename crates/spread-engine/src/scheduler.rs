//! Cross-model divergence for one initialization cycle.
//!
//! Lead hours are processed one at a time in ascending order. Each hour's
//! fields are fetched fresh, moved into the compute step, and dropped when it
//! returns; the hour's metrics, snapshot rows and alert events are committed
//! in a single transaction. Recomputing a cycle first clears metrics and
//! snapshots for exactly the hours about to be recomputed.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use spread_analysis::point::{pairwise_from_values, point_values, spread_of};
use spread_analysis::{compute_grid_divergence, init_time_key, SnapshotStore};
use spread_core::config::{IngestionConfig, SpreadConfig};
use spread_core::errors::{EngineError, EngineResult, GridError, SpreadErrorCode};
use spread_core::traits::{Cancellable, CancellationToken};
use spread_core::tracing_setup::events;
use spread_core::types::{ModelFields, ModelId, MonitorPoint, Variable};
use spread_storage::connection::writer::with_immediate_transaction;
use spread_storage::queries::alerts::AlertEventRow;
use spread_storage::queries::metrics::{self, NewMetric};
use spread_storage::queries::runs;
use spread_storage::queries::snapshots::{self, NewSnapshot};
use spread_storage::DatabaseManager;

use crate::alerts::{check_alerts, Observation, WebhookNotifier};
use crate::blocking::run_blocking;
use crate::clock::{Clock, SystemClock};
use crate::connectors::{ConnectorRegistry, FetchRequest};
use crate::permit::IngestionPermit;

/// What one recomputation did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DivergenceReport {
    /// `None` when no cycle had two complete runs.
    pub init_time: Option<DateTime<Utc>>,
    pub hours_processed: Vec<u32>,
    /// Hours with fewer than two models after fetching.
    pub hours_skipped: Vec<u32>,
    pub metrics_written: usize,
    pub snapshots_written: usize,
    pub alerts_fired: usize,
    /// Stopped early; hours after the last processed one were not touched.
    pub cancelled: bool,
}

/// Lead hours covered by at least two models, each with its covering models
/// in name order.
pub fn divergence_hours(coverage: &BTreeMap<ModelId, Vec<u32>>) -> BTreeMap<u32, Vec<ModelId>> {
    let mut by_hour: BTreeMap<u32, Vec<ModelId>> = BTreeMap::new();
    for (model, hours) in coverage {
        for hour in hours {
            let models = by_hour.entry(*hour).or_default();
            if !models.contains(model) {
                models.push(*model);
            }
        }
    }
    by_hour.retain(|_, models| models.len() >= 2);
    by_hour
}

/// Everything the compute step needs for one lead hour. Owns the fields.
struct HourInputs {
    init_time: DateTime<Utc>,
    lead_hour: u32,
    fields: ModelFields,
    run_ids: BTreeMap<ModelId, String>,
    variables: Vec<Variable>,
    points: Vec<MonitorPoint>,
    resolution: f64,
    evaluate_alerts: bool,
}

#[derive(Default)]
struct HourOutput {
    metrics: Vec<NewMetric>,
    snapshots: Vec<NewSnapshot>,
    observations: Vec<Observation>,
}

pub struct DivergenceScheduler {
    db: Arc<DatabaseManager>,
    registry: ConnectorRegistry,
    permit: IngestionPermit,
    store: SnapshotStore,
    ingestion: IngestionConfig,
    resolution: f64,
    alerts_enabled: bool,
    notifier: WebhookNotifier,
    clock: Arc<dyn Clock>,
}

impl DivergenceScheduler {
    pub fn new(
        db: Arc<DatabaseManager>,
        registry: ConnectorRegistry,
        permit: IngestionPermit,
        store: SnapshotStore,
        config: &SpreadConfig,
        notifier: WebhookNotifier,
    ) -> Self {
        Self {
            db,
            registry,
            permit,
            store,
            ingestion: config.ingestion.clone(),
            resolution: config.divergence.grid_resolution,
            alerts_enabled: config.alerts.enabled,
            notifier,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Recompute metrics, snapshots and alerts for `init_time`, or for the
    /// most recent cycle with at least two complete runs.
    pub async fn recompute_cycle_divergence(
        &self,
        init_time: Option<DateTime<Utc>>,
        cancel: &CancellationToken,
    ) -> EngineResult<DivergenceReport> {
        let _permit = self.permit.acquire().await?;

        let db = Arc::clone(&self.db);
        let cycle = run_blocking(move || {
            db.with_reader(|conn| {
                let Some(init) = (match init_time {
                    Some(t) => Some(t),
                    None => runs::latest_init_with_complete(conn, 2)?,
                }) else {
                    return Ok(None);
                };
                Ok(Some((init, runs::complete_for_init(conn, init)?)))
            })
            .map_err(EngineError::from)
        })
        .await?;

        let Some((init_time, complete)) = cycle else {
            tracing::info!("no cycle with at least 2 complete runs, nothing to recompute");
            return Ok(DivergenceReport::default());
        };
        let init_label = init_time.to_rfc3339();
        let mut report = DivergenceReport {
            init_time: Some(init_time),
            ..DivergenceReport::default()
        };

        let run_ids: BTreeMap<ModelId, String> =
            complete.iter().map(|r| (r.model, r.id.clone())).collect();
        let coverage: BTreeMap<ModelId, Vec<u32>> = complete
            .into_iter()
            .map(|r| (r.model, r.forecast_hours))
            .collect();
        let hours = divergence_hours(&coverage);
        if hours.is_empty() {
            events::divergence_completed(&init_label, 0, 0, false);
            return Ok(report);
        }

        self.clear_hours(init_time, hours.keys().copied().collect())
            .await?;

        for (lead_hour, models) in hours {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let fields = self.fetch_hour(init_time, lead_hour, &models).await;
            if fields.len() < 2 {
                events::lead_hour_skipped(&init_label, lead_hour, fields.len());
                report.hours_skipped.push(lead_hour);
                continue;
            }
            let model_count = fields.len();

            let inputs = HourInputs {
                init_time,
                lead_hour,
                fields,
                run_ids: run_ids.clone(),
                variables: self.ingestion.variables.clone(),
                points: self.ingestion.monitor_points.clone(),
                resolution: self.resolution,
                evaluate_alerts: self.alerts_enabled,
            };
            let store = self.store.clone();
            let output = run_blocking(move || Ok(compute_hour(inputs, &store))).await?;

            let (metrics_written, snapshots_written, fired) =
                self.commit_hour(lead_hour, output).await?;

            report.metrics_written += metrics_written;
            report.snapshots_written += snapshots_written;
            let fired_count: usize = fired.iter().map(Vec::len).sum();
            report.alerts_fired += fired_count;
            report.hours_processed.push(lead_hour);
            events::lead_hour_processed(
                &init_label,
                lead_hour,
                model_count,
                metrics_written,
                snapshots_written,
            );

            if fired_count > 0 {
                events::alerts_fired(fired_count, lead_hour);
            }
            for batch in &fired {
                self.notifier.notify(batch).await;
            }
        }

        events::divergence_completed(
            &init_label,
            report.hours_processed.len(),
            report.hours_skipped.len(),
            report.cancelled,
        );
        Ok(report)
    }

    /// Delete metrics and snapshot rows for the hours being recomputed, then
    /// reclaim the artifacts those rows pointed at.
    async fn clear_hours(&self, init_time: DateTime<Utc>, hours: Vec<u32>) -> EngineResult<()> {
        let db = Arc::clone(&self.db);
        let (removed_metrics, paths) = run_blocking(move || {
            db.with_writer(|conn| {
                with_immediate_transaction(conn, |tx| {
                    let removed = metrics::delete_for_init_hours(tx, init_time, &hours)?;
                    let paths = snapshots::delete_for_init_hours(tx, init_time, &hours)?;
                    Ok((removed, paths))
                })
            })
            .map_err(EngineError::from)
        })
        .await?;

        tracing::debug!(
            init_time = %init_time,
            metrics = removed_metrics,
            snapshots = paths.len(),
            "cleared previous divergence for recomputed hours"
        );
        for path in paths {
            if let Err(e) = self.store.remove(&path) {
                tracing::warn!(path = %path, error = %e, "failed to reclaim snapshot artifact");
            }
        }
        Ok(())
    }

    /// Fetch one lead hour from each covering model, one model at a time so
    /// at most one decoded field set is in flight. Models that fail or do
    /// not return the hour are dropped.
    async fn fetch_hour(
        &self,
        init_time: DateTime<Utc>,
        lead_hour: u32,
        models: &[ModelId],
    ) -> ModelFields {
        let mut fields = ModelFields::new();
        for model in models {
            let fetcher = match self.registry.get(*model) {
                Ok(f) => f,
                Err(e) => {
                    tracing::warn!(model = %model, error = %e, "no connector, model dropped");
                    continue;
                }
            };
            let request = FetchRequest::new(
                fetcher,
                init_time,
                self.ingestion.variables.clone(),
                vec![lead_hour],
            );
            match run_blocking(move || Ok(request.run()?)).await {
                Ok(mut by_hour) => match by_hour.remove(&lead_hour) {
                    Some(set) => {
                        fields.insert(*model, set);
                    }
                    None => tracing::warn!(
                        model = %model,
                        lead_hour = lead_hour,
                        "connector did not return lead hour, model dropped"
                    ),
                },
                Err(e) => tracing::warn!(
                    model = %model,
                    lead_hour = lead_hour,
                    code = e.error_code(),
                    error = %e,
                    "fetch failed, model dropped"
                ),
            }
        }
        fields
    }

    /// Persist one hour atomically. Alerts are evaluated after the hour's
    /// metrics are inserted so sustained-breach checks see them. Fired
    /// events come back grouped per observation, one webhook delivery each.
    async fn commit_hour(
        &self,
        lead_hour: u32,
        output: HourOutput,
    ) -> EngineResult<(usize, usize, Vec<Vec<AlertEventRow>>)> {
        let db = Arc::clone(&self.db);
        let now = self.clock.now();
        let artifact_paths: Vec<String> = output.snapshots.iter().map(|s| s.path.clone()).collect();

        let committed = run_blocking(move || {
            db.with_writer(|conn| {
                with_immediate_transaction(conn, |tx| {
                    let written = metrics::insert_batch(tx, &output.metrics, now)?;
                    for snapshot in &output.snapshots {
                        snapshots::insert(tx, snapshot, now)?;
                    }
                    let mut fired = Vec::new();
                    for observation in &output.observations {
                        let batch = check_alerts(tx, observation, now)?;
                        if !batch.is_empty() {
                            fired.push(batch);
                        }
                    }
                    Ok((written, output.snapshots.len(), fired))
                })
            })
            .map_err(EngineError::from)
        })
        .await;

        if committed.is_err() {
            tracing::error!(lead_hour = lead_hour, "lead hour commit failed, reclaiming artifacts");
            for path in &artifact_paths {
                if let Err(e) = self.store.remove(path) {
                    tracing::warn!(path = %path, error = %e, "failed to reclaim snapshot artifact");
                }
            }
        }
        committed
    }
}

/// Point metrics, grid divergence and alert observations for one lead hour.
/// Consumes the hour's fields.
fn compute_hour(inputs: HourInputs, store: &SnapshotStore) -> HourOutput {
    let HourInputs {
        init_time,
        lead_hour,
        fields,
        run_ids,
        variables,
        points,
        resolution,
        evaluate_alerts,
    } = inputs;
    let key = init_time_key(init_time);
    let mut output = HourOutput::default();

    for variable in variables {
        for point in &points {
            let values = match point_values(&fields, variable, point.lat, point.lon) {
                Ok(values) => values,
                Err(e) => {
                    tracing::debug!(
                        variable = %variable,
                        point = %point.name,
                        error = %e,
                        "point skipped"
                    );
                    continue;
                }
            };
            let spread = spread_of(values.values().copied());
            let pairs: Vec<_> = pairwise_from_values(&values)
                .into_iter()
                .filter(|p| p.rmse.is_finite() && p.bias.is_finite() && spread.is_finite())
                .collect();

            for pair in &pairs {
                let (Some(run_a), Some(run_b)) = (run_ids.get(&pair.model_a), run_ids.get(&pair.model_b))
                else {
                    continue;
                };
                output.metrics.push(NewMetric {
                    run_a_id: run_a.clone(),
                    run_b_id: run_b.clone(),
                    variable,
                    lat: point.lat,
                    lon: point.lon,
                    lead_hour,
                    rmse: pair.rmse,
                    bias: pair.bias,
                    spread,
                });
            }

            if evaluate_alerts {
                if let Some(last) = pairs.last() {
                    let rmse = pairs.iter().map(|p| p.rmse).fold(f64::MIN, f64::max);
                    output.observations.push(Observation {
                        variable,
                        lat: point.lat,
                        lon: point.lon,
                        lead_hour,
                        spread,
                        rmse,
                        bias: last.bias,
                        location_label: Some(point.name.clone()),
                    });
                }
            }
        }

        match compute_grid_divergence(&fields, variable, resolution) {
            Ok(grid) => {
                let Some(bbox) = grid.bbox() else {
                    continue;
                };
                match store.save(&grid, &key, variable, lead_hour) {
                    Ok(path) => output.snapshots.push(NewSnapshot {
                        init_time,
                        variable,
                        lead_hour,
                        path: path.display().to_string(),
                        bbox,
                    }),
                    Err(e) => tracing::warn!(
                        variable = %variable,
                        lead_hour = lead_hour,
                        code = e.error_code(),
                        error = %e,
                        "snapshot save failed"
                    ),
                }
            }
            Err(e @ GridError::InsufficientModels { .. }) => {
                tracing::debug!(variable = %variable, lead_hour = lead_hour, error = %e, "grid divergence skipped");
            }
            Err(e) => {
                tracing::warn!(variable = %variable, lead_hour = lead_hour, error = %e, "grid divergence failed");
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hours_need_two_models() {
        let coverage = BTreeMap::from([
            (ModelId::Ecmwf, vec![0, 6, 12]),
            (ModelId::Gfs, vec![0, 6]),
            (ModelId::Nam, vec![12, 18]),
        ]);
        let hours = divergence_hours(&coverage);
        assert_eq!(hours.keys().copied().collect::<Vec<_>>(), vec![0, 6, 12]);
        assert_eq!(hours[&12], vec![ModelId::Ecmwf, ModelId::Nam]);
    }

    #[test]
    fn no_overlap_means_no_hours() {
        let coverage = BTreeMap::from([(ModelId::Gfs, vec![0, 6]), (ModelId::Nam, vec![12])]);
        assert!(divergence_hours(&coverage).is_empty());
    }
}
