//! Operator surface: queue ingestion, report status, clear data.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use spread_analysis::SnapshotStore;
use spread_core::constants::RECENT_RUNS_LIMIT;
use spread_core::errors::{EngineError, EngineResult};
use spread_storage::connection::writer::with_immediate_transaction;
use spread_storage::queries::runs::{self, RunRow};
use spread_storage::queries::status::{self, TableCounts};
use spread_storage::queries::{metrics, snapshots};
use spread_storage::DatabaseManager;
use tokio::task::JoinHandle;

use crate::blocking::run_blocking;
use crate::connectors::ConnectorRegistry;
use crate::orchestrator::{IngestOutcome, IngestionOrchestrator};

/// Acknowledgement returned as soon as an ingestion is queued.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerReceipt {
    pub model: String,
    /// `None` means the latest published cycle.
    pub init_time: Option<DateTime<Utc>>,
    pub status: String,
    pub message: String,
}

/// A queued ingestion: the receipt plus the task running it.
#[derive(Debug)]
pub struct TriggerHandle {
    pub receipt: TriggerReceipt,
    pub task: JoinHandle<EngineResult<IngestOutcome>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub counts: TableCounts,
    /// Snapshot artifacts present on disk.
    pub artifacts: usize,
    pub recent_runs: Vec<RunRow>,
}

/// Rows and artifacts removed by a clear operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClearReport {
    pub runs: usize,
    pub metrics: usize,
    pub snapshots: usize,
    pub artifacts: usize,
}

pub struct Admin {
    db: Arc<DatabaseManager>,
    registry: ConnectorRegistry,
    orchestrator: Arc<IngestionOrchestrator>,
    store: SnapshotStore,
}

impl Admin {
    pub fn new(
        db: Arc<DatabaseManager>,
        registry: ConnectorRegistry,
        orchestrator: Arc<IngestionOrchestrator>,
        store: SnapshotStore,
    ) -> Self {
        Self {
            db,
            registry,
            orchestrator,
            store,
        }
    }

    /// Validate the model name and queue its ingestion on a spawned task.
    /// Must be called from within a tokio runtime.
    pub fn trigger(
        &self,
        model: &str,
        init_time: Option<DateTime<Utc>>,
        force: bool,
    ) -> EngineResult<TriggerHandle> {
        let model = self.registry.resolve(model)?;
        let orchestrator = Arc::clone(&self.orchestrator);
        let task = tokio::spawn(async move { orchestrator.ingest(model, init_time, force).await });
        let cycle = init_time
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "latest".to_string());
        Ok(TriggerHandle {
            receipt: TriggerReceipt {
                model: model.to_string(),
                init_time,
                status: "queued".to_string(),
                message: format!("Ingestion queued for {model} ({cycle})"),
            },
            task,
        })
    }

    pub async fn status(&self) -> EngineResult<StatusReport> {
        let db = Arc::clone(&self.db);
        let (counts, recent_runs) = run_blocking(move || {
            db.with_reader(|conn| {
                Ok((
                    status::table_counts(conn)?,
                    runs::query_recent(conn, None, None, RECENT_RUNS_LIMIT)?,
                ))
            })
            .map_err(EngineError::from)
        })
        .await?;
        let artifacts = self.store.count_artifacts()?;
        Ok(StatusReport {
            counts,
            artifacts,
            recent_runs,
        })
    }

    /// Delete every run. Raw values and metrics go with them.
    pub async fn clear_runs(&self) -> EngineResult<ClearReport> {
        let db = Arc::clone(&self.db);
        run_blocking(move || {
            db.with_writer(|conn| {
                with_immediate_transaction(conn, |tx| {
                    let metrics = metrics::count(tx)? as usize;
                    let runs = runs::delete_all(tx)?;
                    Ok(ClearReport {
                        runs,
                        metrics,
                        ..ClearReport::default()
                    })
                })
            })
            .map_err(EngineError::from)
        })
        .await
    }

    pub async fn clear_metrics(&self) -> EngineResult<ClearReport> {
        let db = Arc::clone(&self.db);
        run_blocking(move || {
            let metrics = db.with_writer(metrics::delete_all)?;
            Ok(ClearReport {
                metrics,
                ..ClearReport::default()
            })
        })
        .await
    }

    /// Delete every snapshot row and the artifact tree behind them.
    pub async fn clear_snapshots(&self) -> EngineResult<ClearReport> {
        let db = Arc::clone(&self.db);
        let snapshots = run_blocking(move || Ok(db.with_writer(snapshots::delete_all)?)).await?;
        let artifacts = self.store.clear()?;
        Ok(ClearReport {
            snapshots,
            artifacts,
            ..ClearReport::default()
        })
    }

    /// Clear snapshots, metrics and runs. Alert rules and events are kept.
    pub async fn reset(&self) -> EngineResult<ClearReport> {
        let snapshots = self.clear_snapshots().await?;
        let metrics = self.clear_metrics().await?;
        let runs = self.clear_runs().await?;
        tracing::info!(
            runs = runs.runs,
            metrics = metrics.metrics,
            snapshots = snapshots.snapshots,
            artifacts = snapshots.artifacts,
            "engine data reset"
        );
        Ok(ClearReport {
            runs: runs.runs,
            metrics: metrics.metrics,
            snapshots: snapshots.snapshots,
            artifacts: snapshots.artifacts,
        })
    }
}
