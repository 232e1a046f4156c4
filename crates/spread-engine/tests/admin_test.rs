//! Operator surface: triggers, status, clears.

mod common;

use common::{cycle, harness, FakeFetcher, Harness};
use spread_core::errors::{ConnectorError, EngineError};
use spread_core::traits::CancellationToken;
use spread_core::types::{AlertMetric, ModelId, RunStatus, Variable};
use spread_engine::{ClearReport, IngestOutcome};
use spread_storage::queries::alerts::{self, NewAlertRule};
use spread_storage::queries::point_values;

async fn populated() -> Harness {
    let h = harness(&[
        FakeFetcher::new(ModelId::Gfs, 10.0, &[0, 6]),
        FakeFetcher::new(ModelId::Nam, 12.0, &[0, 6]),
    ]);
    h.runtime
        .db()
        .with_writer(|conn| {
            alerts::insert_rule(
                conn,
                &NewAlertRule::new(Variable::Precip, AlertMetric::Spread, 1.0),
                cycle(),
            )
        })
        .unwrap();
    for model in [ModelId::Gfs, ModelId::Nam] {
        h.runtime.ingest(model, Some(cycle()), false).await.unwrap();
    }
    h.runtime
        .recompute_divergence(None, &CancellationToken::new())
        .await
        .unwrap();
    h
}

#[tokio::test]
async fn trigger_queues_ingestion() {
    let h = harness(&[FakeFetcher::new(ModelId::Gfs, 10.0, &[0])]);

    let handle = h.runtime.admin().trigger("gfs", Some(cycle()), false).unwrap();
    assert_eq!(handle.receipt.model, "gfs");
    assert_eq!(handle.receipt.status, "queued");
    assert_eq!(handle.receipt.init_time, Some(cycle()));
    assert!(handle.receipt.message.contains("gfs"));

    let outcome = handle.task.await.unwrap().unwrap();
    assert!(matches!(outcome, IngestOutcome::Completed { .. }));

    let status = h.runtime.admin().status().await.unwrap();
    assert_eq!(status.recent_runs.len(), 1);
    assert_eq!(status.recent_runs[0].status, RunStatus::Complete);
}

#[tokio::test]
async fn trigger_without_cycle_reports_latest() {
    let h = harness(&[FakeFetcher::new(ModelId::Gfs, 10.0, &[0])]);
    let handle = h.runtime.admin().trigger("gfs", None, false).unwrap();
    assert!(handle.receipt.init_time.is_none());
    assert!(handle.receipt.message.contains("latest"));
    handle.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn trigger_rejects_unknown_and_unregistered_models() {
    let h = harness(&[FakeFetcher::new(ModelId::Gfs, 10.0, &[0])]);

    let unknown = h.runtime.admin().trigger("icon", None, false).unwrap_err();
    assert!(matches!(
        unknown,
        EngineError::Connector(ConnectorError::UnknownModel { .. })
    ));

    let unregistered = h.runtime.admin().trigger("nam", None, false).unwrap_err();
    assert!(matches!(
        unregistered,
        EngineError::Connector(ConnectorError::NotRegistered { .. })
    ));
}

#[tokio::test]
async fn status_counts_rows_and_artifacts() {
    let h = populated().await;
    let status = h.runtime.admin().status().await.unwrap();

    assert_eq!(status.counts.runs, 2);
    assert!(status.counts.metrics > 0);
    assert_eq!(status.counts.snapshots, 2 * Variable::ALL.len() as i64);
    assert_eq!(status.artifacts as i64, status.counts.snapshots);
    assert_eq!(status.recent_runs.len(), 2);
}

#[tokio::test]
async fn clear_snapshots_removes_rows_and_artifacts() {
    let h = populated().await;
    let before = h.runtime.admin().status().await.unwrap();

    let cleared = h.runtime.admin().clear_snapshots().await.unwrap();
    assert_eq!(cleared.snapshots as i64, before.counts.snapshots);
    assert_eq!(cleared.artifacts, before.artifacts);

    let after = h.runtime.admin().status().await.unwrap();
    assert_eq!(after.counts.snapshots, 0);
    assert_eq!(after.artifacts, 0);
    assert_eq!(after.counts.metrics, before.counts.metrics);
    assert!(h
        .runtime
        .latest_divergence_grid(Variable::Precip, 0, None)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn clear_runs_cascades_to_dependents() {
    let h = populated().await;
    let before = h.runtime.admin().status().await.unwrap();

    let cleared = h.runtime.admin().clear_runs().await.unwrap();
    assert_eq!(cleared.runs, 2);
    assert_eq!(cleared.metrics as i64, before.counts.metrics);

    let (metrics, raw) = h
        .runtime
        .db()
        .with_reader(|conn| {
            Ok((
                spread_storage::queries::metrics::count(conn)?,
                point_values::count(conn)?,
            ))
        })
        .unwrap();
    assert_eq!((metrics, raw), (0, 0));
}

#[tokio::test]
async fn reset_keeps_alert_history() {
    let h = populated().await;
    let before = h.runtime.admin().status().await.unwrap();
    let events_before = h
        .runtime
        .db()
        .with_reader(alerts::count_events)
        .unwrap();
    assert!(events_before > 0);

    let report = h.runtime.admin().reset().await.unwrap();
    assert_eq!(
        report,
        ClearReport {
            runs: 2,
            metrics: before.counts.metrics as usize,
            snapshots: before.counts.snapshots as usize,
            artifacts: before.artifacts,
        }
    );

    let after = h.runtime.admin().status().await.unwrap();
    assert_eq!(after.counts.runs, 0);
    assert_eq!(after.counts.metrics, 0);
    assert_eq!(after.counts.snapshots, 0);
    assert_eq!(after.artifacts, 0);

    let (rules, events) = h
        .runtime
        .db()
        .with_reader(|conn| Ok((alerts::list_rules(conn)?.len(), alerts::count_events(conn)?)))
        .unwrap();
    assert_eq!(rules, 1);
    assert_eq!(events, events_before);
}
