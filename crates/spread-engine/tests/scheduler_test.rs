//! Cycle divergence recomputation end to end.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::{
    cells_per_hour, cycle, harness, harness_with, test_config, FakeFetcher, Harness, InFlight,
};
use spread_core::traits::{Cancellable, CancellationToken};
use spread_core::types::{AlertMetric, ModelId, Variable};
use spread_engine::DivergenceReport;
use spread_storage::queries::alerts::{self, NewAlertRule};
use spread_storage::queries::{metrics, point_values, runs, snapshots};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// GFS covers {0, 6, 12}, NAM {0, 6}, HRRR {12, 18}.
async fn ingest_three(h: &Harness) {
    for model in [ModelId::Gfs, ModelId::Nam, ModelId::Hrrr] {
        h.runtime.ingest(model, Some(cycle()), false).await.unwrap();
    }
}

fn three_models() -> Vec<Arc<FakeFetcher>> {
    vec![
        FakeFetcher::new(ModelId::Gfs, 10.0, &[0, 6, 12]),
        FakeFetcher::new(ModelId::Nam, 12.0, &[0, 6]),
        FakeFetcher::new(ModelId::Hrrr, 8.0, &[12, 18]),
    ]
}

fn counts(h: &Harness) -> (i64, i64) {
    h.runtime
        .db()
        .with_reader(|conn| Ok((metrics::count(conn)?, snapshots::count(conn)?)))
        .unwrap()
}

#[tokio::test]
async fn recompute_processes_shared_hours() {
    let h = harness(&three_models());
    ingest_three(&h).await;

    let report = h
        .runtime
        .recompute_divergence(None, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.init_time, Some(cycle()));
    assert_eq!(report.hours_processed, vec![0, 6, 12]);
    assert!(report.hours_skipped.is_empty());
    assert!(!report.cancelled);

    // One pair per hour at every point and variable.
    assert_eq!(report.metrics_written, 3 * cells_per_hour());
    assert_eq!(report.snapshots_written, 3 * Variable::ALL.len());
    assert_eq!(
        counts(&h),
        (report.metrics_written as i64, report.snapshots_written as i64)
    );
    assert_eq!(
        h.runtime.snapshots().count_artifacts().unwrap(),
        report.snapshots_written
    );

    let rows = h
        .runtime
        .db()
        .with_reader(|conn| metrics::query_for_init_hour(conn, cycle(), 0))
        .unwrap();
    let row = &rows[0];
    assert_eq!(row.rmse, 2.0);
    assert_eq!(row.bias, -2.0);
    assert!((row.spread - 2.0_f64.sqrt()).abs() < 1e-12);
}

#[tokio::test]
async fn recompute_is_scoped_and_repeatable() {
    let h = harness(&three_models());
    ingest_three(&h).await;

    let token = CancellationToken::new();
    let first = h.runtime.recompute_divergence(Some(cycle()), &token).await.unwrap();
    let before = counts(&h);
    let second = h.runtime.recompute_divergence(Some(cycle()), &token).await.unwrap();

    assert_eq!(first.metrics_written, second.metrics_written);
    assert_eq!(counts(&h), before);
    assert_eq!(
        h.runtime.snapshots().count_artifacts().unwrap(),
        second.snapshots_written
    );
}

#[tokio::test]
async fn hour_with_one_fetched_model_is_skipped() {
    let fetchers = three_models();
    let h = harness(&fetchers);
    ingest_three(&h).await;

    // NAM now only serves hour 0, so hour 6 has GFS alone.
    fetchers[1].serve(&[0]);
    let report = h
        .runtime
        .recompute_divergence(None, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.hours_processed, vec![0, 12]);
    assert_eq!(report.hours_skipped, vec![6]);

    let hour_six = h
        .runtime
        .db()
        .with_reader(|conn| metrics::query_for_init_hour(conn, cycle(), 6))
        .unwrap();
    assert!(hour_six.is_empty());
}

#[tokio::test]
async fn cancelled_before_first_hour_processes_nothing() {
    let h = harness(&three_models());
    ingest_three(&h).await;

    let token = CancellationToken::new();
    token.cancel();
    let report = h.runtime.recompute_divergence(None, &token).await.unwrap();
    assert!(report.cancelled);
    assert!(report.hours_processed.is_empty());
    assert_eq!(counts(&h), (0, 0));
}

#[tokio::test]
async fn no_complete_cycle_yields_empty_report() {
    let h = harness(&three_models());
    h.runtime.ingest(ModelId::Gfs, Some(cycle()), false).await.unwrap();

    let report = h
        .runtime
        .recompute_divergence(None, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report, DivergenceReport::default());
}

#[tokio::test]
async fn breaching_spread_fires_alerts() {
    let fetchers = vec![
        FakeFetcher::new(ModelId::Gfs, 10.0, &[0, 6]),
        FakeFetcher::new(ModelId::Nam, 12.0, &[0, 6]),
    ];
    let h = harness(&fetchers);
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

    let report = h
        .runtime
        .recompute_divergence(None, &CancellationToken::new())
        .await
        .unwrap();
    let points = h.runtime.config().ingestion.monitor_points.len();
    assert_eq!(report.alerts_fired, 2 * points);

    let events = h
        .runtime
        .db()
        .with_reader(|conn| alerts::list_events(conn, false, 100))
        .unwrap();
    assert_eq!(events.len(), 2 * points);
    assert!(events.iter().all(|e| e.variable == Variable::Precip));
    assert!(events.iter().all(|e| e.location_label.is_some()));
}

#[tokio::test]
async fn disabled_alerts_are_not_evaluated() {
    let fetchers = vec![
        FakeFetcher::new(ModelId::Gfs, 10.0, &[0]),
        FakeFetcher::new(ModelId::Nam, 12.0, &[0]),
    ];
    let data_dir = TempDir::new().unwrap();
    let mut config = test_config(&data_dir);
    config.alerts.enabled = false;
    let h = harness_with(&fetchers, config, data_dir);
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

    let report = h
        .runtime
        .recompute_divergence(None, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.alerts_fired, 0);
    assert!(report.metrics_written > 0);
}

#[tokio::test]
async fn stored_grid_can_be_loaded_back() {
    let h = harness(&three_models());
    ingest_three(&h).await;
    h.runtime
        .recompute_divergence(None, &CancellationToken::new())
        .await
        .unwrap();

    let grid = h
        .runtime
        .latest_divergence_grid(Variable::Mslp, 12, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(grid.name, "mslp_divergence");
    // GFS 10 vs HRRR 8 everywhere.
    assert!(grid.values.iter().all(|v| (v - 2.0_f64.sqrt()).abs() < 1e-12));

    let missing = h
        .runtime
        .latest_divergence_grid(Variable::Mslp, 18, None)
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn models_are_fetched_one_at_a_time() {
    let gauge = Arc::new(InFlight::default());
    let delay = Duration::from_millis(150);
    let h = harness(&[
        FakeFetcher::slow(ModelId::Gfs, 10.0, &[0, 6], &gauge, delay),
        FakeFetcher::slow(ModelId::Nam, 12.0, &[0, 6], &gauge, delay),
        FakeFetcher::slow(ModelId::Ecmwf, 11.0, &[0, 6], &gauge, delay),
    ]);
    for model in [ModelId::Gfs, ModelId::Nam, ModelId::Ecmwf] {
        h.runtime.ingest(model, Some(cycle()), false).await.unwrap();
    }

    let report = h
        .runtime
        .recompute_divergence(Some(cycle()), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.hours_processed, vec![0, 6]);
    assert_eq!(gauge.peak(), 1);
}

fn raw_value_counts(h: &Harness) -> Vec<(String, i64)> {
    let mut counts: Vec<(String, i64)> = h
        .runtime
        .db()
        .with_reader(|conn| {
            runs::query_recent(conn, None, Some(cycle()), 10)?
                .into_iter()
                .map(|run| {
                    let n = point_values::count_for_run(conn, &run.id)?;
                    Ok((run.id, n))
                })
                .collect()
        })
        .unwrap();
    counts.sort();
    counts
}

#[tokio::test]
async fn recompute_leaves_raw_values_untouched() {
    let h = harness(&three_models());
    ingest_three(&h).await;
    let before = raw_value_counts(&h);
    assert_eq!(before.len(), 3);
    assert!(before.iter().all(|(_, n)| *n > 0));

    let token = CancellationToken::new();
    h.runtime.recompute_divergence(Some(cycle()), &token).await.unwrap();
    h.runtime.recompute_divergence(Some(cycle()), &token).await.unwrap();
    assert_eq!(raw_value_counts(&h), before);
}

#[tokio::test]
async fn hours_outside_the_recompute_are_kept() {
    let h = harness(&three_models());
    ingest_three(&h).await;
    let token = CancellationToken::new();
    let first = h.runtime.recompute_divergence(Some(cycle()), &token).await.unwrap();
    assert_eq!(first.hours_processed, vec![0, 6, 12]);

    // Without HRRR only GFS covers hour 12, so it drops out of the next pass.
    h.runtime
        .db()
        .with_writer(|conn| {
            let hrrr = runs::get_by_model_init(conn, ModelId::Hrrr, cycle())?
                .ok_or_else(|| spread_storage::to_storage_err("hrrr run missing"))?;
            runs::mark_error(conn, &hrrr.id, "withdrawn")
        })
        .unwrap();

    let second = h.runtime.recompute_divergence(Some(cycle()), &token).await.unwrap();
    assert_eq!(second.hours_processed, vec![0, 6]);

    let (hour12_metrics, hour12_snapshot) = h
        .runtime
        .db()
        .with_reader(|conn| {
            Ok((
                metrics::query_for_init_hour(conn, cycle(), 12)?,
                snapshots::latest(conn, Variable::Precip, 12, Some(cycle()))?,
            ))
        })
        .unwrap();
    assert_eq!(hour12_metrics.len(), cells_per_hour());
    let snapshot = match hour12_snapshot {
        Some(row) => row,
        None => panic!("hour 12 snapshot row was removed"),
    };
    assert!(h.runtime.snapshots().load(&snapshot.path).is_ok());
    assert_eq!(
        h.runtime.snapshots().count_artifacts().unwrap(),
        3 * Variable::ALL.len()
    );
}

#[tokio::test]
async fn held_permit_blocks_ingest_and_recompute() {
    let gfs = FakeFetcher::new(ModelId::Gfs, 10.0, &[0, 6]);
    let nam = FakeFetcher::new(ModelId::Nam, 12.0, &[0, 6]);
    let h = harness(&[Arc::clone(&gfs), Arc::clone(&nam)]);
    h.runtime.ingest(ModelId::Gfs, Some(cycle()), false).await.unwrap();

    let held = h.runtime.permit().acquire().await.unwrap();
    let token = CancellationToken::new();
    let wait = Duration::from_millis(100);

    let ingest = tokio::time::timeout(wait, h.runtime.ingest(ModelId::Nam, Some(cycle()), false)).await;
    assert!(ingest.is_err());
    assert_eq!(nam.calls(), 0);

    let recompute = tokio::time::timeout(wait, h.runtime.recompute_divergence(Some(cycle()), &token)).await;
    assert!(recompute.is_err());
    assert_eq!(counts(&h), (0, 0));

    drop(held);
    h.runtime.ingest(ModelId::Nam, Some(cycle()), false).await.unwrap();
    assert_eq!(nam.calls(), 1);
    let report = h.runtime.recompute_divergence(Some(cycle()), &token).await.unwrap();
    assert_eq!(report.hours_processed, vec![0, 6]);
}

/// Local HTTP endpoint that answers 200 to every request and counts them.
async fn webhook_sink() -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/hook", listener.local_addr().unwrap());
    let received = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&received);
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let counter = Arc::clone(&counter);
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 4096];
                loop {
                    let n = socket.read(&mut chunk).await.unwrap_or(0);
                    if n == 0 {
                        return;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                    while let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                        let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
                        let body_len = head
                            .lines()
                            .find_map(|l| l.strip_prefix("content-length:"))
                            .and_then(|v| v.trim().parse::<usize>().ok())
                            .unwrap_or(0);
                        if buf.len() < end + 4 + body_len {
                            break;
                        }
                        buf.drain(..end + 4 + body_len);
                        counter.fetch_add(1, Ordering::SeqCst);
                        let reply = b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n";
                        if socket.write_all(reply).await.is_err() {
                            return;
                        }
                    }
                }
            });
        }
    });
    (url, received)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn each_breaching_observation_is_posted_once() {
    let (url, received) = webhook_sink().await;
    let data_dir = TempDir::new().unwrap();
    let mut config = test_config(&data_dir);
    config.alerts.webhook_url = Some(url);
    let h = harness_with(
        &[
            FakeFetcher::new(ModelId::Gfs, 10.0, &[0, 6]),
            FakeFetcher::new(ModelId::Nam, 12.0, &[0, 6]),
        ],
        config,
        data_dir,
    );
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

    let report = h
        .runtime
        .recompute_divergence(None, &CancellationToken::new())
        .await
        .unwrap();
    // One rule, so every breaching point in every hour is its own delivery.
    let points = h.runtime.config().ingestion.monitor_points.len();
    assert_eq!(report.alerts_fired, 2 * points);
    assert_eq!(received.load(Ordering::SeqCst), 2 * points);
}
