//! Shared fixtures: synthetic connectors and an in-memory runtime.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use spread_core::config::SpreadConfig;
use spread_core::errors::ConnectorError;
use spread_core::traits::ModelFetcher;
use spread_core::types::{Field, FieldSet, ModelId, Variable};
use spread_engine::{ConnectorRegistry, FixedClock, SpreadRuntime};
use spread_storage::DatabaseManager;
use tempfile::TempDir;

pub fn cycle() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
}

/// Regular 1° grid over the continental US with a constant value.
pub fn conus_field(value: f64) -> Field {
    let latitude: Vec<f64> = (0..=25).map(|i| 25.0 + f64::from(i)).collect();
    let longitude: Vec<f64> = (0..=60).map(|j| -125.0 + f64::from(j)).collect();
    let values = vec![value; latitude.len() * longitude.len()];
    Field::on_axes(latitude, longitude, values).unwrap()
}

/// Counts fetches running at the same time across several connectors.
#[derive(Default)]
pub struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlight {
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Connector returning constant fields for the hours it is told to serve.
pub struct FakeFetcher {
    model: ModelId,
    value: f64,
    serve: Mutex<Vec<u32>>,
    fail: Mutex<bool>,
    calls: AtomicUsize,
    slow: Option<(Arc<InFlight>, Duration)>,
}

impl FakeFetcher {
    pub fn new(model: ModelId, value: f64, hours: &[u32]) -> Arc<Self> {
        Arc::new(Self {
            model,
            value,
            serve: Mutex::new(hours.to_vec()),
            fail: Mutex::new(false),
            calls: AtomicUsize::new(0),
            slow: None,
        })
    }

    /// A connector that takes `delay` per fetch and reports to `gauge`
    /// while it is running.
    pub fn slow(
        model: ModelId,
        value: f64,
        hours: &[u32],
        gauge: &Arc<InFlight>,
        delay: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            model,
            value,
            serve: Mutex::new(hours.to_vec()),
            fail: Mutex::new(false),
            calls: AtomicUsize::new(0),
            slow: Some((Arc::clone(gauge), delay)),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn serve(&self, hours: &[u32]) {
        *self.serve.lock().unwrap() = hours.to_vec();
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }
}

impl ModelFetcher for FakeFetcher {
    fn model(&self) -> ModelId {
        self.model
    }

    fn fetch(
        &self,
        _init_time: DateTime<Utc>,
        variables: Option<&[Variable]>,
        lead_hours: Option<&[u32]>,
    ) -> Result<BTreeMap<u32, FieldSet>, ConnectorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some((gauge, delay)) = &self.slow {
            gauge.enter();
            std::thread::sleep(*delay);
            let out = self.fields(variables, lead_hours);
            gauge.leave();
            return out;
        }
        self.fields(variables, lead_hours)
    }
}

impl FakeFetcher {
    fn fields(
        &self,
        variables: Option<&[Variable]>,
        lead_hours: Option<&[u32]>,
    ) -> Result<BTreeMap<u32, FieldSet>, ConnectorError> {
        if *self.fail.lock().unwrap() {
            return Err(ConnectorError::FetchFailed {
                model: self.model.to_string(),
                message: "upstream unavailable".to_string(),
            });
        }
        let variables = variables.map(<[Variable]>::to_vec).unwrap_or_else(|| Variable::ALL.to_vec());
        let serve = self.serve.lock().unwrap().clone();
        let mut out = BTreeMap::new();
        for hour in serve {
            if lead_hours.is_some_and(|wanted| !wanted.contains(&hour)) {
                continue;
            }
            let mut set = FieldSet::new();
            for variable in &variables {
                set.insert(*variable, conus_field(self.value));
            }
            out.insert(hour, set);
        }
        Ok(out)
    }
}

pub struct Harness {
    pub runtime: SpreadRuntime,
    pub data_dir: TempDir,
}

pub fn test_config(data_dir: &TempDir) -> SpreadConfig {
    let mut config = SpreadConfig::default();
    config.snapshots.data_store_path = data_dir.path().display().to_string();
    config.divergence.grid_resolution = 1.0;
    config
}

pub fn harness(fetchers: &[Arc<FakeFetcher>]) -> Harness {
    let data_dir = TempDir::new().unwrap();
    harness_with(fetchers, test_config(&data_dir), data_dir)
}

pub fn harness_with(fetchers: &[Arc<FakeFetcher>], config: SpreadConfig, data_dir: TempDir) -> Harness {
    let mut registry = ConnectorRegistry::new();
    for fetcher in fetchers {
        registry.register(Arc::clone(fetcher) as Arc<dyn ModelFetcher>);
    }
    let db = Arc::new(DatabaseManager::open_in_memory().unwrap());
    let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2025, 1, 15, 20, 30, 0).unwrap()));
    let runtime = SpreadRuntime::assemble(config, db, registry, clock).unwrap();
    Harness { runtime, data_dir }
}

/// Number of tracked variables times monitoring points in the default config.
pub fn cells_per_hour() -> usize {
    let config = SpreadConfig::default();
    config.ingestion.variables.len() * config.ingestion.monitor_points.len()
}
