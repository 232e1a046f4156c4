//! SpreadRuntime: owns storage, the snapshot store, the ingestion permit,
//! the notifier, and the engines built on them.
//!
//! The permit is created here and handed to both the orchestrator and the
//! scheduler, so ingestion and divergence never run concurrently within one
//! runtime.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use spread_analysis::SnapshotStore;
use spread_core::config::SpreadConfig;
use spread_core::errors::{EngineError, EngineResult};
use spread_core::traits::CancellationToken;
use spread_core::types::{GridField, ModelId, Variable};
use spread_storage::queries::snapshots;
use spread_storage::DatabaseManager;

use crate::admin::Admin;
use crate::alerts::WebhookNotifier;
use crate::blocking::run_blocking;
use crate::clock::{Clock, SystemClock};
use crate::connectors::ConnectorRegistry;
use crate::orchestrator::{IngestOutcome, IngestionOrchestrator};
use crate::permit::IngestionPermit;
use crate::scheduler::{DivergenceReport, DivergenceScheduler};

pub struct SpreadRuntime {
    config: Arc<SpreadConfig>,
    db: Arc<DatabaseManager>,
    store: SnapshotStore,
    permit: IngestionPermit,
    orchestrator: Arc<IngestionOrchestrator>,
    scheduler: Arc<DivergenceScheduler>,
    admin: Admin,
}

impl SpreadRuntime {
    /// Validate the config, open the database it names, and wire everything.
    pub fn open(config: SpreadConfig, registry: ConnectorRegistry) -> EngineResult<Self> {
        config.validate()?;
        let db = DatabaseManager::from_config(&config.storage)?;
        Self::assemble(config, Arc::new(db), registry, Arc::new(SystemClock))
    }

    /// Wire a runtime around an already-open database.
    pub fn assemble(
        config: SpreadConfig,
        db: Arc<DatabaseManager>,
        registry: ConnectorRegistry,
        clock: Arc<dyn Clock>,
    ) -> EngineResult<Self> {
        config.validate()?;
        let store = SnapshotStore::new(&config.snapshots.data_store_path);
        let permit = IngestionPermit::single();
        let notifier = WebhookNotifier::from_config(&config.alerts)?;

        let orchestrator = Arc::new(
            IngestionOrchestrator::new(
                Arc::clone(&db),
                registry.clone(),
                permit.clone(),
                config.ingestion.clone(),
            )
            .with_clock(Arc::clone(&clock)),
        );
        let scheduler = Arc::new(
            DivergenceScheduler::new(
                Arc::clone(&db),
                registry.clone(),
                permit.clone(),
                store.clone(),
                &config,
                notifier,
            )
            .with_clock(clock),
        );
        let admin = Admin::new(
            Arc::clone(&db),
            registry,
            Arc::clone(&orchestrator),
            store.clone(),
        );

        tracing::info!(
            db = ?db.path(),
            data_store = %store.root().display(),
            "spread runtime ready"
        );
        Ok(Self {
            config: Arc::new(config),
            db,
            store,
            permit,
            orchestrator,
            scheduler,
            admin,
        })
    }

    pub fn config(&self) -> &SpreadConfig {
        &self.config
    }

    pub fn db(&self) -> &Arc<DatabaseManager> {
        &self.db
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn permit(&self) -> &IngestionPermit {
        &self.permit
    }

    pub fn orchestrator(&self) -> &Arc<IngestionOrchestrator> {
        &self.orchestrator
    }

    pub fn scheduler(&self) -> &Arc<DivergenceScheduler> {
        &self.scheduler
    }

    pub fn admin(&self) -> &Admin {
        &self.admin
    }

    pub async fn ingest(
        &self,
        model: ModelId,
        init_time: Option<DateTime<Utc>>,
        force: bool,
    ) -> EngineResult<IngestOutcome> {
        self.orchestrator.ingest(model, init_time, force).await
    }

    pub async fn recompute_divergence(
        &self,
        init_time: Option<DateTime<Utc>>,
        cancel: &CancellationToken,
    ) -> EngineResult<DivergenceReport> {
        self.scheduler
            .recompute_cycle_divergence(init_time, cancel)
            .await
    }

    /// Newest stored divergence grid for a variable and lead hour.
    pub async fn latest_divergence_grid(
        &self,
        variable: Variable,
        lead_hour: u32,
        init_time: Option<DateTime<Utc>>,
    ) -> EngineResult<Option<GridField>> {
        let db = Arc::clone(&self.db);
        let row = run_blocking(move || {
            db.with_reader(|conn| snapshots::latest(conn, variable, lead_hour, init_time))
                .map_err(EngineError::from)
        })
        .await?;
        match row {
            Some(row) => Ok(Some(self.store.load(&row.path)?)),
            None => Ok(None),
        }
    }
}
