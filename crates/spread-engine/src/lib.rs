//! spread-engine: the async control plane of the divergence engine.
//!
//! - `orchestrator`: per-model ingestion of one initialization cycle
//! - `scheduler`: cross-model divergence recomputation per lead hour
//! - `alerts`: rule evaluation and webhook notification
//! - `admin`: trigger, status, and clear operations
//! - `runtime`: `SpreadRuntime`, owner of storage, permit, and engines

pub mod admin;
pub mod alerts;
pub mod clock;
pub mod connectors;
pub mod orchestrator;
pub mod permit;
pub mod runtime;
pub mod scheduler;

mod blocking;

pub use admin::{Admin, ClearReport, StatusReport, TriggerHandle, TriggerReceipt};
pub use alerts::{check_alerts, Observation, WebhookNotifier};
pub use clock::{Clock, FixedClock, SystemClock};
pub use connectors::ConnectorRegistry;
pub use orchestrator::{IngestOutcome, IngestionOrchestrator};
pub use permit::IngestionPermit;
pub use runtime::SpreadRuntime;
pub use scheduler::{divergence_hours, DivergenceReport, DivergenceScheduler};
