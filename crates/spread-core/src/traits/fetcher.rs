//! Connector seam: one implementation per NWP provider.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::errors::ConnectorError;
use crate::types::{FieldSet, ModelId, Variable};

/// Fetches one model's forecast fields for one initialization cycle.
///
/// Implementations are blocking; callers run them on a blocking thread pool.
pub trait ModelFetcher: Send + Sync {
    /// The model this connector serves.
    fn model(&self) -> ModelId;

    /// Fetch the requested variables and lead hours (`None` means the
    /// connector's defaults). Returns only the lead hours actually obtained.
    fn fetch(
        &self,
        init_time: DateTime<Utc>,
        variables: Option<&[Variable]>,
        lead_hours: Option<&[u32]>,
    ) -> Result<BTreeMap<u32, FieldSet>, ConnectorError>;
}
