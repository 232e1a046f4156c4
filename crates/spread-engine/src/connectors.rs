//! Registry of model connectors keyed by `ModelId`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use spread_core::errors::ConnectorError;
use spread_core::traits::ModelFetcher;
use spread_core::types::{FieldSet, ModelId, Variable};

#[derive(Clone, Default)]
pub struct ConnectorRegistry {
    fetchers: BTreeMap<ModelId, Arc<dyn ModelFetcher>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connector under the model it reports. Returns the
    /// connector it replaced, if any.
    pub fn register(&mut self, fetcher: Arc<dyn ModelFetcher>) -> Option<Arc<dyn ModelFetcher>> {
        self.fetchers.insert(fetcher.model(), fetcher)
    }

    /// Builder-style `register`.
    pub fn with(mut self, fetcher: Arc<dyn ModelFetcher>) -> Self {
        self.register(fetcher);
        self
    }

    pub fn get(&self, model: ModelId) -> Result<Arc<dyn ModelFetcher>, ConnectorError> {
        self.fetchers
            .get(&model)
            .cloned()
            .ok_or_else(|| ConnectorError::NotRegistered {
                model: model.to_string(),
            })
    }

    /// Parse a model name and check that a connector serves it.
    pub fn resolve(&self, name: &str) -> Result<ModelId, ConnectorError> {
        let model: ModelId = name.parse().map_err(|_| ConnectorError::UnknownModel {
            name: name.to_string(),
        })?;
        self.get(model)?;
        Ok(model)
    }

    /// Registered models in name order.
    pub fn models(&self) -> Vec<ModelId> {
        self.fetchers.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.fetchers.is_empty()
    }
}

impl fmt::Debug for ConnectorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorRegistry")
            .field("models", &self.models())
            .finish()
    }
}

/// An owned connector call that can move onto the blocking pool.
pub(crate) struct FetchRequest {
    fetcher: Arc<dyn ModelFetcher>,
    init_time: DateTime<Utc>,
    variables: Vec<Variable>,
    lead_hours: Vec<u32>,
}

impl FetchRequest {
    pub(crate) fn new(
        fetcher: Arc<dyn ModelFetcher>,
        init_time: DateTime<Utc>,
        variables: Vec<Variable>,
        lead_hours: Vec<u32>,
    ) -> Self {
        Self {
            fetcher,
            init_time,
            variables,
            lead_hours,
        }
    }

    pub(crate) fn run(self) -> Result<BTreeMap<u32, FieldSet>, ConnectorError> {
        self.fetcher.fetch(
            self.init_time,
            Some(self.variables.as_slice()),
            Some(self.lead_hours.as_slice()),
        )
    }
}
