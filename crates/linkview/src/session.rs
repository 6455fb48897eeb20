//! A running dashboard: one control thread driving store, cache and views.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use linkview_core::model::{Domain, ParameterSet, Value};
use linkview_core::{
    CacheStats, DashboardError, DatasetBuilder, DatasetCache, DatasetRecipe, ParameterStore,
    SummaryResult, UpstreamSource,
};

use crate::binding::{BindingState, ViewBinding};
use crate::config::DashboardConfig;
use crate::worker::{BuildWorker, ThreadWorker};

/// Input from the UI controls
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    /// A control changed; `value` is its textual form (`"AAPL"`, `"3..5"`)
    ParameterChanged { dimension: String, value: String },
    /// Box selection over the bound dataset's rows
    SelectionChanged { indices: Vec<usize> },
    ClearSelection,
}

/// Serializable view of everything a renderer needs.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub state: BindingState,
    pub parameters: ParameterSet,
    pub generation: u64,
    pub rows: usize,
    pub labels: BTreeMap<String, String>,
    pub selection: Vec<usize>,
    pub summary: SummaryResult,
    pub summary_text: String,
}

/// Row-aligned payloads of both view sources.
#[derive(Debug, Clone, Serialize)]
pub struct Payloads {
    pub live: BTreeMap<String, Vec<Value>>,
    #[serde(rename = "static")]
    pub baseline: BTreeMap<String, Vec<Value>>,
}

/// Owns the parameter store, dataset cache, view binding and build worker.
///
/// Every method runs on the caller's thread; only builds run elsewhere.
pub struct Dashboard<W: BuildWorker = ThreadWorker> {
    store: ParameterStore,
    cache: DatasetCache,
    binding: ViewBinding,
    worker: W,
    changes: Rc<RefCell<Vec<ParameterSet>>>,
}

impl Dashboard<ThreadWorker> {
    /// Wire up a dashboard from configuration and start loading the initial
    /// dataset.
    pub fn from_config(
        config: &DashboardConfig,
        source: Arc<dyn UpstreamSource>,
    ) -> Result<Self, DashboardError> {
        let recipe = config.recipe()?;
        let builder =
            DatasetBuilder::new(source, recipe.clone()).with_retry(config.retry_policy());
        let worker = ThreadWorker::new(Arc::new(builder));
        let cache = DatasetCache::new(config.cache.capacity);
        Self::new(recipe, cache, worker)
    }
}

impl<W: BuildWorker> Dashboard<W> {
    /// Requests the dataset for the recipe's initial parameters.
    pub fn new(
        recipe: Arc<dyn DatasetRecipe>,
        cache: DatasetCache,
        worker: W,
    ) -> Result<Self, DashboardError> {
        let mut store = ParameterStore::new(recipe.schema(), recipe.initial_parameters())?;
        let changes = Rc::new(RefCell::new(Vec::new()));
        let queue = changes.clone();
        store.on_parameter_changed(move |params| queue.borrow_mut().push(params.clone()));

        let mut dashboard = Self {
            store,
            cache,
            binding: ViewBinding::new(recipe.clone()),
            worker,
            changes,
        };
        tracing::info!(
            recipe = recipe.name(),
            params = %dashboard.store.current(),
            capacity = dashboard.cache.capacity(),
            "Dashboard started"
        );
        let initial = dashboard.store.current().clone();
        dashboard
            .binding
            .on_parameter_changed(&initial, &mut dashboard.cache, &dashboard.worker);
        Ok(dashboard)
    }

    /// Process one control event. Rejected parameter values leave every
    /// piece of state as it was; the error is returned for display only.
    pub fn handle(&mut self, event: ControlEvent) -> Result<(), DashboardError> {
        self.poll();
        match event {
            ControlEvent::ParameterChanged { dimension, value } => {
                if let Err(e) = self.store.set_text(&dimension, &value) {
                    tracing::warn!(
                        dimension = %dimension,
                        value = %value,
                        error = %e,
                        "Rejected parameter change"
                    );
                    return Err(e);
                }
                let changes: Vec<_> = self.changes.borrow_mut().drain(..).collect();
                for params in changes {
                    self.binding
                        .on_parameter_changed(&params, &mut self.cache, &self.worker);
                }
            }
            ControlEvent::SelectionChanged { indices } => {
                self.binding.on_selection_changed(indices);
            }
            ControlEvent::ClearSelection => self.binding.clear_selection(),
        }
        Ok(())
    }

    /// Apply every finished build. Returns how many were processed.
    pub fn poll(&mut self) -> usize {
        let mut processed = 0;
        while let Some(response) = self.worker.try_recv() {
            self.binding.on_build_complete(response, &mut self.cache);
            processed += 1;
        }
        processed
    }

    /// Process completions until nothing the views wait on is in flight.
    /// Returns false on timeout.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.poll();
            if !self.binding.is_fetching() {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                tracing::warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    "Timed out waiting for build"
                );
                return false;
            }
            if let Some(response) = self.worker.recv_timeout(remaining) {
                self.binding.on_build_complete(response, &mut self.cache);
            }
        }
    }

    pub fn current(&self) -> &ParameterSet {
        self.store.current()
    }

    pub fn options(&self, dimension: &str) -> Result<Domain, DashboardError> {
        self.store.options(dimension)
    }

    pub fn binding(&self) -> &ViewBinding {
        &self.binding
    }

    pub fn binding_mut(&mut self) -> &mut ViewBinding {
        &mut self.binding
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn cache(&self) -> &DatasetCache {
        &self.cache
    }

    pub fn worker(&self) -> &W {
        &self.worker
    }

    pub fn snapshot(&self) -> Snapshot {
        let binding = &self.binding;
        Snapshot {
            state: binding.state().clone(),
            parameters: self.store.current().clone(),
            generation: binding.sources().live.generation(),
            rows: binding.sources().live.len(),
            labels: binding.labels().clone(),
            selection: binding.selection().to_vec(),
            summary: binding.summary().clone(),
            summary_text: binding.summary_text().to_string(),
        }
    }

    pub fn payloads(&self) -> Payloads {
        let sources = self.binding.sources();
        Payloads {
            live: sources.live.to_payload(),
            baseline: sources.baseline.to_payload(),
        }
    }
}
