//! Synchronization between the dataset cache and the dependent views.
//!
//! A [`ViewBinding`] owns the two view sources (`live` and `static`), the
//! selection and the summary. Both sources are always replaced together from
//! one dataset, so a renderer can rely on them being row-aligned.
//!
//! ```text
//!   Idle/Ready/Error --param (hit)--> Ready
//!   Idle/Ready/Error --param (miss)--> Fetching --current ok--> Ready
//!                                          |----current err--> Error
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use linkview_core::model::{DerivedDataset, ParameterSet, Value};
use linkview_core::{
    CacheLookup, DashboardError, DatasetCache, DatasetRecipe, ErrorKind, SelectionTracker,
    SummaryComputer, SummaryResult,
};

use crate::format;
use crate::worker::{BuildRequest, BuildResponse, BuildWorker};

/// Error surfaced to the UI layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorSignal {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&DashboardError> for ErrorSignal {
    fn from(err: &DashboardError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BindingState {
    Idle,
    Fetching { key: ParameterSet },
    Ready,
    Error(ErrorSignal),
}

/// One view data source. Cloning shares the dataset.
#[derive(Debug, Clone, Default)]
pub struct ViewSource {
    dataset: Option<Arc<DerivedDataset>>,
    generation: u64,
}

impl ViewSource {
    fn bound(dataset: Arc<DerivedDataset>, generation: u64) -> Self {
        Self {
            dataset: Some(dataset),
            generation,
        }
    }

    fn cleared(generation: u64) -> Self {
        Self {
            dataset: None,
            generation,
        }
    }

    pub fn dataset(&self) -> Option<&Arc<DerivedDataset>> {
        self.dataset.as_ref()
    }

    /// Incremented every time the sources are replaced
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.dataset.as_ref().map_or(0, |d| d.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Column name to row-aligned values. Empty when nothing is bound.
    pub fn to_payload(&self) -> BTreeMap<String, Vec<Value>> {
        self.dataset
            .iter()
            .flat_map(|d| d.columns())
            .map(|c| (c.name.clone(), c.values.clone()))
            .collect()
    }

    /// Whether both sources hold the very same dataset.
    pub fn shares_dataset_with(&self, other: &ViewSource) -> bool {
        match (&self.dataset, &other.dataset) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b) && self.generation == other.generation,
            (None, None) => self.generation == other.generation,
            _ => false,
        }
    }
}

/// The two synchronized outputs.
#[derive(Debug, Clone, Default)]
pub struct ViewSources {
    /// Scatter and highlight layer; reflects the selection
    pub live: ViewSource,
    /// Unhighlighted baseline lines
    pub baseline: ViewSource,
}

/// Receives view updates. All methods default to doing nothing.
pub trait ViewSink {
    fn views_replaced(&mut self, _sources: &ViewSources, _labels: &BTreeMap<String, String>) {}

    fn summary_changed(&mut self, _summary: &SummaryResult, _text: &str) {}

    fn error_raised(&mut self, _signal: &ErrorSignal) {}
}

pub struct ViewBinding {
    recipe: Arc<dyn DatasetRecipe>,
    state: BindingState,
    /// Key of the most recent parameter change; only its result is applied
    requested: Option<ParameterSet>,
    sources: ViewSources,
    labels: BTreeMap<String, String>,
    selection: SelectionTracker,
    summary: SummaryResult,
    summary_text: String,
    generation: u64,
    sinks: Vec<Box<dyn ViewSink>>,
}

impl ViewBinding {
    pub fn new(recipe: Arc<dyn DatasetRecipe>) -> Self {
        let summary = SummaryResult::empty(&recipe.summary_columns());
        Self {
            recipe,
            state: BindingState::Idle,
            requested: None,
            sources: ViewSources::default(),
            labels: BTreeMap::new(),
            selection: SelectionTracker::new(),
            summary_text: format::describe(&summary),
            summary,
            generation: 0,
            sinks: Vec::new(),
        }
    }

    pub fn add_sink(&mut self, sink: Box<dyn ViewSink>) {
        self.sinks.push(sink);
    }

    pub fn state(&self) -> &BindingState {
        &self.state
    }

    pub fn is_fetching(&self) -> bool {
        matches!(self.state, BindingState::Fetching { .. })
    }

    pub fn requested(&self) -> Option<&ParameterSet> {
        self.requested.as_ref()
    }

    pub fn sources(&self) -> &ViewSources {
        &self.sources
    }

    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    pub fn selection(&self) -> &[usize] {
        self.selection.indices()
    }

    pub fn summary(&self) -> &SummaryResult {
        &self.summary
    }

    pub fn summary_text(&self) -> &str {
        &self.summary_text
    }

    /// React to a new current parameter set.
    pub fn on_parameter_changed(
        &mut self,
        params: &ParameterSet,
        cache: &mut DatasetCache,
        worker: &dyn BuildWorker,
    ) {
        self.requested = Some(params.clone());

        match cache.begin(params) {
            CacheLookup::Hit(dataset) => self.apply(dataset),
            CacheLookup::Pending => {
                tracing::debug!(params = %params, "Waiting on in-flight build");
                self.state = BindingState::Fetching {
                    key: params.clone(),
                };
            }
            CacheLookup::Dispatch => {
                if worker.send(BuildRequest::Build { key: params.clone() }) {
                    self.state = BindingState::Fetching {
                        key: params.clone(),
                    };
                } else {
                    cache.abandon(params);
                    self.fail(&DashboardError::DataUnavailable {
                        series: params.to_string(),
                        reason: "build worker is not running".into(),
                    });
                }
            }
        }
    }

    /// Record a finished build. It is always cached; it is only applied if
    /// its key is still the requested one.
    pub fn on_build_complete(&mut self, response: BuildResponse, cache: &mut DatasetCache) {
        let BuildResponse { key, result } = response;
        let current = self.requested.as_ref() == Some(&key);

        match (cache.complete(&key, result), current) {
            (Ok(dataset), true) => self.apply(dataset),
            (Ok(_), false) => {
                tracing::debug!(params = %key, "Cached superseded build result");
            }
            (Err(e), true) => self.fail(&e),
            (Err(e), false) => {
                tracing::info!(params = %key, error = %e, "Ignoring failure of superseded build");
            }
        }
    }

    /// Store a new selection and recompute the summary. Views are untouched.
    pub fn on_selection_changed(&mut self, indices: impl IntoIterator<Item = usize>) -> &[usize] {
        self.selection.set(indices);
        self.recompute_summary();
        self.selection.indices()
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.recompute_summary();
    }

    fn apply(&mut self, dataset: Arc<DerivedDataset>) {
        self.generation += 1;
        self.labels = self.recipe.labels(dataset.parameters());
        self.selection.on_dataset_replaced(dataset.len());
        self.sources = ViewSources {
            live: ViewSource::bound(dataset.clone(), self.generation),
            baseline: ViewSource::bound(dataset, self.generation),
        };
        self.state = BindingState::Ready;

        tracing::debug!(
            generation = self.generation,
            rows = self.sources.live.len(),
            "Views replaced"
        );
        for sink in &mut self.sinks {
            sink.views_replaced(&self.sources, &self.labels);
        }
        self.recompute_summary();
    }

    fn fail(&mut self, err: &DashboardError) {
        let signal = ErrorSignal::from(err);
        tracing::warn!(kind = %signal.kind, error = %err, "Dataset request failed");

        if err.kind() == ErrorKind::EmptyResult {
            self.generation += 1;
            if let Some(params) = &self.requested {
                self.labels = self.recipe.labels(params);
            }
            self.selection.on_dataset_replaced(0);
            self.sources = ViewSources {
                live: ViewSource::cleared(self.generation),
                baseline: ViewSource::cleared(self.generation),
            };
            for sink in &mut self.sinks {
                sink.views_replaced(&self.sources, &self.labels);
            }
            self.recompute_summary();
        }

        self.state = BindingState::Error(signal.clone());
        for sink in &mut self.sinks {
            sink.error_raised(&signal);
        }
    }

    fn recompute_summary(&mut self) {
        let columns = self.recipe.summary_columns();
        self.summary = match self.sources.live.dataset() {
            Some(dataset) => SummaryComputer::compute(dataset, self.selection.indices(), &columns)
                .unwrap_or_else(|e| {
                    tracing::error!(error = %e, "Summary failed");
                    SummaryResult::empty(&columns)
                }),
            None => SummaryResult::empty(&columns),
        };
        self.summary_text = format::describe(&self.summary);

        for sink in &mut self.sinks {
            sink.summary_changed(&self.summary, &self.summary_text);
        }
    }
}
