//! Test doubles shared by the integration tests.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use jiff::civil::{Date, Weekday, date};
use linkview_core::model::{DateWindow, Observation, ParamValue, ParameterSet};
use linkview_core::{
    DatasetBuilder, DatasetCache, MemorySource, PairReturns, RetryPolicy, SummaryResult,
};

use crate::binding::{ErrorSignal, ViewSink, ViewSources};
use crate::session::{ControlEvent, Dashboard};
use crate::worker::{BuildRequest, BuildResponse, BuildWorker};

/// A worker that only builds when told to, in whatever order the test picks.
pub struct ManualWorker {
    builder: Arc<DatasetBuilder>,
    queued: RefCell<VecDeque<ParameterSet>>,
    ready: RefCell<VecDeque<BuildResponse>>,
    running: Cell<bool>,
}

impl ManualWorker {
    pub fn new(builder: Arc<DatasetBuilder>) -> Self {
        Self {
            builder,
            queued: RefCell::new(VecDeque::new()),
            ready: RefCell::new(VecDeque::new()),
            running: Cell::new(true),
        }
    }

    /// Keys sent but not yet built, oldest first.
    pub fn queued(&self) -> Vec<ParameterSet> {
        self.queued.borrow().iter().cloned().collect()
    }

    /// Build `key` now and make its response available.
    pub fn finish(&self, key: &ParameterSet) {
        let mut queued = self.queued.borrow_mut();
        let position = queued
            .iter()
            .position(|k| k == key)
            .unwrap_or_else(|| panic!("no queued build for [{key}]"));
        let key = queued.remove(position).unwrap();
        drop(queued);

        let result = self.builder.build(&key);
        self.ready.borrow_mut().push_back(BuildResponse { key, result });
    }

    pub fn finish_all(&self) {
        loop {
            let next = self.queued.borrow().front().cloned();
            let Some(key) = next else { break };
            self.finish(&key);
        }
    }
}

impl BuildWorker for ManualWorker {
    fn send(&self, request: BuildRequest) -> bool {
        match request {
            BuildRequest::Build { key } if self.running.get() => {
                self.queued.borrow_mut().push_back(key);
                true
            }
            BuildRequest::Build { .. } => false,
            BuildRequest::Shutdown => {
                self.running.set(false);
                true
            }
        }
    }

    fn try_recv(&self) -> Option<BuildResponse> {
        self.ready.borrow_mut().pop_front()
    }

    fn recv_timeout(&self, _timeout: Duration) -> Option<BuildResponse> {
        self.try_recv()
    }

    fn shutdown(&self) {
        self.running.set(false);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Views { generation: u64, rows: usize },
    Summary { rows: usize },
    Error(ErrorSignal),
}

/// Records every notification in order.
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub events: Rc<RefCell<Vec<SinkEvent>>>,
}

impl RecordingSink {
    pub fn take(&self) -> Vec<SinkEvent> {
        self.events.borrow_mut().drain(..).collect()
    }
}

impl ViewSink for RecordingSink {
    fn views_replaced(&mut self, sources: &ViewSources, _labels: &BTreeMap<String, String>) {
        self.events.borrow_mut().push(SinkEvent::Views {
            generation: sources.live.generation(),
            rows: sources.live.len(),
        });
    }

    fn summary_changed(&mut self, summary: &SummaryResult, _text: &str) {
        self.events
            .borrow_mut()
            .push(SinkEvent::Summary { rows: summary.rows });
    }

    fn error_raised(&mut self, signal: &ErrorSignal) {
        self.events.borrow_mut().push(SinkEvent::Error(signal.clone()));
    }
}

pub const TICKERS: [&str; 5] = ["AAPL", "GOOG", "MSFT", "NFLX", "TSLA"];

fn weekdays(start: Date, count: usize) -> Vec<Date> {
    std::iter::successors(Some(start), |d| d.tomorrow().ok())
        .filter(|d| !matches!(d.weekday(), Weekday::Saturday | Weekday::Sunday))
        .take(count)
        .collect()
}

/// 30 aligned trading days for every ticker except TSLA, whose history lies
/// entirely outside the others' and therefore never joins.
pub fn pair_source() -> MemorySource {
    let days = weekdays(date(2019, 1, 2), 30);
    let late = weekdays(date(2019, 6, 3), 30);

    TICKERS
        .iter()
        .enumerate()
        .fold(MemorySource::new(), |source, (k, ticker)| {
            let dates = if *ticker == "TSLA" { &late } else { &days };
            let series = dates
                .iter()
                .enumerate()
                .map(|(i, d)| Observation::new(*d, 10.0 * (k + 1) as f64 + (i as f64).sqrt()))
                .collect();
            source.with_series(ticker, series)
        })
}

pub fn pair_recipe() -> PairReturns {
    PairReturns::new(
        TICKERS.iter().map(|t| t.to_string()).collect(),
        DateWindow::new(date(2019, 1, 1), date(2019, 12, 31)),
    )
    .unwrap()
}

pub fn pair(a: &str, b: &str) -> ParameterSet {
    ParameterSet::new()
        .with(PairReturns::TICKER_A, ParamValue::choice(a))
        .with(PairReturns::TICKER_B, ParamValue::choice(b))
}

pub fn set(dimension: &str, value: &str) -> ControlEvent {
    ControlEvent::ParameterChanged {
        dimension: dimension.to_string(),
        value: value.to_string(),
    }
}

/// A pair dashboard driven by a [`ManualWorker`], with the initial build
/// still queued.
pub struct Harness {
    pub source: Arc<MemorySource>,
    pub builder: Arc<DatasetBuilder>,
    pub dashboard: Dashboard<ManualWorker>,
    pub sink: RecordingSink,
}

impl Harness {
    pub fn new() -> Self {
        let source = Arc::new(pair_source());
        let recipe = Arc::new(pair_recipe());
        let builder = Arc::new(
            DatasetBuilder::new(source.clone(), recipe.clone()).with_retry(RetryPolicy::none()),
        );
        let mut dashboard =
            Dashboard::new(recipe, DatasetCache::new(16), ManualWorker::new(builder.clone()))
                .unwrap();
        let sink = RecordingSink::default();
        dashboard.binding_mut().add_sink(Box::new(sink.clone()));

        Self {
            source,
            builder,
            dashboard,
            sink,
        }
    }

    /// A harness whose initial AAPL/GOOG dataset is already displayed.
    pub fn ready() -> Self {
        let mut harness = Self::new();
        harness.finish_all();
        harness.sink.take();
        harness
    }

    pub fn worker(&self) -> &ManualWorker {
        self.dashboard.worker()
    }

    pub fn finish(&mut self, key: &ParameterSet) {
        self.dashboard.worker().finish(key);
        self.dashboard.poll();
    }

    pub fn finish_all(&mut self) {
        self.dashboard.worker().finish_all();
        self.dashboard.poll();
    }
}
