//! Background worker for dataset builds.
//!
//! Builds may sleep on upstream latency and retry backoff, so they run on a
//! separate thread. The control thread sends keys and polls for results; it
//! never blocks on a build.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, channel};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use linkview_core::model::{DerivedDataset, ParameterSet};
use linkview_core::{DashboardError, DatasetBuilder};

/// Request sent to the background worker
#[derive(Debug)]
pub enum BuildRequest {
    /// Build the dataset for one parameter set
    Build { key: ParameterSet },
    /// Graceful shutdown
    Shutdown,
}

/// A finished build, successful or not
#[derive(Debug)]
pub struct BuildResponse {
    pub key: ParameterSet,
    pub result: Result<DerivedDataset, DashboardError>,
}

/// Executes builds off the control thread.
///
/// There is no cancellation: every accepted request eventually produces
/// exactly one response.
pub trait BuildWorker {
    /// Queue a request. Returns false if the worker is gone.
    fn send(&self, request: BuildRequest) -> bool;

    /// Try to receive a response (non-blocking)
    fn try_recv(&self) -> Option<BuildResponse>;

    /// Wait up to `timeout` for a response
    fn recv_timeout(&self, timeout: Duration) -> Option<BuildResponse>;

    /// Shutdown the worker
    fn shutdown(&self);
}

/// A [`BuildWorker`] backed by one `std::thread`.
pub struct ThreadWorker {
    request_tx: Sender<BuildRequest>,
    response_rx: Receiver<BuildResponse>,
    thread: Option<JoinHandle<()>>,
}

impl ThreadWorker {
    pub fn new(builder: Arc<DatasetBuilder>) -> Self {
        let (request_tx, request_rx) = channel();
        let (response_tx, response_rx) = channel();

        let ctx = WorkerContext {
            builder,
            response_tx,
        };
        let thread = thread::Builder::new()
            .name("linkview-build".into())
            .spawn(move || ctx.run(request_rx))
            .ok();
        if thread.is_none() {
            tracing::error!("Failed to spawn build worker thread");
        }

        Self {
            request_tx,
            response_rx,
            thread,
        }
    }
}

impl BuildWorker for ThreadWorker {
    fn send(&self, request: BuildRequest) -> bool {
        self.thread.is_some() && self.request_tx.send(request).is_ok()
    }

    fn try_recv(&self) -> Option<BuildResponse> {
        self.response_rx.try_recv().ok()
    }

    fn recv_timeout(&self, timeout: Duration) -> Option<BuildResponse> {
        match self.response_rx.recv_timeout(timeout) {
            Ok(response) => Some(response),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    fn shutdown(&self) {
        let _ = self.request_tx.send(BuildRequest::Shutdown);
    }
}

impl Drop for ThreadWorker {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// State owned by the worker thread.
struct WorkerContext {
    builder: Arc<DatasetBuilder>,
    response_tx: Sender<BuildResponse>,
}

impl WorkerContext {
    fn run(&self, request_rx: Receiver<BuildRequest>) {
        while let Ok(request) = request_rx.recv() {
            match request {
                BuildRequest::Shutdown => break,
                BuildRequest::Build { key } => {
                    tracing::debug!(params = %key, "Starting build");
                    let result = self.builder.build(&key);
                    if let Err(e) = &result {
                        tracing::warn!(params = %key, error = %e, "Build failed");
                    }
                    if self.response_tx.send(BuildResponse { key, result }).is_err() {
                        break;
                    }
                }
            }
        }
        tracing::debug!("Build worker stopped");
    }
}
