//! Analysis worker: drains the job queue with bounded concurrency.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, Semaphore};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::analysis::DocumentAnalyzer;
use crate::config::Config;
use crate::jobs::task::{run_analysis_job, JobOutcome};
use crate::jobs::{AnalysisJob, AnalysisQueue};
use crate::store::ReportStore;

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum number of analyses running at once.
    pub max_concurrent_jobs: usize,
    /// Jobs buffered before `AnalysisQueue::enqueue` starts waiting.
    pub queue_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            queue_capacity: 64,
        }
    }
}

impl WorkerConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_concurrent_jobs: config.analysis_workers.max(1),
            queue_capacity: config.analysis_queue_capacity.max(1),
        }
    }
}

/// Emitted once per finished job.
#[derive(Debug, Clone)]
pub struct AnalysisEvent {
    pub report_id: Uuid,
    pub outcome: JobOutcome,
}

pub struct AnalysisWorker {
    store: Arc<dyn ReportStore>,
    analyzer: Arc<dyn DocumentAnalyzer>,
    config: WorkerConfig,
    event_tx: broadcast::Sender<AnalysisEvent>,
}

/// Handle for a running worker.
pub struct WorkerHandle {
    join: JoinHandle<()>,
    event_tx: broadcast::Sender<AnalysisEvent>,
}

impl WorkerHandle {
    pub fn events(&self) -> broadcast::Receiver<AnalysisEvent> {
        self.event_tx.subscribe()
    }

    /// Waits until every queue sender is dropped and all queued and
    /// in-flight jobs have finished.
    pub async fn drain(self) {
        if let Err(e) = self.join.await {
            error!("Analysis worker terminated abnormally: {e}");
        }
    }
}

impl AnalysisWorker {
    pub fn new(
        store: Arc<dyn ReportStore>,
        analyzer: Arc<dyn DocumentAnalyzer>,
        config: WorkerConfig,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            analyzer,
            config,
            event_tx,
        }
    }

    /// Creates the queue and starts draining it.
    pub fn start(self) -> (AnalysisQueue, WorkerHandle) {
        let (queue, rx) = AnalysisQueue::bounded(self.config.queue_capacity);
        (queue, self.spawn(rx))
    }

    pub fn spawn(self, rx: mpsc::Receiver<AnalysisJob>) -> WorkerHandle {
        let event_tx = self.event_tx.clone();
        let join = tokio::spawn(self.run(rx));
        WorkerHandle { join, event_tx }
    }

    #[instrument(skip_all, fields(max_concurrent = self.config.max_concurrent_jobs))]
    async fn run(self, mut rx: mpsc::Receiver<AnalysisJob>) {
        let limit = Arc::new(Semaphore::new(self.config.max_concurrent_jobs.max(1)));
        let mut in_flight = JoinSet::new();
        info!("Analysis worker started");

        while let Some(job) = rx.recv().await {
            let Ok(permit) = limit.clone().acquire_owned().await else {
                break;
            };
            while let Some(finished) = in_flight.try_join_next() {
                log_join_error(finished);
            }

            let store = self.store.clone();
            let analyzer = self.analyzer.clone();
            let events = self.event_tx.clone();
            in_flight.spawn(async move {
                let outcome = run_analysis_job(store.as_ref(), analyzer.as_ref(), &job).await;
                drop(permit);
                info!(report_id = %job.report_id, outcome = outcome.label(), "Analysis job finished");
                // No subscribers is normal outside tests.
                let _ = events.send(AnalysisEvent {
                    report_id: job.report_id,
                    outcome,
                });
            });
        }

        while let Some(finished) = in_flight.join_next().await {
            log_join_error(finished);
        }
        info!("Analysis worker stopped");
    }
}

fn log_join_error(result: Result<(), JoinError>) {
    if let Err(e) = result {
        error!("Analysis task panicked: {e}");
    }
}
