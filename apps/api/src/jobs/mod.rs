//! Background analysis: a bounded job queue drained by `AnalysisWorker`.
//!
//! The upload handler enqueues one `AnalysisJob` per report and returns; the
//! worker runs `task::run_analysis_job` for each job under a concurrency limit.

use std::path::PathBuf;

use anyhow::Result;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::Report;
use crate::store::ReportStore;

pub mod task;
pub mod worker;

pub use task::{run_analysis_job, JobOutcome};
pub use worker::{AnalysisEvent, AnalysisWorker, WorkerConfig, WorkerHandle};

/// Everything the worker needs to analyze one stored upload.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisJob {
    pub report_id: Uuid,
    pub file_path: PathBuf,
    pub mime_type: String,
}

impl AnalysisJob {
    pub fn for_report(report: &Report) -> Self {
        Self {
            report_id: report.id,
            file_path: PathBuf::from(&report.file_path),
            mime_type: report.file_type.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("analysis queue is closed")]
    Closed,
}

/// Sending half of the analysis queue. Cloned into `AppState`.
#[derive(Clone)]
pub struct AnalysisQueue {
    tx: mpsc::Sender<AnalysisJob>,
}

impl AnalysisQueue {
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<AnalysisJob>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Waits only while the queue is full.
    pub async fn enqueue(&self, job: AnalysisJob) -> Result<(), QueueError> {
        let report_id = job.report_id;
        self.tx.send(job).await.map_err(|_| QueueError::Closed)?;
        debug!(%report_id, "Enqueued analysis job");
        Ok(())
    }
}

/// Re-enqueues reports whose analysis was lost to a restart.
///
/// A report qualifies when it has no analysis and its stored file still exists;
/// finished jobs always delete their file, so a missing file means the job ran.
pub async fn resume_pending(store: &dyn ReportStore, queue: &AnalysisQueue) -> Result<usize> {
    let mut resumed = 0;
    for report in store.list_pending_reports().await? {
        let job = AnalysisJob::for_report(&report);
        if !tokio::fs::try_exists(&job.file_path).await.unwrap_or(false) {
            debug!(report_id = %report.id, "Pending report has no stored file, leaving it");
            continue;
        }
        queue.enqueue(job).await?;
        resumed += 1;
    }
    if resumed > 0 {
        info!("Resumed {resumed} pending analysis job(s)");
    }
    Ok(resumed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisResult, NewAnalysis};
    use crate::store::memory::MemoryReportStore;
    use chrono::Utc;

    fn report_with_path(path: &std::path::Path) -> Report {
        Report {
            id: Uuid::new_v4(),
            file_name: "scan.png".to_string(),
            file_type: "image/png".to_string(),
            file_path: path.to_string_lossy().into_owned(),
            uploaded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_enqueue_after_receiver_dropped_is_closed() {
        let (queue, rx) = AnalysisQueue::bounded(1);
        drop(rx);
        let job = AnalysisJob {
            report_id: Uuid::new_v4(),
            file_path: PathBuf::from("uploads/x.pdf"),
            mime_type: "application/pdf".to_string(),
        };
        assert!(matches!(queue.enqueue(job).await, Err(QueueError::Closed)));
    }

    #[tokio::test]
    async fn test_resume_only_requeues_reports_with_stored_files() {
        let dir = tempfile::tempdir().unwrap();
        let kept = dir.path().join("kept.png");
        tokio::fs::write(&kept, b"png").await.unwrap();

        let store = MemoryReportStore::new();
        let with_file = report_with_path(&kept);
        let without_file = report_with_path(&dir.path().join("gone.png"));
        let analyzed = report_with_path(&kept);
        store.seed_report(with_file.clone()).await;
        store.seed_report(without_file).await;
        store.seed_report(analyzed.clone()).await;
        store
            .create_analysis(NewAnalysis {
                report_id: analyzed.id,
                result: AnalysisResult::fallback(),
                is_fallback: true,
            })
            .await
            .unwrap();

        let (queue, mut rx) = AnalysisQueue::bounded(8);
        let resumed = resume_pending(&store, &queue).await.unwrap();

        assert_eq!(resumed, 1);
        let job = rx.try_recv().unwrap();
        assert_eq!(job, AnalysisJob::for_report(&with_file));
        assert!(rx.try_recv().is_err());
    }
}
