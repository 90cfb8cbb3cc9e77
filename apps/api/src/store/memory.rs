use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Analysis, NewAnalysis, NewReport, Report};
use crate::store::ReportStore;

/// In-memory `ReportStore` for tests, with injectable write failures.
#[derive(Default)]
pub struct MemoryReportStore {
    reports: RwLock<Vec<Report>>,
    analyses: RwLock<Vec<Analysis>>,
    failing_analysis_writes: AtomicUsize,
    fail_report_writes: AtomicBool,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fully-formed report, bypassing id and timestamp assignment.
    pub async fn seed_report(&self, report: Report) {
        self.reports.write().await.push(report);
    }

    /// Makes the next `n` calls to `create_analysis` fail.
    pub fn fail_next_analysis_writes(&self, n: usize) {
        self.failing_analysis_writes.store(n, Ordering::SeqCst);
    }

    pub fn fail_report_writes(&self, fail: bool) {
        self.fail_report_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn report_count(&self) -> usize {
        self.reports.read().await.len()
    }

    pub async fn analysis_count(&self) -> usize {
        self.analyses.read().await.len()
    }
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn create_report(&self, report: NewReport) -> Result<Report> {
        if self.fail_report_writes.load(Ordering::SeqCst) {
            bail!("injected report write failure");
        }
        let created = Report {
            id: Uuid::new_v4(),
            file_name: report.file_name,
            file_type: report.file_type,
            file_path: report.file_path,
            uploaded_at: Utc::now(),
        };
        self.reports.write().await.push(created.clone());
        Ok(created)
    }

    async fn get_report(&self, id: Uuid) -> Result<Option<Report>> {
        Ok(self.reports.read().await.iter().find(|r| r.id == id).cloned())
    }

    async fn list_reports(&self) -> Result<Vec<Report>> {
        let mut reports = self.reports.read().await.clone();
        reports.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(reports)
    }

    async fn create_analysis(&self, analysis: NewAnalysis) -> Result<Analysis> {
        let remaining = self.failing_analysis_writes.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_analysis_writes
                .store(remaining - 1, Ordering::SeqCst);
            bail!("injected analysis write failure");
        }

        if self.get_report(analysis.report_id).await?.is_none() {
            return Err(anyhow!("report {} does not exist", analysis.report_id));
        }

        let mut analyses = self.analyses.write().await;
        if analyses.iter().any(|a| a.report_id == analysis.report_id) {
            bail!("report {} already has an analysis", analysis.report_id);
        }
        let created = analysis.into_analysis(Uuid::new_v4(), Utc::now());
        analyses.push(created.clone());
        Ok(created)
    }

    async fn get_analysis_for_report(&self, report_id: Uuid) -> Result<Option<Analysis>> {
        Ok(self
            .analyses
            .read()
            .await
            .iter()
            .find(|a| a.report_id == report_id)
            .cloned())
    }

    async fn list_analyses_for_reports(&self, report_ids: &[Uuid]) -> Result<Vec<Analysis>> {
        Ok(self
            .analyses
            .read()
            .await
            .iter()
            .filter(|a| report_ids.contains(&a.report_id))
            .cloned()
            .collect())
    }

    async fn list_pending_reports(&self) -> Result<Vec<Report>> {
        let analyses = self.analyses.read().await;
        let mut pending: Vec<Report> = self
            .reports
            .read()
            .await
            .iter()
            .filter(|r| !analyses.iter().any(|a| a.report_id == r.id))
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at));
        Ok(pending)
    }
}
