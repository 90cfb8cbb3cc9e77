//! Report Store: persistence for reports and their analyses.
//!
//! `AppState` and the analysis worker hold an `Arc<dyn ReportStore>`;
//! production uses `PgReportStore`, tests use the in-memory store.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Analysis, NewAnalysis, NewReport, Report, ReportWithAnalysis};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgReportStore;

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn create_report(&self, report: NewReport) -> Result<Report>;

    async fn get_report(&self, id: Uuid) -> Result<Option<Report>>;

    /// All reports, newest upload first.
    async fn list_reports(&self) -> Result<Vec<Report>>;

    /// Inserts the analysis for a report. Fails if the report already has one.
    async fn create_analysis(&self, analysis: NewAnalysis) -> Result<Analysis>;

    async fn get_analysis_for_report(&self, report_id: Uuid) -> Result<Option<Analysis>>;

    async fn list_analyses_for_reports(&self, report_ids: &[Uuid]) -> Result<Vec<Analysis>>;

    /// Reports that have no analysis yet, oldest first.
    async fn list_pending_reports(&self) -> Result<Vec<Report>>;
}

/// Returns every report joined with its analysis, newest first.
pub async fn list_reports_with_analysis(store: &dyn ReportStore) -> Result<Vec<ReportWithAnalysis>> {
    let reports = store.list_reports().await?;
    let ids: Vec<Uuid> = reports.iter().map(|r| r.id).collect();

    let mut by_report: HashMap<Uuid, Analysis> = store
        .list_analyses_for_reports(&ids)
        .await?
        .into_iter()
        .map(|a| (a.report_id, a))
        .collect();

    Ok(reports
        .into_iter()
        .map(|report| {
            let analysis = by_report.remove(&report.id);
            ReportWithAnalysis { report, analysis }
        })
        .collect())
}

/// Returns one report joined with its analysis, or `None` for an unknown id.
pub async fn get_report_with_analysis(
    store: &dyn ReportStore,
    id: Uuid,
) -> Result<Option<ReportWithAnalysis>> {
    let Some(report) = store.get_report(id).await? else {
        return Ok(None);
    };
    let analysis = store.get_analysis_for_report(id).await?;
    Ok(Some(ReportWithAnalysis { report, analysis }))
}
