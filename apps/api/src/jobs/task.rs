use std::path::Path;

use tracing::{debug, error, info, warn};

use crate::analysis::{AnalysisError, DocumentAnalyzer};
use crate::jobs::AnalysisJob;
use crate::models::{AnalysisResult, NewAnalysis};
use crate::store::ReportStore;

/// How a single analysis job ended.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// The model result was stored.
    Analyzed { life_score: u8 },
    /// The fallback analysis was stored instead.
    Fallback { reason: String },
    /// Both writes failed; the report stays without an analysis.
    Abandoned { reason: String },
}

impl JobOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            JobOutcome::Analyzed { .. } => "analyzed",
            JobOutcome::Fallback { .. } => "fallback",
            JobOutcome::Abandoned { .. } => "abandoned",
        }
    }
}

/// Analyzes one stored upload and records exactly one analysis for its report.
///
/// Any failure before or during the primary write degrades to a single
/// fallback write. The stored file is removed afterwards in every case.
pub async fn run_analysis_job(
    store: &dyn ReportStore,
    analyzer: &dyn DocumentAnalyzer,
    job: &AnalysisJob,
) -> JobOutcome {
    let report_id = job.report_id;
    info!(%report_id, "Starting analysis");

    let outcome = match analyze_stored_file(analyzer, job).await {
        Ok(result) => {
            let life_score = result.life_score;
            let primary = NewAnalysis {
                report_id,
                result,
                is_fallback: false,
            };
            match store.create_analysis(primary).await {
                Ok(_) => {
                    info!(%report_id, life_score, "Analysis completed");
                    JobOutcome::Analyzed { life_score }
                }
                Err(e) => {
                    warn!(%report_id, "Failed to store analysis: {e:#}");
                    write_fallback(store, job, format!("failed to store analysis: {e:#}")).await
                }
            }
        }
        Err(e) => {
            warn!(%report_id, "Analysis failed: {e}");
            write_fallback(store, job, e.to_string()).await
        }
    };

    remove_stored_file(&job.file_path).await;
    outcome
}

async fn analyze_stored_file(
    analyzer: &dyn DocumentAnalyzer,
    job: &AnalysisJob,
) -> Result<AnalysisResult, AnalysisError> {
    let document = tokio::fs::read(&job.file_path).await?;
    analyzer.analyze(&document, &job.mime_type).await
}

async fn write_fallback(store: &dyn ReportStore, job: &AnalysisJob, reason: String) -> JobOutcome {
    let report_id = job.report_id;
    let fallback = NewAnalysis {
        report_id,
        result: AnalysisResult::fallback(),
        is_fallback: true,
    };
    match store.create_analysis(fallback).await {
        Ok(_) => {
            info!(%report_id, "Stored fallback analysis");
            JobOutcome::Fallback { reason }
        }
        Err(e) => {
            error!(%report_id, "Failed to store fallback analysis: {e:#}");
            JobOutcome::Abandoned {
                reason: format!("{reason}; fallback write failed: {e:#}"),
            }
        }
    }
}

async fn remove_stored_file(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed stored upload"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "Stored upload already gone")
        }
        Err(e) => warn!(path = %path.display(), "Failed to remove stored upload: {e}"),
    }
}
