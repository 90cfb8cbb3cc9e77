use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::AnalysisJob;
use crate::models::{NewReport, ReportWithAnalysis};
use crate::reports::upload::{read_file_field, save_upload, validate, UploadRejection, MAX_UPLOAD_BYTES};
use crate::state::AppState;
use crate::store::{self, ReportStore};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub report_id: Uuid,
    pub message: String,
}

/// POST /api/reports/upload
///
/// Stores the file, records the report and queues its analysis. Responds
/// before the analysis runs; clients poll the detail route for the result.
pub async fn handle_upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let mut multipart =
        multipart.map_err(|e| UploadRejection::InvalidMultipart(e.body_text()))?;

    let received = read_file_field(&mut multipart, MAX_UPLOAD_BYTES).await?;
    let upload = validate(received)?;

    let path = save_upload(&state.config.upload_dir, &upload)
        .await
        .map_err(|e| anyhow::Error::new(e).context("Failed to store uploaded file"))?;

    let new_report = NewReport {
        file_name: upload.file_name.clone(),
        file_type: upload.kind.mime_type().to_string(),
        file_path: path.to_string_lossy().into_owned(),
    };

    let report = match state.store.create_report(new_report).await {
        Ok(report) => report,
        Err(e) => {
            if let Err(io) = tokio::fs::remove_file(&path).await {
                error!("Failed to remove orphaned upload {}: {io}", path.display());
            }
            return Err(AppError::Internal(e.context("Failed to record report")));
        }
    };

    info!(
        report_id = %report.id,
        file_type = %report.file_type,
        bytes = upload.bytes.len(),
        "Report uploaded"
    );

    // The report stays pending if the queue is gone; startup recovery picks it up.
    if let Err(e) = state.queue.enqueue(AnalysisJob::for_report(&report)).await {
        warn!(report_id = %report.id, "Analysis not queued: {e}");
    }

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            report_id: report.id,
            message: "Report uploaded successfully".to_string(),
        }),
    ))
}

/// GET /api/reports
pub async fn handle_list_reports(
    State(state): State<AppState>,
) -> Result<Json<Vec<ReportWithAnalysis>>, AppError> {
    let reports = store::list_reports_with_analysis(state.store.as_ref()).await?;
    Ok(Json(reports))
}

/// GET /api/reports/:id
pub async fn handle_get_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ReportWithAnalysis>, AppError> {
    let not_found = || AppError::NotFound("Report not found".to_string());
    let id = Uuid::parse_str(&id).map_err(|_| not_found())?;
    let report = store::get_report_with_analysis(state.store.as_ref(), id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(report))
}
