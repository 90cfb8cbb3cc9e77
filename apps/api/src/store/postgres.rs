use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

use crate::models::{Analysis, Insight, Metric, NewAnalysis, NewReport, Recommendation, Report};
use crate::store::ReportStore;

/// PostgreSQL-backed store over `health_reports` / `health_analyses`.
#[derive(Clone)]
pub struct PgReportStore {
    pool: PgPool,
}

impl PgReportStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AnalysisRow {
    id: Uuid,
    report_id: Uuid,
    life_score: i32,
    metrics: Json<Vec<Metric>>,
    insights: Json<Vec<Insight>>,
    recommendations: Json<Vec<Recommendation>>,
    summary: String,
    analysis_date: DateTime<Utc>,
    is_fallback: bool,
}

impl From<AnalysisRow> for Analysis {
    fn from(row: AnalysisRow) -> Self {
        Analysis {
            id: row.id,
            report_id: row.report_id,
            // The column carries a 0..=100 CHECK constraint.
            life_score: row.life_score.clamp(0, 100) as u8,
            metrics: row.metrics.0,
            insights: row.insights.0,
            recommendations: row.recommendations.0,
            summary: row.summary,
            analysis_date: row.analysis_date,
            is_fallback: row.is_fallback,
        }
    }
}

const ANALYSIS_COLUMNS: &str = "id, report_id, life_score, metrics, insights, recommendations, \
     summary, analysis_date, is_fallback";

#[async_trait]
impl ReportStore for PgReportStore {
    async fn create_report(&self, report: NewReport) -> Result<Report> {
        let created = sqlx::query_as::<_, Report>(
            r#"
            INSERT INTO health_reports (id, file_name, file_type, file_path)
            VALUES ($1, $2, $3, $4)
            RETURNING id, file_name, file_type, file_path, uploaded_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&report.file_name)
        .bind(&report.file_type)
        .bind(&report.file_path)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert health report")?;

        debug!(report_id = %created.id, "Inserted health report");
        Ok(created)
    }

    async fn get_report(&self, id: Uuid) -> Result<Option<Report>> {
        Ok(sqlx::query_as::<_, Report>(
            "SELECT id, file_name, file_type, file_path, uploaded_at FROM health_reports WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_reports(&self) -> Result<Vec<Report>> {
        Ok(sqlx::query_as::<_, Report>(
            r#"
            SELECT id, file_name, file_type, file_path, uploaded_at
            FROM health_reports
            ORDER BY uploaded_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn create_analysis(&self, analysis: NewAnalysis) -> Result<Analysis> {
        let NewAnalysis {
            report_id,
            result,
            is_fallback,
        } = analysis;

        let row = sqlx::query_as::<_, AnalysisRow>(&format!(
            r#"
            INSERT INTO health_analyses
                (id, report_id, life_score, metrics, insights, recommendations, summary, is_fallback)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {ANALYSIS_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(report_id)
        .bind(i32::from(result.life_score))
        .bind(Json(&result.metrics))
        .bind(Json(&result.insights))
        .bind(Json(&result.recommendations))
        .bind(&result.summary)
        .bind(is_fallback)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("Failed to insert analysis for report {report_id}"))?;

        Ok(row.into())
    }

    async fn get_analysis_for_report(&self, report_id: Uuid) -> Result<Option<Analysis>> {
        let row = sqlx::query_as::<_, AnalysisRow>(&format!(
            "SELECT {ANALYSIS_COLUMNS} FROM health_analyses WHERE report_id = $1"
        ))
        .bind(report_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Analysis::from))
    }

    async fn list_analyses_for_reports(&self, report_ids: &[Uuid]) -> Result<Vec<Analysis>> {
        if report_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, AnalysisRow>(&format!(
            "SELECT {ANALYSIS_COLUMNS} FROM health_analyses WHERE report_id = ANY($1)"
        ))
        .bind(report_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Analysis::from).collect())
    }

    async fn list_pending_reports(&self) -> Result<Vec<Report>> {
        Ok(sqlx::query_as::<_, Report>(
            r#"
            SELECT r.id, r.file_name, r.file_type, r.file_path, r.uploaded_at
            FROM health_reports r
            LEFT JOIN health_analyses a ON a.report_id = r.id
            WHERE a.id IS NULL
            ORDER BY r.uploaded_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?)
    }
}
