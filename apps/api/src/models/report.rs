use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::analysis::Analysis;

/// An uploaded health document. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,
    pub file_name: String,
    pub file_type: String,
    pub file_path: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Fields supplied by the upload handler; id and timestamp are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewReport {
    pub file_name: String,
    pub file_type: String,
    pub file_path: String,
}

/// A report joined with its analysis. `analysis` serializes as `null` while
/// the background task has not written one yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportWithAnalysis {
    #[serde(flatten)]
    pub report: Report,
    #[serde(default)]
    pub analysis: Option<Analysis>,
}

impl ReportWithAnalysis {
    pub fn is_pending(&self) -> bool {
        self.analysis.is_none()
    }
}
