use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

// ────────────────────────────────────────────────────────────────────────────
// Value objects (stored as JSONB arrays on the analysis row)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricStatus {
    Excellent,
    Good,
    Attention,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationCategory {
    Diet,
    Exercise,
    Sleep,
    Stress,
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl MetricStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricStatus::Excellent => "excellent",
            MetricStatus::Good => "good",
            MetricStatus::Attention => "attention",
            MetricStatus::Critical => "critical",
        }
    }
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl RecommendationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationCategory::Diet => "diet",
            RecommendationCategory::Exercise => "exercise",
            RecommendationCategory::Sleep => "sleep",
            RecommendationCategory::Stress => "stress",
            RecommendationCategory::General => "general",
        }
    }
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

/// One extracted biomarker or lab value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    pub name: String,
    /// Kept as text so "<0.5", "5.4" and "120/80" survive unchanged.
    #[serde(deserialize_with = "string_or_number")]
    pub value: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub unit: String,
    pub status: MetricStatus,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub normal_range: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub category: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub category: RecommendationCategory,
    pub title: String,
    #[serde(default)]
    pub actions: Vec<String>,
    pub priority: Priority,
}

/// Optional text fields: the model sends `null` as often as it omits them.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Models occasionally emit lab values as bare JSON numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number for metric value, got {other}"
        ))),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Analysis result (adapter output) and persisted analysis
// ────────────────────────────────────────────────────────────────────────────

const FALLBACK_LIFE_SCORE: u8 = 50;
const FALLBACK_SUMMARY: &str = "Analysis could not be completed due to an error. \
    Please try uploading the document again or contact support if the issue persists.";

/// Structured analysis of one document, as produced by a `DocumentAnalyzer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub life_score: u8,
    pub metrics: Vec<Metric>,
    pub insights: Vec<Insight>,
    pub recommendations: Vec<Recommendation>,
    pub summary: String,
}

impl AnalysisResult {
    /// Fixed content written when a document could not be analyzed.
    pub fn fallback() -> Self {
        Self {
            life_score: FALLBACK_LIFE_SCORE,
            metrics: Vec::new(),
            insights: vec![Insight {
                category: "Error".to_string(),
                title: "Analysis Error".to_string(),
                description: "Unable to analyze document at this time".to_string(),
                severity: Severity::High,
            }],
            recommendations: vec![Recommendation {
                category: RecommendationCategory::General,
                title: "Please Re-upload".to_string(),
                actions: vec![
                    "Try uploading the document again".to_string(),
                    "Ensure the document is clear and readable".to_string(),
                    "Contact support if the issue continues".to_string(),
                ],
                priority: Priority::Medium,
            }],
            summary: FALLBACK_SUMMARY.to_string(),
        }
    }
}

/// A persisted analysis row. Written once per report and never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub id: Uuid,
    pub report_id: Uuid,
    pub life_score: u8,
    pub metrics: Vec<Metric>,
    pub insights: Vec<Insight>,
    pub recommendations: Vec<Recommendation>,
    pub summary: String,
    pub analysis_date: DateTime<Utc>,
    /// True when the row holds `AnalysisResult::fallback()` rather than a model result.
    #[serde(default)]
    pub is_fallback: bool,
}

impl Analysis {
    pub fn band(&self) -> LifeScoreBand {
        LifeScoreBand::from_score(self.life_score)
    }
}

#[derive(Debug, Clone)]
pub struct NewAnalysis {
    pub report_id: Uuid,
    pub result: AnalysisResult,
    pub is_fallback: bool,
}

impl NewAnalysis {
    pub fn into_analysis(self, id: Uuid, analysis_date: DateTime<Utc>) -> Analysis {
        let AnalysisResult {
            life_score,
            metrics,
            insights,
            recommendations,
            summary,
        } = self.result;
        Analysis {
            id,
            report_id: self.report_id,
            life_score,
            metrics,
            insights,
            recommendations,
            summary,
            analysis_date,
            is_fallback: self.is_fallback,
        }
    }
}

/// Coarse label for a life score, matching the dashboard gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LifeScoreBand {
    Excellent,
    Good,
    Fair,
    NeedsAttention,
}

impl LifeScoreBand {
    pub fn from_score(score: u8) -> Self {
        match score {
            80.. => LifeScoreBand::Excellent,
            60..=79 => LifeScoreBand::Good,
            40..=59 => LifeScoreBand::Fair,
            _ => LifeScoreBand::NeedsAttention,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LifeScoreBand::Excellent => "Excellent",
            LifeScoreBand::Good => "Good",
            LifeScoreBand::Fair => "Fair",
            LifeScoreBand::NeedsAttention => "Needs Attention",
        }
    }
}
