//! Analysis Adapter: turns document bytes into a structured `AnalysisResult`.
//!
//! Failures are returned as `AnalysisError`; deciding to persist
//! `AnalysisResult::fallback()` instead is the background task's job.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::models::{AnalysisResult, Insight, Metric, Recommendation};

pub mod gemini;
pub mod prompts;

pub use gemini::GeminiAnalyzer;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("GOOGLE_API_KEY is not configured")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid analysis: {0}")]
    InvalidResult(String),

    #[error("Failed to read document: {0}")]
    Io(#[from] std::io::Error),
}

/// Swappable analysis backend, carried as `Arc<dyn DocumentAnalyzer>`.
#[async_trait]
pub trait DocumentAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        document: &[u8],
        mime_type: &str,
    ) -> Result<AnalysisResult, AnalysisError>;
}

/// Model output before validation. Only `lifeScore`, `metrics` and `summary` are required.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnalysis {
    life_score: Option<f64>,
    metrics: Option<Vec<Metric>>,
    #[serde(default)]
    insights: Vec<Insight>,
    #[serde(default)]
    recommendations: Vec<Recommendation>,
    summary: Option<String>,
}

/// Parses and validates the model's JSON reply.
pub fn parse_analysis(text: &str) -> Result<AnalysisResult, AnalysisError> {
    let text = strip_json_fences(text);
    if text.is_empty() {
        return Err(AnalysisError::EmptyResponse);
    }

    let raw: RawAnalysis = serde_json::from_str(text)?;

    let score = raw
        .life_score
        .ok_or_else(|| AnalysisError::InvalidResult("missing lifeScore".to_string()))?;
    if !(0.0..=100.0).contains(&score) {
        return Err(AnalysisError::InvalidResult(format!(
            "lifeScore {score} is outside 0-100"
        )));
    }
    let metrics = raw
        .metrics
        .ok_or_else(|| AnalysisError::InvalidResult("missing metrics".to_string()))?;
    let summary = raw
        .summary
        .ok_or_else(|| AnalysisError::InvalidResult("missing summary".to_string()))?;

    Ok(AnalysisResult {
        life_score: score.round() as u8,
        metrics,
        insights: raw.insights,
        recommendations: raw.recommendations,
        summary,
    })
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
