pub mod analysis;
pub mod report;

pub use analysis::{
    Analysis, AnalysisResult, Insight, LifeScoreBand, Metric, MetricStatus, NewAnalysis, Priority,
    Recommendation, RecommendationCategory, Severity,
};
pub use report::{NewReport, Report, ReportWithAnalysis};
