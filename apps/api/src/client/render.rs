//! Plain-text views for the CLI.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Analysis, LifeScoreBand, Metric, ReportWithAnalysis};

const RECENT_REPORTS: usize = 3;
const UNCATEGORIZED: &str = "Other";

/// Headline numbers for the dashboard. "Latest" means the most recent upload,
/// whether or not its analysis has finished.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSummary {
    pub total_reports: usize,
    pub pending_reports: usize,
    pub last_upload: Option<DateTime<Utc>>,
    pub latest: Option<LatestAnalysis>,
    pub recent: Vec<RecentReport>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LatestAnalysis {
    pub report_id: Uuid,
    pub life_score: u8,
    pub band: LifeScoreBand,
    pub summary: String,
    pub metric_count: usize,
    pub recommendation_count: usize,
    pub is_fallback: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecentReport {
    pub id: Uuid,
    pub file_name: String,
    pub uploaded_at: DateTime<Utc>,
    pub life_score: Option<u8>,
}

impl DashboardSummary {
    /// Expects `reports` newest first, as the list route returns them.
    pub fn from_reports(reports: &[ReportWithAnalysis]) -> Self {
        let newest = reports.first();
        Self {
            total_reports: reports.len(),
            pending_reports: reports.iter().filter(|r| r.is_pending()).count(),
            last_upload: newest.map(|r| r.report.uploaded_at),
            latest: newest.and_then(|r| r.analysis.as_ref()).map(|a| LatestAnalysis {
                report_id: a.report_id,
                life_score: a.life_score,
                band: a.band(),
                summary: a.summary.clone(),
                metric_count: a.metrics.len(),
                recommendation_count: a.recommendations.len(),
                is_fallback: a.is_fallback,
            }),
            recent: reports
                .iter()
                .take(RECENT_REPORTS)
                .map(|r| RecentReport {
                    id: r.report.id,
                    file_name: r.report.file_name.clone(),
                    uploaded_at: r.report.uploaded_at,
                    life_score: r.analysis.as_ref().map(|a| a.life_score),
                })
                .collect(),
        }
    }
}

pub fn render_dashboard(summary: &DashboardSummary) -> String {
    if summary.total_reports == 0 {
        return "No reports yet. Upload your first health report with `lifescore upload <FILE>`.\n"
            .to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "Health Dashboard");
    let _ = writeln!(out, "  Total reports:  {}", summary.total_reports);
    let _ = writeln!(out, "  In progress:    {}", summary.pending_reports);
    match &summary.latest {
        Some(latest) => {
            let _ = writeln!(
                out,
                "  Latest score:   {}/100 ({})",
                latest.life_score,
                latest.band.label()
            );
        }
        None => {
            let _ = writeln!(out, "  Latest score:   N/A");
        }
    }
    if let Some(at) = summary.last_upload {
        let _ = writeln!(out, "  Last upload:    {}", at.format("%Y-%m-%d"));
    }

    if let Some(latest) = &summary.latest {
        let _ = writeln!(out, "\nRecent analysis");
        if latest.is_fallback {
            let _ = writeln!(out, "  (analysis failed; re-upload to retry)");
        }
        let _ = writeln!(out, "  {}", latest.summary);
        let _ = writeln!(out, "  Metrics analyzed: {}", latest.metric_count);
        let _ = writeln!(out, "  Recommendations:  {}", latest.recommendation_count);
    }

    let _ = writeln!(out, "\nRecent reports");
    for report in &summary.recent {
        let _ = writeln!(out, "  {}", recent_line(report));
    }
    out
}

fn recent_line(report: &RecentReport) -> String {
    let score = report
        .life_score
        .map(|s| format!("score {s}"))
        .unwrap_or_else(|| "in progress".to_string());
    format!(
        "{}  {}  {}  {}",
        report.id,
        report.uploaded_at.format("%Y-%m-%d"),
        report.file_name,
        score
    )
}

pub fn render_history(reports: &[ReportWithAnalysis]) -> String {
    if reports.is_empty() {
        return "No reports yet.\n".to_string();
    }
    let mut out = String::new();
    for r in reports {
        let status = match &r.analysis {
            Some(a) if a.is_fallback => format!("{} (analysis failed)", a.life_score),
            Some(a) => format!("{} {}", a.life_score, a.band().label()),
            None => "in progress".to_string(),
        };
        let _ = writeln!(
            out,
            "{}  {}  {:<32}  {}",
            r.report.id,
            r.report.uploaded_at.format("%Y-%m-%d %H:%M"),
            r.report.file_name,
            status
        );
    }
    out
}

pub fn render_report(report: &ReportWithAnalysis) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", report.report.file_name, report.report.file_type);
    let _ = writeln!(
        out,
        "Uploaded {}",
        report.report.uploaded_at.format("%Y-%m-%d %H:%M UTC")
    );

    match &report.analysis {
        None => {
            let _ = writeln!(out, "\nAnalysis in progress...");
        }
        Some(analysis) => write_analysis(&mut out, analysis),
    }
    out
}

fn write_analysis(out: &mut String, analysis: &Analysis) {
    let _ = writeln!(
        out,
        "\nLife Score: {}/100 ({})",
        analysis.life_score,
        analysis.band().label()
    );
    let _ = writeln!(out, "\n{}", analysis.summary);

    if !analysis.metrics.is_empty() {
        let _ = writeln!(out, "\nMetrics");
        for (category, metrics) in metrics_by_category(&analysis.metrics) {
            let _ = writeln!(out, "  {} ({})", category, metrics.len());
            for m in metrics {
                let value = if m.unit.is_empty() {
                    m.value.clone()
                } else {
                    format!("{} {}", m.value, m.unit)
                };
                let _ = write!(out, "    [{}] {}: {}", m.status.as_str(), m.name, value);
                if !m.normal_range.is_empty() {
                    let _ = write!(out, " (normal {})", m.normal_range);
                }
                let _ = writeln!(out);
            }
        }
    }

    if !analysis.insights.is_empty() {
        let _ = writeln!(out, "\nInsights");
        for i in &analysis.insights {
            let _ = writeln!(out, "  [{}] {}: {}", i.severity.as_str(), i.title, i.description);
        }
    }

    if !analysis.recommendations.is_empty() {
        let _ = writeln!(out, "\nRecommendations");
        for r in &analysis.recommendations {
            let _ = writeln!(
                out,
                "  {} ({}, {} priority)",
                r.title,
                r.category.as_str(),
                r.priority.as_str()
            );
            for action in &r.actions {
                let _ = writeln!(out, "    - {action}");
            }
        }
    }
}

/// Groups metrics under their category in first-seen order. Blank categories go under "Other".
fn metrics_by_category(metrics: &[Metric]) -> Vec<(&str, Vec<&Metric>)> {
    let mut groups: Vec<(&str, Vec<&Metric>)> = Vec::new();
    for metric in metrics {
        let category = match metric.category.trim() {
            "" => UNCATEGORIZED,
            c => c,
        };
        match groups.iter_mut().find(|(name, _)| *name == category) {
            Some((_, group)) => group.push(metric),
            None => groups.push((category, vec![metric])),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisResult, MetricStatus, NewAnalysis, Report};
    use chrono::Duration;

    fn report(name: &str, minutes_ago: i64) -> Report {
        Report {
            id: Uuid::new_v4(),
            file_name: name.to_string(),
            file_type: "application/pdf".to_string(),
            file_path: format!("uploads/{name}"),
            uploaded_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    fn analyzed(report: Report, life_score: u8) -> ReportWithAnalysis {
        let mut result = AnalysisResult::fallback();
        result.life_score = life_score;
        result.metrics = vec![Metric {
            name: "LDL Cholesterol".to_string(),
            value: "130".to_string(),
            unit: "mg/dL".to_string(),
            status: MetricStatus::Attention,
            normal_range: "<100".to_string(),
            category: "Lipids".to_string(),
        }];
        let analysis = NewAnalysis {
            report_id: report.id,
            result,
            is_fallback: false,
        }
        .into_analysis(Uuid::new_v4(), Utc::now());
        ReportWithAnalysis {
            report,
            analysis: Some(analysis),
        }
    }

    fn pending(report: Report) -> ReportWithAnalysis {
        ReportWithAnalysis {
            report,
            analysis: None,
        }
    }

    #[test]
    fn test_dashboard_uses_newest_report() {
        let reports = vec![
            analyzed(report("new.pdf", 1), 85),
            pending(report("mid.pdf", 10)),
            analyzed(report("old.pdf", 20), 40),
            analyzed(report("oldest.pdf", 30), 60),
        ];

        let summary = DashboardSummary::from_reports(&reports);

        assert_eq!(summary.total_reports, 4);
        assert_eq!(summary.pending_reports, 1);
        let latest = summary.latest.unwrap();
        assert_eq!(latest.life_score, 85);
        assert_eq!(latest.band, LifeScoreBand::Excellent);
        assert_eq!(latest.metric_count, 1);
        assert_eq!(latest.recommendation_count, 1);
        assert_eq!(summary.recent.len(), 3);
        assert_eq!(summary.recent[1].life_score, None);
    }

    #[test]
    fn test_dashboard_latest_pending_has_no_score() {
        let reports = vec![pending(report("new.pdf", 1)), analyzed(report("old.pdf", 5), 70)];

        let summary = DashboardSummary::from_reports(&reports);

        assert!(summary.latest.is_none());
        assert!(render_dashboard(&summary).contains("Latest score:   N/A"));
    }

    #[test]
    fn test_empty_dashboard_prompts_upload() {
        let summary = DashboardSummary::from_reports(&[]);
        assert_eq!(summary.total_reports, 0);
        assert!(render_dashboard(&summary).starts_with("No reports yet"));
    }

    #[test]
    fn test_render_report_shows_band_and_metrics() {
        let text = render_report(&analyzed(report("labs.pdf", 1), 62));
        assert!(text.contains("Life Score: 62/100 (Good)"));
        assert!(text.contains("[attention] LDL Cholesterol: 130 mg/dL (normal <100)"));
        assert!(text.contains("Please Re-upload (general, medium priority)"));
    }

    #[test]
    fn test_render_report_groups_metrics_by_category() {
        let mut entry = analyzed(report("labs.pdf", 1), 70);
        let analysis = entry.analysis.as_mut().unwrap();
        let metric = |name: &str, category: &str| Metric {
            name: name.to_string(),
            value: "1".to_string(),
            unit: String::new(),
            status: MetricStatus::Good,
            normal_range: String::new(),
            category: category.to_string(),
        };
        analysis.metrics.push(metric("Hemoglobin", "Blood Count"));
        analysis.metrics.push(metric("HDL", "Lipids"));
        analysis.metrics.push(metric("Vitamin D", ""));

        let text = render_report(&entry);
        let lines: Vec<&str> = text.lines().collect();
        let at = |needle: &str| lines.iter().position(|l| l.contains(needle)).unwrap();

        assert_eq!(lines[at("Lipids (2)")], "  Lipids (2)");
        assert!(at("Lipids (2)") < at("LDL Cholesterol"));
        assert!(at("LDL Cholesterol") < at("HDL"));
        assert!(at("HDL") < at("Blood Count (1)"));
        assert!(at("Blood Count (1)") < at("Hemoglobin"));
        assert!(at("Other (1)") < at("Vitamin D"));
    }

    #[test]
    fn test_render_pending_report() {
        let text = render_report(&pending(report("labs.pdf", 1)));
        assert!(text.contains("Analysis in progress"));
    }

    #[test]
    fn test_history_marks_in_progress() {
        let text = render_history(&[pending(report("a.pdf", 1)), analyzed(report("b.pdf", 2), 35)]);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].ends_with("in progress"));
        assert!(lines[1].ends_with("35 Needs Attention"));
    }
}
