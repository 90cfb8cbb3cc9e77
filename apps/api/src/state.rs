use std::sync::Arc;

use crate::config::Config;
use crate::jobs::AnalysisQueue;
use crate::store::ReportStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ReportStore>,
    /// Upload handler enqueues one analysis job per accepted report.
    pub queue: AnalysisQueue,
    pub config: Config,
}
