pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::reports::handlers;
use crate::reports::upload::{MAX_UPLOAD_BYTES, MULTIPART_OVERHEAD_BYTES};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health::health_handler))
        .route(
            "/api/reports/upload",
            post(handlers::handle_upload)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD_BYTES)),
        )
        .route("/api/reports", get(handlers::handle_list_reports))
        .route("/api/reports/:id", get(handlers::handle_get_report))
        .with_state(state)
}
