pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::agent::handlers as agent;
use crate::cv::MAX_CV_BYTES;
use crate::jobs::handlers as jobs;
use crate::state::AppState;

/// Request body cap: the CV limit plus room for the other form fields and
/// multipart framing. The blob store enforces the exact CV limit.
const BODY_LIMIT_BYTES: usize = MAX_CV_BYTES as usize + 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Jobs API
        .route("/jobs", get(jobs::handle_list_jobs))
        .route("/jobs/apply", post(jobs::handle_apply))
        .route(
            "/jobs/applied/:account_label",
            get(jobs::handle_applied_jobs),
        )
        .route("/jobs/upload-cv", post(jobs::handle_upload_cv))
        .route("/jobs/cvs/:account_label", get(jobs::handle_list_cvs))
        .route(
            "/jobs/download-cv/:filename",
            get(jobs::handle_download_cv),
        )
        // Agent proxy
        .route("/api/agent/chat", post(agent::handle_chat))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .with_state(state)
}
