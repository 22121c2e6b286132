pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::pipeline::handlers as pipeline;
use crate::search::handlers as search;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Query boundary
        .route("/api/v1/search", post(search::handle_search))
        // Batch runs
        .route("/api/v1/pipeline/run", post(pipeline::handle_pipeline_run))
        .route("/api/v1/index/reload", post(pipeline::handle_index_reload))
        .with_state(state)
}
