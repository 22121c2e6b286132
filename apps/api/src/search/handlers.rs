use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info};

use crate::errors::AppError;
use crate::search::filters::SearchFilters;
use crate::search::relevance::{recommendations, search, SearchTarget};
use crate::state::AppState;
use crate::telemetry::{Metric, SEARCH_NAMESPACE};

fn default_action() -> String {
    "search_students".to_string()
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(default = "default_action")]
    pub action: String,
    #[serde(default)]
    pub query: String,
    /// Kept raw so that a wrongly-typed filter is reported as a 400.
    #[serde(default)]
    pub filters: Value,
    pub student_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub action: String,
    pub query: String,
    pub results: Value,
    pub total_results: usize,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Search(SearchTarget),
    Recommendations,
}

impl Action {
    fn parse(action: &str) -> Option<Self> {
        match action {
            "search_students" => Some(Action::Search(SearchTarget::Students)),
            "search_jobs" => Some(Action::Search(SearchTarget::Jobs)),
            "get_recommendations" => Some(Action::Recommendations),
            _ => None,
        }
    }
}

/// POST /api/v1/search
pub async fn handle_search(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<QueryResponse>, AppError> {
    let Json(body) = payload?;
    let request: QueryRequest = serde_json::from_value(body)
        .map_err(|e| AppError::Validation(format!("Invalid request: {e}")))?;
    let action = Action::parse(&request.action)
        .ok_or_else(|| AppError::Validation(format!("Invalid action: {}", request.action)))?;
    let filters = SearchFilters::from_value(&request.filters)
        .map_err(|e| AppError::Validation(format!("Invalid filters: {e}")))?;

    info!(
        action = %request.action,
        query = %request.query,
        filters = %request.filters,
        "search request"
    );

    let index = state.index.load();
    let (results, total_results) = match action {
        Action::Search(target) => {
            let query = request.query.clone();
            let outcome = tokio::task::spawn_blocking(move || search(&index, &query, &filters, target))
                .await
                .map_err(|e| e.to_string())
                .and_then(|hits| {
                    let total = hits.len();
                    serde_json::to_value(hits)
                        .map(|value| (value, total))
                        .map_err(|e| e.to_string())
                });
            match outcome {
                Ok(found) => found,
                Err(e) => {
                    // Search failures degrade to an empty result set.
                    error!("search failed: {e}");
                    state
                        .telemetry
                        .emit(SEARCH_NAMESPACE, &[Metric::count("SearchErrors", 1)]);
                    (json!([]), 0)
                }
            }
        }
        Action::Recommendations => {
            let student_id = request
                .student_id
                .clone()
                .filter(|id| !id.trim().is_empty())
                .ok_or_else(|| {
                    AppError::Validation("student_id is required for recommendations".to_string())
                })?;
            let recs = tokio::task::spawn_blocking(move || recommendations(&index, &student_id))
                .await
                .map_err(|e| {
                    state
                        .telemetry
                        .emit(SEARCH_NAMESPACE, &[Metric::count("SearchErrors", 1)]);
                    anyhow::anyhow!("recommendation worker failed: {e}")
                })?;
            let total = recs.total();
            (
                serde_json::to_value(recs).map_err(anyhow::Error::from)?,
                total,
            )
        }
    };

    state.telemetry.emit(
        SEARCH_NAMESPACE,
        &[
            Metric::count("SearchRequests", 1),
            Metric::count("SearchResults", total_results),
        ],
    );

    Ok(Json(QueryResponse {
        action: request.action,
        query: request.query,
        results,
        total_results,
        timestamp: Utc::now().to_rfc3339(),
    }))
}
