use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};
use uuid::Uuid;

use crate::cleaning::quality::QualityReport;
use crate::errors::AppError;
use crate::models::record::RawBatch;
use crate::pipeline::persist::persist;
use crate::pipeline::run_pipeline;
use crate::state::AppState;
use crate::storage::load_index;
use crate::telemetry::{Metric, PIPELINE_NAMESPACE};

#[derive(Debug, Deserialize)]
pub struct PipelineRunRequest {
    #[serde(default)]
    pub batches: Vec<RawBatch>,
}

#[derive(Debug, Serialize)]
pub struct PipelineRunResponse {
    pub run_id: Uuid,
    pub index_created_at: DateTime<Utc>,
    pub index_records: usize,
    pub quality_reports: Vec<QualityReport>,
    pub profiles_unified: usize,
    pub profiles_excluded: usize,
    pub job_recommendations: usize,
    pub course_recommendations: usize,
}

#[derive(Debug, Serialize)]
pub struct IndexReloadResponse {
    pub total_records: usize,
    pub index_created_at: DateTime<Utc>,
}

/// Runs the pipeline, persists its outputs, then swaps the served index.
/// The served index is left untouched if any step fails.
pub async fn execute_run(state: &AppState, batches: Vec<RawBatch>) -> Result<PipelineRunResponse, AppError> {
    let run_id = Uuid::new_v4();
    let started = Instant::now();
    info!(%run_id, batches = batches.len(), "pipeline run started");

    let result = run_and_persist(state, batches).await;
    let elapsed = started.elapsed().as_secs_f64();

    match result {
        Ok(output) => {
            state.telemetry.emit(
                PIPELINE_NAMESPACE,
                &[
                    Metric::count("RecordsExtracted", output.records_extracted()),
                    Metric::count("DataSourcesProcessed", output.sources_processed()),
                    Metric::count("RecordsTransformed", output.records_transformed()),
                    Metric::seconds("PipelineExecutionTime", elapsed),
                    Metric::count("PipelineSuccess", 1),
                ],
            );

            let response = PipelineRunResponse {
                run_id,
                index_created_at: output.index.index_created_at,
                index_records: output.index.total_records,
                quality_reports: output.quality_reports,
                profiles_unified: output.unified.profiles.len(),
                profiles_excluded: output.unified.excluded,
                job_recommendations: output.job_recommendations.len(),
                course_recommendations: output.course_recommendations.len(),
            };
            state.index.swap(output.index);
            info!(%run_id, elapsed_secs = elapsed, index_records = response.index_records, "pipeline run completed");
            Ok(response)
        }
        Err(e) => {
            error!(%run_id, "pipeline run failed: {e}");
            state.telemetry.emit(
                PIPELINE_NAMESPACE,
                &[
                    Metric::seconds("PipelineExecutionTime", elapsed),
                    Metric::count("PipelineSuccess", 0),
                ],
            );
            Err(e)
        }
    }
}

async fn run_and_persist(
    state: &AppState,
    batches: Vec<RawBatch>,
) -> Result<crate::pipeline::PipelineOutput, AppError> {
    let scorer = state.scorer.clone();
    let priority = state.config.source_priority.clone();
    let run_at = Utc::now();

    let output = tokio::task::spawn_blocking(move || run_pipeline(batches, &priority, scorer.as_ref(), run_at))
        .await
        .map_err(|e| anyhow::anyhow!("pipeline worker failed: {e}"))?;

    persist(
        state.store.as_ref(),
        &output,
        &state.config.processed_prefix,
        &state.config.search_index_key,
    )
    .await?;
    Ok(output)
}

/// POST /api/v1/pipeline/run
pub async fn handle_pipeline_run(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PipelineRunResponse>, AppError> {
    let Json(body) = payload?;
    let request: PipelineRunRequest = serde_json::from_value(body)
        .map_err(|e| AppError::Validation(format!("Invalid pipeline request: {e}")))?;
    Ok(Json(execute_run(&state, request.batches).await?))
}

/// POST /api/v1/index/reload
pub async fn handle_index_reload(
    State(state): State<AppState>,
) -> Result<Json<IndexReloadResponse>, AppError> {
    let index = load_index(state.store.as_ref(), &state.config.search_index_key).await;
    let response = IndexReloadResponse {
        total_records: index.total_records,
        index_created_at: index.index_created_at,
    };
    state.index.swap(index);
    Ok(Json(response))
}
