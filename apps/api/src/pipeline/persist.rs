use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::models::record::{FieldValue, SourceId};
use crate::pipeline::PipelineOutput;
use crate::storage::{dataset_key, put_json, BlobStore, StorageError};

/// Pseudo-source under which cross-source datasets are written.
pub const UNIFIED_DATASETS: &str = "unified";

/// One dataset row as written to the lake: the cleaned fields plus run
/// metadata.
#[derive(Serialize)]
struct DatasetRow<'a> {
    #[serde(flatten)]
    fields: &'a BTreeMap<String, FieldValue>,
    data_source: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    transformed_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct ProfileRow<'a> {
    student_id: &'a str,
    #[serde(flatten)]
    fields: &'a BTreeMap<String, FieldValue>,
    sources: &'a [SourceId],
}

/// Writes every cleaned dataset and the unified datasets, then the index.
/// Returns the keys written, index last.
pub async fn persist(
    store: &dyn BlobStore,
    output: &PipelineOutput,
    processed_prefix: &str,
    index_key: &str,
) -> Result<Vec<String>, StorageError> {
    let mut written = Vec::new();

    for ((source, kind), records) in &output.cleaned {
        if records.is_empty() {
            continue;
        }
        let rows: Vec<DatasetRow<'_>> = records
            .iter()
            .map(|r| DatasetRow {
                fields: &r.fields,
                data_source: r.data_source(),
                transformed_at: r.transformed_at,
            })
            .collect();
        let key = dataset_key(processed_prefix, source.as_str(), kind.as_str(), output.run_at);
        put_json(store, &key, &rows).await?;
        written.push(key);
    }

    let profiles: Vec<ProfileRow<'_>> = output
        .unified
        .profiles
        .iter()
        .map(|p| ProfileRow {
            student_id: &p.student_id,
            fields: &p.fields,
            sources: &p.sources,
        })
        .collect();
    let unified: [(&str, serde_json::Value); 3] = [
        ("student_profiles", serde_json::to_value(&profiles)?),
        ("job_recommendations", serde_json::to_value(&output.job_recommendations)?),
        ("course_recommendations", serde_json::to_value(&output.course_recommendations)?),
    ];
    for (dataset, rows) in &unified {
        let key = dataset_key(processed_prefix, UNIFIED_DATASETS, dataset, output.run_at);
        put_json(store, &key, rows).await?;
        written.push(key);
    }

    put_json(store, index_key, &output.index).await?;
    written.push(index_key.to_string());

    info!(
        backend = store.backend(),
        objects = written.len(),
        "pipeline outputs persisted"
    );
    Ok(written)
}
