use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::cleaning::normalize::round_to;
use crate::models::record::{CleanedRecord, FieldValue, RecordKind, SourceId};

/// Share of distinct values above which a text field looks like free-text noise.
const UNIQUENESS_THRESHOLD: f64 = 0.8;
const UNIQUENESS_PENALTY: f64 = 0.05;
const DUPLICATE_WEIGHT: f64 = 0.1;

/// Advisory quality metadata for one cleaned batch. Never blocks processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub source_id: Option<SourceId>,
    pub record_kind: RecordKind,
    pub total_records: usize,
    pub completeness_ratio: f64,
    pub duplicate_ratio: f64,
    pub quality_score: f64,
    /// Text fields that drew the uniqueness penalty.
    pub penalized_fields: Vec<String>,
}

impl QualityReport {
    fn empty(source_id: Option<SourceId>, record_kind: RecordKind) -> Self {
        Self {
            source_id,
            record_kind,
            total_records: 0,
            completeness_ratio: 0.0,
            duplicate_ratio: 0.0,
            quality_score: 0.0,
            penalized_fields: Vec::new(),
        }
    }
}

/// Scores a batch:
/// `max(0, completeness - duplicate_ratio * 0.1 - 0.05 * penalized_text_fields)`,
/// rounded to 3 decimals.
///
/// Tracked fields are the union of field names across the batch; a record
/// lacking a tracked field counts that cell as missing. The uniqueness penalty
/// is a heuristic and will also hit legitimately diverse text such as names.
pub fn score(records: &[CleanedRecord], record_kind: RecordKind) -> QualityReport {
    let source_id = records.first().map(|r| r.source_id);
    let tracked: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| r.fields.keys().map(String::as_str))
        .collect();

    let total_cells = records.len() * tracked.len();
    if total_cells == 0 {
        return QualityReport {
            total_records: records.len(),
            ..QualityReport::empty(source_id, record_kind)
        };
    }

    let missing_cells: usize = records
        .iter()
        .map(|r| {
            tracked
                .iter()
                .filter(|f| r.get(f).map_or(true, FieldValue::is_missing))
                .count()
        })
        .sum();
    let completeness_ratio = 1.0 - missing_cells as f64 / total_cells as f64;

    let mut seen = HashSet::with_capacity(records.len());
    let duplicates = records
        .iter()
        .filter(|r| !seen.insert(record_key(r)))
        .count();
    let duplicate_ratio = duplicates as f64 / records.len() as f64;

    let penalized_fields: Vec<String> = tracked
        .iter()
        .filter(|f| is_noisy_text_field(records, f))
        .map(|f| f.to_string())
        .collect();
    let penalty = penalized_fields.len() as f64 * UNIQUENESS_PENALTY;

    let quality_score =
        round_to((completeness_ratio - duplicate_ratio * DUPLICATE_WEIGHT - penalty).max(0.0), 3);

    QualityReport {
        source_id,
        record_kind,
        total_records: records.len(),
        completeness_ratio,
        duplicate_ratio,
        quality_score,
        penalized_fields,
    }
}

fn record_key(record: &CleanedRecord) -> String {
    record
        .fields
        .iter()
        .map(|(name, value)| format!("{name}={}", value.canonical_key()))
        .collect::<Vec<_>>()
        .join("\u{1e}")
}

fn is_noisy_text_field(records: &[CleanedRecord], field: &str) -> bool {
    let values: Vec<&FieldValue> = records
        .iter()
        .filter_map(|r| r.get(field))
        .filter(|v| !v.is_missing())
        .collect();
    if values.is_empty() {
        return false;
    }
    let is_text = values
        .iter()
        .all(|v| matches!(v, FieldValue::Text(_) | FieldValue::List(_)));
    if !is_text {
        return false;
    }
    let distinct: HashSet<String> = values.iter().map(|v| v.canonical_key()).collect();
    distinct.len() as f64 / values.len() as f64 > UNIQUENESS_THRESHOLD
}
