use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Upstream system a batch was fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    /// Student information system. System of record for identity fields.
    Oracle,
    /// HR / careers platform. Students and job postings.
    Workday,
    /// Engagement analytics. Enrichment only.
    Tableau,
}

impl SourceId {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::Oracle => "oracle",
            SourceId::Workday => "workday",
            SourceId::Tableau => "tableau",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "oracle" => Some(SourceId::Oracle),
            "workday" => Some(SourceId::Workday),
            "tableau" => Some(SourceId::Tableau),
            _ => None,
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Student,
    Course,
    Enrollment,
    AcademicRecord,
    AcademicProgram,
    JobPosting,
    StudentAnalytics,
    JobMarketTrend,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Student => "student",
            RecordKind::Course => "course",
            RecordKind::Enrollment => "enrollment",
            RecordKind::AcademicRecord => "academic_record",
            RecordKind::AcademicProgram => "academic_program",
            RecordKind::JobPosting => "job_posting",
            RecordKind::StudentAnalytics => "student_analytics",
            RecordKind::JobMarketTrend => "job_market_trend",
        }
    }

    /// Kinds that describe a student and take part in profile unification.
    pub fn is_student_facing(&self) -> bool {
        matches!(self, RecordKind::Student | RecordKind::StudentAnalytics)
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One un-normalized row as handed over by a fetch client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    pub source_id: SourceId,
    pub record_kind: RecordKind,
    pub fields: Map<String, Value>,
}

/// A fully-materialized batch for one (source, kind) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawBatch {
    pub source_id: SourceId,
    pub record_kind: RecordKind,
    #[serde(default)]
    pub records: Vec<Map<String, Value>>,
}

impl RawBatch {
    pub fn into_records(self) -> Vec<RawRecord> {
        let (source_id, record_kind) = (self.source_id, self.record_kind);
        self.records
            .into_iter()
            .map(|fields| RawRecord {
                source_id,
                record_kind,
                fields,
            })
            .collect()
    }
}

/// A normalized cell value. `Missing` is the explicit marker that replaces
/// anything malformed; it serializes as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Missing,
    Number(f64),
    Date(NaiveDate),
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }

    /// Missing, or text or a list that normalized down to nothing.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Missing => true,
            FieldValue::Text(s) => s.is_empty(),
            FieldValue::List(items) => items.is_empty(),
            _ => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// String form used by pattern rules and duplicate detection.
    pub fn to_plain_string(&self) -> String {
        match self {
            FieldValue::Missing => String::new(),
            FieldValue::Number(n) => format_number(*n),
            FieldValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::List(items) => items.join(","),
        }
    }

    /// Stable key distinguishing values of different shapes.
    pub fn canonical_key(&self) -> String {
        match self {
            FieldValue::Missing => "m:".to_string(),
            FieldValue::Number(n) => format!("n:{}", format_number(*n)),
            FieldValue::Date(d) => format!("d:{d}"),
            FieldValue::Text(s) => format!("t:{s}"),
            FieldValue::List(items) => format!("l:{}", items.join("\u{1f}")),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// A raw record after normalization and validation substitution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanedRecord {
    pub source_id: SourceId,
    pub record_kind: RecordKind,
    pub fields: BTreeMap<String, FieldValue>,
    /// Stamped after cleaning; excluded from duplicate detection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transformed_at: Option<DateTime<Utc>>,
}

impl CleanedRecord {
    pub fn new(source_id: SourceId, record_kind: RecordKind) -> Self {
        Self {
            source_id,
            record_kind,
            fields: BTreeMap::new(),
            transformed_at: None,
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field)
            .and_then(FieldValue::as_text)
            .filter(|s| !s.is_empty())
    }

    pub fn number(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(FieldValue::as_number)
    }

    pub fn list(&self, field: &str) -> &[String] {
        self.get(field).and_then(FieldValue::as_list).unwrap_or(&[])
    }

    pub fn set(&mut self, field: &str, value: FieldValue) {
        self.fields.insert(field.to_string(), value);
    }

    pub fn data_source(&self) -> &'static str {
        self.source_id.as_str()
    }
}
