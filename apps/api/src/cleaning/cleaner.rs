//! Turns raw upstream rows into `CleanedRecord`s.
//!
//! Dispatch is a static table keyed by `(SourceId, RecordKind)`. Each entry
//! declares which fields are numeric, dates or lists, plus an optional
//! kind-specific transform run after generic normalization. A source-agnostic
//! entry (`source: None`) is the fallback for a kind.
//!
//! Failure policy: a bad field becomes `FieldValue::Missing`; a record is never
//! dropped for field-level problems.

use rayon::prelude::*;
use serde_json::Value;
use tracing::{info, warn};

use crate::cleaning::normalize::{
    clean_salary_range, clean_text_value, coerce_number, parse_date, split_list,
    title_case,
};
use crate::cleaning::validation::{apply_rule, clean_gpa, STUDENT_RULES};
use crate::models::record::{CleanedRecord, FieldValue, RawRecord, RecordKind, SourceId};

type KindTransform = fn(&RawRecord, &mut CleanedRecord);

struct TransformSpec {
    source: Option<SourceId>,
    kind: RecordKind,
    numeric: &'static [&'static str],
    dates: &'static [&'static str],
    lists: &'static [&'static str],
    transform: Option<KindTransform>,
}

const STUDENT_DATES: &[&str] = &["enrollment_date", "graduation_date", "expected_graduation"];

static TRANSFORMS: &[TransformSpec] = &[
    TransformSpec {
        source: Some(SourceId::Workday),
        kind: RecordKind::Student,
        numeric: &[],
        dates: STUDENT_DATES,
        lists: &[],
        transform: Some(transform_workday_student),
    },
    TransformSpec {
        source: None,
        kind: RecordKind::Student,
        numeric: &[],
        dates: STUDENT_DATES,
        lists: &[],
        transform: Some(transform_student),
    },
    TransformSpec {
        source: None,
        kind: RecordKind::Course,
        numeric: &["credits"],
        dates: &[],
        lists: &["prerequisites", "target_skill_gaps"],
        transform: Some(transform_course),
    },
    TransformSpec {
        source: None,
        kind: RecordKind::Enrollment,
        numeric: &["year"],
        dates: &["enrollment_date"],
        lists: &[],
        transform: Some(transform_enrollment),
    },
    TransformSpec {
        source: None,
        kind: RecordKind::AcademicRecord,
        numeric: &["total_credits", "year"],
        dates: &[],
        lists: &["honors"],
        transform: Some(transform_academic_record),
    },
    TransformSpec {
        source: None,
        kind: RecordKind::AcademicProgram,
        numeric: &["credits_required", "duration_years"],
        dates: &[],
        lists: &[],
        transform: Some(transform_academic_program),
    },
    TransformSpec {
        source: None,
        kind: RecordKind::JobPosting,
        numeric: &["openings"],
        dates: &["posting_date", "closing_date"],
        lists: &["required_skills", "preferred_skills"],
        transform: Some(transform_job_posting),
    },
    TransformSpec {
        source: None,
        kind: RecordKind::StudentAnalytics,
        numeric: &[
            "performance_score",
            "study_hours",
            "assignment_completion_rate",
            "quiz_average",
            "participation_score",
        ],
        dates: &[],
        lists: &["skill_gaps", "recommended_courses"],
        transform: None,
    },
    TransformSpec {
        source: None,
        kind: RecordKind::JobMarketTrend,
        numeric: &[
            "demand_score",
            "salary_impact",
            "growth_rate",
            "job_postings_count",
            "average_salary",
        ],
        dates: &[],
        lists: &[],
        transform: None,
    },
];

fn lookup(source: SourceId, kind: RecordKind) -> Option<&'static TransformSpec> {
    TRANSFORMS
        .iter()
        .find(|t| t.kind == kind && t.source == Some(source))
        .or_else(|| TRANSFORMS.iter().find(|t| t.kind == kind && t.source.is_none()))
}

/// Cleans every record of one kind. Records are independent, so the work fans
/// out across the rayon pool; output order matches input order.
pub fn clean(record_kind: RecordKind, raw_records: &[RawRecord]) -> Vec<CleanedRecord> {
    if raw_records.is_empty() {
        warn!(kind = %record_kind, "empty batch, nothing to clean");
        return Vec::new();
    }

    let cleaned: Vec<CleanedRecord> = raw_records
        .par_iter()
        .map(|raw| clean_record(record_kind, raw))
        .collect();

    info!(kind = %record_kind, records = cleaned.len(), "cleaned batch");
    cleaned
}

pub fn clean_record(record_kind: RecordKind, raw: &RawRecord) -> CleanedRecord {
    let entry = lookup(raw.source_id, record_kind);
    let mut record = CleanedRecord::new(raw.source_id, record_kind);

    for (name, value) in &raw.fields {
        let cleaned = match entry {
            Some(s) if s.numeric.contains(&name.as_str()) => {
                coerce_number(value).map_or(FieldValue::Missing, FieldValue::Number)
            }
            Some(s) if s.dates.contains(&name.as_str()) => {
                parse_date(value).map_or(FieldValue::Missing, FieldValue::Date)
            }
            Some(s) if s.lists.contains(&name.as_str()) => FieldValue::List(split_list(value)),
            _ => infer_value(value),
        };
        record.fields.insert(name.clone(), cleaned);
    }

    if let Some(transform) = entry.and_then(|s| s.transform) {
        transform(raw, &mut record);
    }
    record
}

/// Normalization for fields no table entry mentions.
fn infer_value(value: &Value) -> FieldValue {
    match value {
        Value::Null => FieldValue::Missing,
        Value::Number(n) => n
            .as_f64()
            .filter(|f| f.is_finite())
            .map_or(FieldValue::Missing, FieldValue::Number),
        Value::Array(_) => FieldValue::List(split_list(value)),
        Value::String(_) | Value::Bool(_) | Value::Object(_) => {
            FieldValue::Text(clean_text_value(value))
        }
    }
}

fn map_text(record: &mut CleanedRecord, field: &str, f: impl Fn(&str) -> String) {
    if let Some(FieldValue::Text(current)) = record.fields.get(field) {
        let mapped = f(current);
        record.set(field, FieldValue::Text(mapped));
    }
}

/// Identity validation plus the derived `full_name`. Invalid identity values
/// are nulled out; the record itself is kept.
fn transform_student(_raw: &RawRecord, record: &mut CleanedRecord) {
    for field in ["student_id", "email", "academic_program"] {
        apply_rule(&mut record.fields, &STUDENT_RULES[field]);
    }
    if let Some(gpa) = record.fields.get("gpa") {
        let cleaned = clean_gpa(gpa);
        record.set("gpa", cleaned);
    }

    let first = record.text("first_name").map(str::to_string);
    let last = record.text("last_name").map(str::to_string);
    if let (Some(first), Some(last)) = (first, last) {
        record.set("full_name", FieldValue::Text(format!("{first} {last}")));
    }
}

fn transform_workday_student(raw: &RawRecord, record: &mut CleanedRecord) {
    map_text(record, "student_id", |s| s.trim().to_uppercase());
    if let Some(expected) = record.fields.remove("expected_graduation") {
        record.fields.entry("graduation_date".to_string()).or_insert(expected);
    }
    transform_student(raw, record);
}

fn transform_course(_raw: &RawRecord, record: &mut CleanedRecord) {
    map_text(record, "course_code", |s| s.trim().to_uppercase());
    map_text(record, "course_name", title_case);
}

fn transform_enrollment(_raw: &RawRecord, record: &mut CleanedRecord) {
    map_text(record, "grade", |s| s.trim().to_uppercase());
}

fn transform_academic_record(_raw: &RawRecord, record: &mut CleanedRecord) {
    if let Some(gpa) = record.fields.get("gpa") {
        let cleaned = clean_gpa(gpa);
        record.set("gpa", cleaned);
    }
}

fn transform_academic_program(_raw: &RawRecord, record: &mut CleanedRecord) {
    map_text(record, "program_name", title_case);
    map_text(record, "program_code", |s| s.trim().to_uppercase());
}

fn transform_job_posting(raw: &RawRecord, record: &mut CleanedRecord) {
    for field in ["job_title", "company", "location"] {
        map_text(record, field, title_case);
    }
    if let Some(salary) = raw.fields.get("salary_range") {
        record.set("salary_range", FieldValue::Text(clean_salary_range(salary)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::{json, Map};

    fn raw(source_id: SourceId, record_kind: RecordKind, fields: Value) -> RawRecord {
        let fields: Map<String, Value> = match fields {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        };
        RawRecord {
            source_id,
            record_kind,
            fields,
        }
    }

    fn student(fields: Value) -> RawRecord {
        raw(SourceId::Oracle, RecordKind::Student, fields)
    }

    #[test]
    fn test_student_scenario_from_source_system() {
        let record = clean_record(
            RecordKind::Student,
            &student(json!({
                "student_id": "STU001",
                "first_name": "john",
                "last_name": "doe",
                "email": "john@example.com",
                "gpa": 5.0,
                "academic_program": "computer science"
            })),
        );

        assert_eq!(record.text("academic_program"), Some("Computer Science"));
        assert_eq!(record.get("gpa"), Some(&FieldValue::Missing));
        assert_eq!(record.text("full_name"), Some("john doe"));
        assert_eq!(record.text("first_name"), Some("john"));
        assert_eq!(record.text("email"), Some("john@example.com"));
        assert_eq!(record.text("student_id"), Some("STU001"));
    }

    #[test]
    fn test_invalid_identity_fields_are_nulled_not_dropped() {
        let records = clean(
            RecordKind::Student,
            &[
                student(json!({"student_id": "STU002", "email": "jane@example.com", "gpa": 3.8})),
                student(json!({"student_id": "invalid_id", "email": "invalid-email", "gpa": "n/a"})),
            ],
        );

        assert_eq!(records.len(), 2);
        let bad = &records[1];
        assert_eq!(bad.get("student_id"), Some(&FieldValue::Missing));
        assert_eq!(bad.get("email"), Some(&FieldValue::Missing));
        assert_eq!(bad.get("gpa"), Some(&FieldValue::Missing));
        assert_eq!(records[0].number("gpa"), Some(3.8));
    }

    #[test]
    fn test_full_name_requires_both_parts() {
        let record = clean_record(
            RecordKind::Student,
            &student(json!({"student_id": "STU003", "first_name": "Bob", "last_name": "  "})),
        );
        assert!(record.get("full_name").is_none());
    }

    #[test]
    fn test_oracle_student_id_is_case_sensitive_but_workday_uppercases() {
        let oracle = clean_record(RecordKind::Student, &student(json!({"student_id": "stu004"})));
        assert_eq!(oracle.get("student_id"), Some(&FieldValue::Missing));

        let workday = clean_record(
            RecordKind::Student,
            &raw(
                SourceId::Workday,
                RecordKind::Student,
                json!({"student_id": " stu004 ", "expected_graduation": "2025-05-15"}),
            ),
        );
        assert_eq!(workday.text("student_id"), Some("STU004"));
        assert_eq!(
            workday.get("graduation_date"),
            Some(&FieldValue::Date(NaiveDate::from_ymd_opt(2025, 5, 15).unwrap()))
        );
        assert!(workday.get("expected_graduation").is_none());
    }

    #[test]
    fn test_unparseable_date_is_missing_not_today() {
        let record = clean_record(
            RecordKind::Student,
            &student(json!({"student_id": "STU005", "enrollment_date": "last fall"})),
        );
        assert_eq!(record.get("enrollment_date"), Some(&FieldValue::Missing));
    }

    #[test]
    fn test_job_posting_normalization() {
        let record = clean_record(
            RecordKind::JobPosting,
            &raw(
                SourceId::Workday,
                RecordKind::JobPosting,
                json!({
                    "job_posting_id": "JOB001",
                    "job_title": "software ENGINEER",
                    "company": "tech corp",
                    "location": "san francisco, ca",
                    "required_skills": "Python, AWS; Docker",
                    "salary_range": "$80,000 - $120,000",
                    "openings": "three"
                }),
            ),
        );

        assert_eq!(record.text("job_posting_id"), Some("JOB001"));
        assert_eq!(record.text("job_title"), Some("Software Engineer"));
        assert_eq!(record.text("company"), Some("Tech Corp"));
        assert_eq!(record.text("location"), Some("San Francisco Ca"));
        assert_eq!(record.list("required_skills"), ["Python", "AWS", "Docker"]);
        assert_eq!(record.text("salary_range"), Some("80000-120000"));
        assert_eq!(record.get("openings"), Some(&FieldValue::Missing));
    }

    #[test]
    fn test_course_code_uppercased_and_credits_coerced() {
        let record = clean_record(
            RecordKind::Course,
            &raw(
                SourceId::Oracle,
                RecordKind::Course,
                json!({"course_code": " cs101 ", "course_name": "intro to programming", "credits": "3"}),
            ),
        );
        assert_eq!(record.text("course_code"), Some("CS101"));
        assert_eq!(record.text("course_name"), Some("Intro To Programming"));
        assert_eq!(record.number("credits"), Some(3.0));
    }

    #[test]
    fn test_analytics_lists_and_scores() {
        let record = clean_record(
            RecordKind::StudentAnalytics,
            &raw(
                SourceId::Tableau,
                RecordKind::StudentAnalytics,
                json!({
                    "student_id": "STU001",
                    "performance_score": "85.5",
                    "skill_gaps": ["Machine Learning", "System Design"],
                    "recommended_courses": "ML101|CS201"
                }),
            ),
        );
        assert_eq!(record.number("performance_score"), Some(85.5));
        assert_eq!(record.list("skill_gaps"), ["Machine Learning", "System Design"]);
        assert_eq!(record.list("recommended_courses"), ["ML101", "CS201"]);
    }

    #[test]
    fn test_empty_batch_short_circuits() {
        assert!(clean(RecordKind::Student, &[]).is_empty());
    }

    #[test]
    fn test_unknown_fields_are_inferred() {
        let record = clean_record(
            RecordKind::Student,
            &student(json!({"student_id": "STU006", "status": " ACTIVE!! ", "notes": null, "age": 21})),
        );
        assert_eq!(record.text("status"), Some("ACTIVE"));
        assert_eq!(record.get("notes"), Some(&FieldValue::Missing));
        assert_eq!(record.number("age"), Some(21.0));
    }
}
