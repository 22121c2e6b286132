//! End-to-end batch run: clean, score, unify, match, index.
//!
//! `run_pipeline` is pure and CPU-bound; `handlers` runs it on the blocking
//! pool, then `persist` writes its outputs to the blob store.

pub mod handlers;
pub mod persist;

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::cleaning::cleaner;
use crate::cleaning::quality::{self, QualityReport};
use crate::matching::course::recommend_courses;
use crate::matching::job::{recommend_jobs, MatchScorer};
use crate::models::opportunity::{CourseOffering, JobPosting, Opportunity, Recommendation};
use crate::models::record::{CleanedRecord, RawBatch, RawRecord, RecordKind, SourceId};
use crate::models::search::SearchIndex;
use crate::search::builder;
use crate::unify::{unify, SourcePriority, UnifyOutcome};

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub run_at: DateTime<Utc>,
    /// Cleaned datasets keyed by `(source, kind)`.
    pub cleaned: BTreeMap<(SourceId, RecordKind), Vec<CleanedRecord>>,
    /// One per `(source, kind)` batch received, empty batches included.
    pub quality_reports: Vec<QualityReport>,
    pub unified: UnifyOutcome,
    pub job_recommendations: Vec<Recommendation>,
    pub course_recommendations: Vec<Recommendation>,
    pub index: SearchIndex,
}

impl PipelineOutput {
    pub fn records_extracted(&self) -> usize {
        self.quality_reports.iter().map(|r| r.total_records).sum()
    }

    pub fn records_transformed(&self) -> usize {
        self.cleaned.values().map(Vec::len).sum()
    }

    pub fn sources_processed(&self) -> usize {
        self.cleaned
            .iter()
            .filter(|(_, records)| !records.is_empty())
            .map(|((source, _), _)| *source)
            .collect::<HashSet<_>>()
            .len()
    }
}

/// Runs every stage over the given batches. Batches sharing a `(source, kind)`
/// are concatenated first. An empty batch is reported with score 0 and
/// otherwise skipped.
pub fn run_pipeline(
    batches: Vec<RawBatch>,
    priority: &SourcePriority,
    scorer: &dyn MatchScorer,
    run_at: DateTime<Utc>,
) -> PipelineOutput {
    let mut raw_by_key: BTreeMap<(SourceId, RecordKind), Vec<RawRecord>> = BTreeMap::new();
    for batch in batches {
        raw_by_key
            .entry((batch.source_id, batch.record_kind))
            .or_default()
            .extend(batch.into_records());
    }

    let mut cleaned = BTreeMap::new();
    let mut quality_reports = Vec::with_capacity(raw_by_key.len());
    for ((source, kind), raw) in &raw_by_key {
        if raw.is_empty() {
            warn!(source = %source, kind = %kind, "empty batch, source skipped");
        }
        let mut records = cleaner::clean(*kind, raw);
        for record in &mut records {
            record.transformed_at = Some(run_at);
        }

        let mut report = quality::score(&records, *kind);
        report.source_id = Some(*source);
        info!(
            source = %source,
            kind = %kind,
            records = records.len(),
            quality_score = report.quality_score,
            "dataset transformed"
        );
        quality_reports.push(report);
        cleaned.insert((*source, *kind), records);
    }

    let mut by_source: BTreeMap<SourceId, Vec<CleanedRecord>> = BTreeMap::new();
    for ((source, kind), records) in &cleaned {
        if kind.is_student_facing() {
            by_source
                .entry(*source)
                .or_default()
                .extend(records.iter().cloned());
        }
    }
    let unified = unify(&by_source, priority);

    let (jobs, courses) = collect_opportunities(&cleaned);
    let job_recommendations = recommend_jobs(scorer, &unified.profiles, &jobs);
    let course_recommendations = recommend_courses(&unified.profiles);

    let opportunities: Vec<Opportunity> = jobs
        .into_iter()
        .map(Opportunity::Job)
        .chain(courses.into_iter().map(Opportunity::Course))
        .collect();
    let index = builder::build(&unified.profiles, &opportunities, &job_recommendations, run_at);

    PipelineOutput {
        run_at,
        cleaned,
        quality_reports,
        unified,
        job_recommendations,
        course_recommendations,
        index,
    }
}

/// Job postings and courses in dataset order. A repeated id keeps its first
/// occurrence.
fn collect_opportunities(
    cleaned: &BTreeMap<(SourceId, RecordKind), Vec<CleanedRecord>>,
) -> (Vec<JobPosting>, Vec<CourseOffering>) {
    let mut seen_jobs = HashSet::new();
    let mut seen_courses = HashSet::new();
    let mut jobs = Vec::new();
    let mut courses = Vec::new();

    for records in cleaned.values() {
        for record in records {
            if let Some(job) = JobPosting::from_cleaned(record) {
                if seen_jobs.insert(job.job_id.clone()) {
                    jobs.push(job);
                }
            } else if let Some(course) = CourseOffering::from_cleaned(record) {
                if seen_courses.insert(course.course_id.clone()) {
                    courses.push(course);
                }
            }
        }
    }
    (jobs, courses)
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::matching::job::KeywordMatchScorer;
    use crate::models::opportunity::Priority;

    fn batch(source: SourceId, kind: RecordKind, records: Value) -> RawBatch {
        serde_json::from_value(json!({
            "source_id": source,
            "record_kind": kind,
            "records": records,
        }))
        .unwrap()
    }

    pub(crate) fn sample_batches() -> Vec<RawBatch> {
        vec![
            batch(
                SourceId::Oracle,
                RecordKind::Student,
                json!([
                    {"student_id": "STU001", "first_name": "john", "last_name": "doe",
                     "email": "john@example.com", "gpa": 3.8, "academic_program": "computer science"},
                    {"student_id": "bad", "first_name": "x", "last_name": "y",
                     "email": "x@example.com", "gpa": 3.0, "academic_program": "Mathematics"}
                ]),
            ),
            batch(
                SourceId::Tableau,
                RecordKind::StudentAnalytics,
                json!([
                    {"student_id": "STU001", "performance_score": 88.5, "engagement_level": "High",
                     "skill_gaps": ["SQL", "Docker"], "recommended_courses": ["CS301", "CS401"],
                     "career_interest": "Software Engineering"}
                ]),
            ),
            batch(
                SourceId::Workday,
                RecordKind::JobPosting,
                json!([
                    {"job_posting_id": "JOB001", "job_title": "software engineer", "company": "tech corp",
                     "location": "san francisco", "required_skills": "Python Programming, SQL, Docker",
                     "salary_range": "$80k-$120k"}
                ]),
            ),
            batch(
                SourceId::Oracle,
                RecordKind::Course,
                json!([{"course_code": "cs301", "course_name": "databases"}]),
            ),
            batch(SourceId::Workday, RecordKind::Student, json!([])),
        ]
    }

    #[test]
    fn test_full_run_produces_profiles_recommendations_and_index() {
        let run_at = Utc::now();
        let output = run_pipeline(
            sample_batches(),
            &SourcePriority::default(),
            &KeywordMatchScorer::default(),
            run_at,
        );

        assert_eq!(output.unified.profiles.len(), 1);
        assert_eq!(output.unified.excluded, 1);
        let profile = &output.unified.profiles[0];
        assert_eq!(profile.full_name(), Some("john doe"));
        assert_eq!(profile.performance_score(), Some(88.5));

        assert_eq!(output.job_recommendations.len(), 1);
        let rec = &output.job_recommendations[0];
        assert_eq!(rec.opportunity_id, "JOB001");
        assert_eq!(rec.match_score, 0.7);

        assert_eq!(output.course_recommendations.len(), 2);
        assert!(output
            .course_recommendations
            .iter()
            .all(|r| r.priority == Some(Priority::Medium)));

        // 1 student + 1 job + 1 course
        assert_eq!(output.index.total_records, 3);
        assert_eq!(output.index.index_created_at, run_at);
        let job = output.index.jobs().next().unwrap();
        assert_eq!(job.match_score, 0.7);
        assert_eq!(job.salary_range.as_deref(), Some("80k-120k"));
    }

    #[test]
    fn test_empty_batch_reported_with_zero_score() {
        let output = run_pipeline(
            sample_batches(),
            &SourcePriority::default(),
            &KeywordMatchScorer::default(),
            Utc::now(),
        );
        let report = output
            .quality_reports
            .iter()
            .find(|r| r.source_id == Some(SourceId::Workday) && r.record_kind == RecordKind::Student)
            .unwrap();
        assert_eq!(report.total_records, 0);
        assert_eq!(report.quality_score, 0.0);
        assert_eq!(output.quality_reports.len(), 5);
    }

    #[test]
    fn test_counts_and_run_stamp() {
        let run_at = Utc::now();
        let output = run_pipeline(
            sample_batches(),
            &SourcePriority::default(),
            &KeywordMatchScorer::default(),
            run_at,
        );
        assert_eq!(output.records_extracted(), 5);
        assert_eq!(output.records_transformed(), 5);
        assert_eq!(output.sources_processed(), 3);
        assert!(output
            .cleaned
            .values()
            .flatten()
            .all(|r| r.transformed_at == Some(run_at)));
    }

    #[test]
    fn test_no_batches_builds_empty_index() {
        let output = run_pipeline(
            Vec::new(),
            &SourcePriority::default(),
            &KeywordMatchScorer::default(),
            Utc::now(),
        );
        assert!(output.index.is_empty());
        assert!(output.quality_reports.is_empty());
    }
}
