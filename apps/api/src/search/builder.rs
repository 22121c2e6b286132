use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::models::opportunity::{Opportunity, OpportunityKind, Recommendation};
use crate::models::profile::UnifiedProfile;
use crate::models::search::{
    CourseSearchRecord, JobSearchRecord, SearchIndex, SearchRecord, StudentMatch,
    StudentSearchRecord,
};

/// `data_source` stamped on student records, which may merge several systems.
pub const UNIFIED_SOURCE: &str = "unified";

/// Flattens one run's outputs into a fresh index. Students come first, then
/// opportunities in input order.
///
/// Job recommendations annotate their job record with `student_matches`;
/// the record's `match_score` is the best of them, 0 when nobody matched.
/// Course recommendations are already carried by each student's
/// `recommended_courses`.
pub fn build(
    profiles: &[UnifiedProfile],
    opportunities: &[Opportunity],
    recommendations: &[Recommendation],
    index_created_at: DateTime<Utc>,
) -> SearchIndex {
    let mut matches_by_job: HashMap<&str, Vec<StudentMatch>> = HashMap::new();
    for rec in recommendations
        .iter()
        .filter(|r| r.opportunity_kind == OpportunityKind::Job)
    {
        matches_by_job
            .entry(rec.opportunity_id.as_str())
            .or_default()
            .push(StudentMatch {
                student_id: rec.student_id.clone(),
                match_score: rec.match_score,
                reasons: rec.reasons.clone(),
            });
    }

    let mut records: Vec<SearchRecord> = Vec::with_capacity(profiles.len() + opportunities.len());
    records.extend(profiles.iter().map(student_record));

    for opportunity in opportunities {
        let record = match opportunity {
            Opportunity::Job(job) => {
                let student_matches = matches_by_job.remove(job.job_id.as_str()).unwrap_or_default();
                let match_score = student_matches
                    .iter()
                    .map(|m| m.match_score)
                    .fold(0.0, f64::max);
                SearchRecord::JobPosting(JobSearchRecord {
                    job_posting_id: job.job_id.clone(),
                    job_title: non_empty(&job.title),
                    company: non_empty(&job.company),
                    location: non_empty(&job.location),
                    required_skills: job.required_skills.clone(),
                    preferred_skills: job.preferred_skills.clone(),
                    salary_range: non_empty(&job.salary_range),
                    match_score,
                    student_matches,
                    data_source: job.source_id.to_string(),
                })
            }
            Opportunity::Course(course) => SearchRecord::Course(CourseSearchRecord {
                course_id: course.course_id.clone(),
                course_name: course.name.clone(),
                target_skill_gaps: course.target_skill_gaps.clone(),
                data_source: course.source_id.to_string(),
            }),
        };
        records.push(record);
    }

    let index = SearchIndex::new(records, index_created_at);
    info!(total_records = index.total_records, "search index built");
    index
}

fn student_record(profile: &UnifiedProfile) -> SearchRecord {
    SearchRecord::StudentProfile(StudentSearchRecord {
        student_id: profile.student_id.clone(),
        full_name: profile.full_name().map(str::to_string),
        academic_program: profile.academic_program().map(str::to_string),
        gpa: profile.gpa(),
        performance_score: profile.performance_score(),
        engagement_level: profile.engagement_level().map(str::to_string),
        career_interest: profile.career_interest().map(str::to_string),
        skill_gaps: profile.skill_gaps().to_vec(),
        recommended_courses: profile.recommended_courses().to_vec(),
        status: profile.status().map(str::to_string),
        data_source: UNIFIED_SOURCE.to_string(),
    })
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::models::opportunity::{CourseOffering, JobPosting};
    use crate::models::record::{FieldValue, SourceId};

    fn profile(id: &str) -> UnifiedProfile {
        let mut fields = BTreeMap::new();
        fields.insert(
            "academic_program".to_string(),
            FieldValue::Text("Computer Science".to_string()),
        );
        fields.insert("gpa".to_string(), FieldValue::Missing);
        UnifiedProfile {
            student_id: id.to_string(),
            fields,
            sources: vec![SourceId::Oracle],
        }
    }

    fn job(id: &str) -> Opportunity {
        Opportunity::Job(JobPosting {
            job_id: id.to_string(),
            source_id: SourceId::Workday,
            title: "Software Engineer".to_string(),
            company: "Tech Corp".to_string(),
            location: String::new(),
            required_skills: vec!["Python".to_string()],
            preferred_skills: vec![],
            salary_range: "80k-120k".to_string(),
        })
    }

    fn job_rec(student: &str, job: &str, score: f64) -> Recommendation {
        Recommendation {
            student_id: student.to_string(),
            opportunity_id: job.to_string(),
            opportunity_kind: OpportunityKind::Job,
            match_score: score,
            reasons: vec!["Strong academic performance".to_string()],
            priority: None,
        }
    }

    #[test]
    fn test_one_record_per_profile_and_opportunity() {
        let course = Opportunity::Course(CourseOffering {
            course_id: "CS101".to_string(),
            source_id: SourceId::Oracle,
            name: "Intro To Programming".to_string(),
            target_skill_gaps: vec![],
        });
        let index = build(
            &[profile("STU001"), profile("STU002")],
            &[job("JOB001"), course],
            &[],
            Utc::now(),
        );

        let json = serde_json::to_value(&index.records).unwrap();
        let types: Vec<&str> = json
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["record_type"].as_str().unwrap())
            .collect();
        assert_eq!(types, vec!["student_profile", "student_profile", "job_posting", "course"]);
        assert_eq!(index.total_records, 4);
        assert_eq!(index.students().next().unwrap().data_source, "unified");
        assert_eq!(index.courses().next().unwrap().data_source, "oracle");
    }

    #[test]
    fn test_job_records_carry_best_match_and_student_matches() {
        let index = build(
            &[profile("STU001"), profile("STU002")],
            &[job("JOB001"), job("JOB002")],
            &[job_rec("STU001", "JOB001", 0.6), job_rec("STU002", "JOB001", 0.8)],
            Utc::now(),
        );
        let jobs: Vec<&JobSearchRecord> = index.jobs().collect();
        assert_eq!(jobs[0].match_score, 0.8);
        assert_eq!(jobs[0].student_matches.len(), 2);
        assert_eq!(jobs[0].match_for("STU001").unwrap().match_score, 0.6);
        assert_eq!(jobs[0].location, None);
        assert_eq!(jobs[0].data_source, "workday");

        assert_eq!(jobs[1].match_score, 0.0);
        assert!(jobs[1].student_matches.is_empty());
    }

    #[test]
    fn test_index_serializes_with_record_type_tags() {
        let index = build(&[profile("STU001")], &[job("JOB001")], &[], Utc::now());
        let json = serde_json::to_value(&index).unwrap();
        assert_eq!(json["total_records"], 2);
        assert_eq!(json["records"][0]["record_type"], "student_profile");
        assert_eq!(json["records"][0]["gpa"], serde_json::Value::Null);
        assert_eq!(json["records"][1]["record_type"], "job_posting");
        assert!(json["index_created_at"].is_string());
    }
}
