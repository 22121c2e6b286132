//! Relevance scoring over a `SearchIndex` snapshot. Read-only; safe to call
//! from any number of threads at once.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::search::{JobSearchRecord, SearchIndex, StudentSearchRecord};
use crate::search::filters::SearchFilters;

pub const MAX_RESULTS: usize = 50;
pub const MAX_JOB_RECOMMENDATIONS: usize = 10;
pub const MAX_COURSE_RECOMMENDATIONS: usize = 5;
pub const COURSE_RECOMMENDATION_REASON: &str = "Based on your skill gaps and career interests";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchTarget {
    Students,
    Jobs,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentHit {
    pub student_id: String,
    pub academic_program: Option<String>,
    pub gpa: Option<f64>,
    pub performance_score: Option<f64>,
    pub career_interest: Option<String>,
    pub skills: Vec<String>,
    pub relevance_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobHit {
    pub job_posting_id: String,
    pub job_title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub required_skills: Vec<String>,
    pub salary_range: Option<String>,
    pub match_score: f64,
    pub relevance_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SearchHit {
    Student(StudentHit),
    Job(JobHit),
}

impl SearchHit {
    pub fn relevance_score(&self) -> f64 {
        match self {
            SearchHit::Student(hit) => hit.relevance_score,
            SearchHit::Job(hit) => hit.relevance_score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRecommendation {
    pub job_posting_id: String,
    pub job_title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub required_skills: Vec<String>,
    pub salary_range: Option<String>,
    pub match_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseRecommendation {
    pub course_id: String,
    pub course_name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Recommendations {
    pub jobs: Vec<JobRecommendation>,
    pub courses: Vec<CourseRecommendation>,
}

impl Recommendations {
    pub fn total(&self) -> usize {
        self.jobs.len() + self.courses.len()
    }
}

/// Ranks records of one type against `query`.
///
/// Each field in the type's fixed list that contains the lower-cased query
/// adds 1.0, so an empty query matches every field. Filters gate afterwards.
/// Zero scores are dropped; ties keep index order; at most `MAX_RESULTS`.
pub fn search(
    index: &SearchIndex,
    query: &str,
    filters: &SearchFilters,
    target: SearchTarget,
) -> Vec<SearchHit> {
    let query = query.to_lowercase();
    let mut hits: Vec<SearchHit> = match target {
        SearchTarget::Students => index
            .students()
            .filter_map(|record| score_student(record, &query, filters))
            .map(SearchHit::Student)
            .collect(),
        SearchTarget::Jobs => index
            .jobs()
            .filter(|record| record.job_title.as_deref().is_some_and(|t| !t.is_empty()))
            .filter_map(|record| score_job(record, &query, filters))
            .map(SearchHit::Job)
            .collect(),
    };

    hits.sort_by(|a, b| b.relevance_score().total_cmp(&a.relevance_score()));
    hits.truncate(MAX_RESULTS);
    hits
}

fn text_score(query: &str, fields: &[&str]) -> f64 {
    fields
        .iter()
        .filter(|field| field.to_lowercase().contains(query))
        .count() as f64
}

fn score_student(
    record: &StudentSearchRecord,
    query: &str,
    filters: &SearchFilters,
) -> Option<StudentHit> {
    let skill_gaps = record.skill_gaps.join(" ");
    let courses = record.recommended_courses.join(" ");
    let score = text_score(
        query,
        &[
            record.academic_program.as_deref().unwrap_or_default(),
            record.career_interest.as_deref().unwrap_or_default(),
            skill_gaps.as_str(),
            courses.as_str(),
        ],
    );
    if score <= 0.0 || !filters.admits_student(record) {
        return None;
    }
    Some(StudentHit {
        student_id: record.student_id.clone(),
        academic_program: record.academic_program.clone(),
        gpa: record.gpa,
        performance_score: record.performance_score,
        career_interest: record.career_interest.clone(),
        skills: record.skill_gaps.clone(),
        relevance_score: score,
    })
}

fn score_job(record: &JobSearchRecord, query: &str, filters: &SearchFilters) -> Option<JobHit> {
    let skills = record.required_skills.join(" ");
    let score = text_score(
        query,
        &[
            record.job_title.as_deref().unwrap_or_default(),
            record.company.as_deref().unwrap_or_default(),
            record.location.as_deref().unwrap_or_default(),
            skills.as_str(),
        ],
    );
    if score <= 0.0 || !filters.admits_job(record) {
        return None;
    }
    Some(JobHit {
        job_posting_id: record.job_posting_id.clone(),
        job_title: record.job_title.clone(),
        company: record.company.clone(),
        location: record.location.clone(),
        required_skills: record.required_skills.clone(),
        salary_range: record.salary_range.clone(),
        match_score: record.match_score,
        relevance_score: score,
    })
}

/// Jobs matched to the student during the last run, in index order, and the
/// courses listed on their profile. An unknown student gets two empty lists.
pub fn recommendations(index: &SearchIndex, student_id: &str) -> Recommendations {
    let Some(student) = index.students().find(|s| s.student_id == student_id) else {
        return Recommendations::default();
    };

    let jobs = index
        .jobs()
        .filter(|job| job.job_title.as_deref().is_some_and(|t| !t.is_empty()))
        .filter_map(|job| {
            job.match_for(student_id).map(|m| JobRecommendation {
                job_posting_id: job.job_posting_id.clone(),
                job_title: job.job_title.clone(),
                company: job.company.clone(),
                location: job.location.clone(),
                required_skills: job.required_skills.clone(),
                salary_range: job.salary_range.clone(),
                match_score: m.match_score,
            })
        })
        .take(MAX_JOB_RECOMMENDATIONS)
        .collect();

    let course_names: HashMap<&str, &str> = index
        .courses()
        .map(|c| (c.course_id.as_str(), c.course_name.as_str()))
        .collect();
    let courses = student
        .recommended_courses
        .iter()
        .take(MAX_COURSE_RECOMMENDATIONS)
        .map(|course_id| CourseRecommendation {
            course_id: course_id.clone(),
            course_name: course_names
                .get(course_id.as_str())
                .map(|name| name.to_string())
                .unwrap_or_else(|| format!("Course {course_id}")),
            reason: COURSE_RECOMMENDATION_REASON.to_string(),
        })
        .collect();

    Recommendations { jobs, courses }
}
