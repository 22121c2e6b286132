use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Flattened, denormalized unit stored in the search index.
///
/// The serialized shape (`record_type` tag plus flat fields) is read by query
/// clients outside this service and must stay backward compatible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record_type", rename_all = "snake_case")]
pub enum SearchRecord {
    StudentProfile(StudentSearchRecord),
    JobPosting(JobSearchRecord),
    Course(CourseSearchRecord),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentSearchRecord {
    pub student_id: String,
    pub full_name: Option<String>,
    pub academic_program: Option<String>,
    pub gpa: Option<f64>,
    pub performance_score: Option<f64>,
    pub engagement_level: Option<String>,
    pub career_interest: Option<String>,
    #[serde(default)]
    pub skill_gaps: Vec<String>,
    #[serde(default)]
    pub recommended_courses: Vec<String>,
    pub status: Option<String>,
    pub data_source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSearchRecord {
    pub job_posting_id: String,
    pub job_title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub preferred_skills: Vec<String>,
    pub salary_range: Option<String>,
    /// Best match score among `student_matches`, 0 when nobody matched.
    #[serde(default)]
    pub match_score: f64,
    #[serde(default)]
    pub student_matches: Vec<StudentMatch>,
    pub data_source: String,
}

impl JobSearchRecord {
    pub fn match_for(&self, student_id: &str) -> Option<&StudentMatch> {
        self.student_matches
            .iter()
            .find(|m| m.student_id == student_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentMatch {
    pub student_id: String,
    pub match_score: f64,
    #[serde(default)]
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseSearchRecord {
    pub course_id: String,
    pub course_name: String,
    #[serde(default)]
    pub target_skill_gaps: Vec<String>,
    pub data_source: String,
}

/// Snapshot of every searchable record for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchIndex {
    pub index_created_at: DateTime<Utc>,
    pub total_records: usize,
    #[serde(default)]
    pub records: Vec<SearchRecord>,
}

impl SearchIndex {
    pub fn new(records: Vec<SearchRecord>, index_created_at: DateTime<Utc>) -> Self {
        Self {
            index_created_at,
            total_records: records.len(),
            records,
        }
    }

    /// Index served when nothing (readable) has been built yet.
    pub fn empty() -> Self {
        Self::new(Vec::new(), DateTime::<Utc>::default())
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn students(&self) -> impl Iterator<Item = &StudentSearchRecord> {
        self.records.iter().filter_map(|r| match r {
            SearchRecord::StudentProfile(s) => Some(s),
            _ => None,
        })
    }

    pub fn jobs(&self) -> impl Iterator<Item = &JobSearchRecord> {
        self.records.iter().filter_map(|r| match r {
            SearchRecord::JobPosting(j) => Some(j),
            _ => None,
        })
    }

    pub fn courses(&self) -> impl Iterator<Item = &CourseSearchRecord> {
        self.records.iter().filter_map(|r| match r {
            SearchRecord::Course(c) => Some(c),
            _ => None,
        })
    }
}
