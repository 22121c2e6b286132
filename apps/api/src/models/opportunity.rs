use serde::{Deserialize, Serialize};

use crate::models::record::{CleanedRecord, RecordKind, SourceId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub job_id: String,
    pub source_id: SourceId,
    pub title: String,
    pub company: String,
    pub location: String,
    pub required_skills: Vec<String>,
    pub preferred_skills: Vec<String>,
    pub salary_range: String,
}

impl JobPosting {
    /// Lifts a cleaned job posting row. Rows without an id are not opportunities.
    pub fn from_cleaned(record: &CleanedRecord) -> Option<Self> {
        if record.record_kind != RecordKind::JobPosting {
            return None;
        }
        let job_id = record
            .text("job_posting_id")
            .or_else(|| record.text("job_id"))?
            .to_string();

        Some(Self {
            job_id,
            source_id: record.source_id,
            title: record.text("job_title").unwrap_or_default().to_string(),
            company: record.text("company").unwrap_or_default().to_string(),
            location: record.text("location").unwrap_or_default().to_string(),
            required_skills: record.list("required_skills").to_vec(),
            preferred_skills: record.list("preferred_skills").to_vec(),
            salary_range: record.text("salary_range").unwrap_or_default().to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseOffering {
    pub course_id: String,
    pub source_id: SourceId,
    pub name: String,
    pub target_skill_gaps: Vec<String>,
}

impl CourseOffering {
    pub fn from_cleaned(record: &CleanedRecord) -> Option<Self> {
        if record.record_kind != RecordKind::Course {
            return None;
        }
        let course_id = record
            .text("course_code")
            .or_else(|| record.text("course_id"))?
            .to_string();
        let name = record
            .text("course_name")
            .map(str::to_string)
            .unwrap_or_else(|| format!("Course {course_id}"));

        Some(Self {
            course_id,
            source_id: record.source_id,
            name,
            target_skill_gaps: record.list("target_skill_gaps").to_vec(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "opportunity_kind", rename_all = "snake_case")]
pub enum Opportunity {
    Job(JobPosting),
    Course(CourseOffering),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityKind {
    Job,
    Course,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
}

/// A scored pairing of a student with an opportunity. Recomputed every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub student_id: String,
    pub opportunity_id: String,
    pub opportunity_kind: OpportunityKind,
    pub match_score: f64,
    pub reasons: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::FieldValue;

    #[test]
    fn test_job_posting_requires_an_id() {
        let mut record = CleanedRecord::new(SourceId::Workday, RecordKind::JobPosting);
        record.set("job_title", FieldValue::Text("Data Analyst".to_string()));
        assert!(JobPosting::from_cleaned(&record).is_none());

        record.set("job_posting_id", FieldValue::Text("JOB002".to_string()));
        let job = JobPosting::from_cleaned(&record).unwrap();
        assert_eq!(job.job_id, "JOB002");
        assert_eq!(job.title, "Data Analyst");
        assert!(job.required_skills.is_empty());
    }

    #[test]
    fn test_course_name_falls_back_to_code() {
        let mut record = CleanedRecord::new(SourceId::Oracle, RecordKind::Course);
        record.set("course_code", FieldValue::Text("CS201".to_string()));
        let course = CourseOffering::from_cleaned(&record).unwrap();
        assert_eq!(course.name, "Course CS201");
    }
}
