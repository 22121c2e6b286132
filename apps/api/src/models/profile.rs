use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::record::{FieldValue, SourceId};

/// Canonical per-student entity, merged across sources.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnifiedProfile {
    pub student_id: String,
    pub fields: BTreeMap<String, FieldValue>,
    /// Sources that contributed, in merge order.
    pub sources: Vec<SourceId>,
}

impl UnifiedProfile {
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    fn text(&self, field: &str) -> Option<&str> {
        self.get(field)
            .and_then(FieldValue::as_text)
            .filter(|s| !s.is_empty())
    }

    fn list(&self, field: &str) -> &[String] {
        self.get(field).and_then(FieldValue::as_list).unwrap_or(&[])
    }

    pub fn academic_program(&self) -> Option<&str> {
        self.text("academic_program")
    }

    pub fn gpa(&self) -> Option<f64> {
        self.get("gpa").and_then(FieldValue::as_number)
    }

    pub fn performance_score(&self) -> Option<f64> {
        self.get("performance_score").and_then(FieldValue::as_number)
    }

    pub fn career_interest(&self) -> Option<&str> {
        self.text("career_interest")
    }

    pub fn engagement_level(&self) -> Option<&str> {
        self.text("engagement_level")
    }

    pub fn full_name(&self) -> Option<&str> {
        self.text("full_name")
    }

    pub fn status(&self) -> Option<&str> {
        self.text("status")
    }

    pub fn skill_gaps(&self) -> &[String] {
        self.list("skill_gaps")
    }

    pub fn recommended_courses(&self) -> &[String] {
        self.list("recommended_courses")
    }
}
