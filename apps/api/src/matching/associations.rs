//! Keyword table that decides when an academic program "aligns" with a job.
//!
//! Loaded from JSON when `PROGRAM_SKILL_TABLE` is set, otherwise the built-in
//! defaults below.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramSkillAssociation {
    /// Lower-case substring looked for in the student's program.
    pub program_keyword: String,
    /// Lower-case substring looked for in any required skill.
    pub skill_keyword: String,
    /// Used in the match reason, e.g. "Computer Science background".
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgramSkillTable {
    entries: Vec<ProgramSkillAssociation>,
}

impl Default for ProgramSkillTable {
    fn default() -> Self {
        let entry = |program: &str, skill: &str, label: &str| ProgramSkillAssociation {
            program_keyword: program.to_string(),
            skill_keyword: skill.to_string(),
            label: label.to_string(),
        };
        Self {
            entries: vec![
                entry("computer science", "programming", "Computer Science"),
                entry("data science", "data", "Data Science"),
                entry("business", "management", "Business"),
            ],
        }
    }
}

impl ProgramSkillTable {
    pub fn new(entries: Vec<ProgramSkillAssociation>) -> Self {
        let entries = entries
            .into_iter()
            .map(|e| ProgramSkillAssociation {
                program_keyword: e.program_keyword.to_lowercase(),
                skill_keyword: e.skill_keyword.to_lowercase(),
                label: e.label,
            })
            .collect();
        Self { entries }
    }

    /// Reads a JSON array of `{program_keyword, skill_keyword, label}`.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading association table {}", path.display()))?;
        let entries: Vec<ProgramSkillAssociation> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing association table {}", path.display()))?;
        Ok(Self::new(entries))
    }

    pub fn entries(&self) -> &[ProgramSkillAssociation] {
        &self.entries
    }

    /// First entry, in table order, whose program keyword appears in
    /// `program` and whose skill keyword appears in some required skill.
    pub fn alignment(&self, program: &str, required_skills: &[String]) -> Option<&ProgramSkillAssociation> {
        let program = program.to_lowercase();
        let skills: Vec<String> = required_skills.iter().map(|s| s.to_lowercase()).collect();
        self.entries.iter().find(|entry| {
            program.contains(&entry.program_keyword)
                && skills.iter().any(|skill| skill.contains(&entry.skill_keyword))
        })
    }
}
