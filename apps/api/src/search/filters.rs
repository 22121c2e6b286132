use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::models::search::{JobSearchRecord, StudentSearchRecord};

/// Hard gates applied after text scoring. Each is ignored by the record type
/// it does not apply to.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SearchFilters {
    /// Students: case-insensitive exact program match.
    pub academic_program: Option<String>,
    /// Students: a missing gpa counts as 0.
    pub min_gpa: Option<f64>,
    /// Jobs: case-insensitive substring of the location.
    pub location: Option<String>,
    /// Jobs: compared against the lower bound of a `NNk-MMk` salary range.
    pub min_salary: Option<f64>,
}

impl SearchFilters {
    /// `null` means no filters. Unknown keys are ignored; a known key with a
    /// wrongly-typed value is an error.
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Self::deserialize(value)
    }

    pub fn admits_student(&self, record: &StudentSearchRecord) -> bool {
        if let Some(program) = &self.academic_program {
            let actual = record.academic_program.as_deref().unwrap_or_default();
            if actual.to_lowercase() != program.to_lowercase() {
                return false;
            }
        }
        if let Some(min_gpa) = self.min_gpa {
            if record.gpa.unwrap_or(0.0) < min_gpa {
                return false;
            }
        }
        true
    }

    pub fn admits_job(&self, record: &JobSearchRecord) -> bool {
        if let Some(location) = &self.location {
            let actual = record.location.as_deref().unwrap_or_default().to_lowercase();
            if !actual.contains(&location.to_lowercase()) {
                return false;
            }
        }
        if let Some(min_salary) = self.min_salary {
            let lower = record.salary_range.as_deref().and_then(salary_lower_bound);
            // Unparseable ranges pass.
            if lower.is_some_and(|lower| lower < min_salary) {
                return false;
            }
        }
        true
    }
}

static THOUSANDS_AMOUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*[kK]\s*$").expect("thousands pattern compiles")
});

/// `"80k-120k"` -> `80000`. Only a lower bound written as `NNk` is understood.
pub fn salary_lower_bound(salary_range: &str) -> Option<f64> {
    let lower = salary_range.split('-').next()?;
    let caps = THOUSANDS_AMOUNT.captures(lower)?;
    caps[1].parse::<f64>().ok().map(|thousands| thousands * 1000.0)
}
