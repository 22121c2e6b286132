//! Merges student-facing records from every source into one `UnifiedProfile`
//! per `student_id`.
//!
//! Merge precedence is declared by `SourcePriority`, never by map iteration
//! order. Single-threaded: merges into the same key do not commute.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::models::profile::UnifiedProfile;
use crate::models::record::{CleanedRecord, SourceId};

/// Refreshable analytics fields. Later records overwrite earlier values unless
/// the later value is blank (missing, empty text or an empty list).
pub const ENRICHMENT_FIELDS: &[&str] = &[
    "performance_score",
    "engagement_level",
    "learning_style",
    "skill_gaps",
    "recommended_courses",
    "career_interest",
];

/// Merge order for sources, systems of record first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePriority(Vec<SourceId>);

impl Default for SourcePriority {
    fn default() -> Self {
        Self(vec![SourceId::Oracle, SourceId::Workday, SourceId::Tableau])
    }
}

impl SourcePriority {
    /// Duplicates are ignored; sources not listed go last, in default order.
    pub fn new(order: impl IntoIterator<Item = SourceId>) -> Self {
        let mut ordered: Vec<SourceId> = Vec::new();
        for source in order.into_iter().chain(Self::default().0) {
            if !ordered.contains(&source) {
                ordered.push(source);
            }
        }
        Self(ordered)
    }

    /// Parses a comma-separated list such as `oracle,workday,tableau`.
    pub fn parse(s: &str) -> Result<Self, String> {
        let sources = s
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(|part| SourceId::parse(part).ok_or_else(|| format!("unknown source '{}'", part.trim())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(sources))
    }

    pub fn ordered(&self) -> &[SourceId] {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnifyOutcome {
    /// In first-seen order.
    pub profiles: Vec<UnifiedProfile>,
    /// Student-facing records skipped for lacking a valid `student_id`.
    pub excluded: usize,
}

pub fn unify(
    cleaned_by_source: &BTreeMap<SourceId, Vec<CleanedRecord>>,
    priority: &SourcePriority,
) -> UnifyOutcome {
    let mut profiles: Vec<UnifiedProfile> = Vec::new();
    let mut by_id: HashMap<String, usize> = HashMap::new();
    let mut excluded = 0;

    for source in priority.ordered() {
        let Some(records) = cleaned_by_source.get(source) else {
            continue;
        };
        for record in records.iter().filter(|r| r.record_kind.is_student_facing()) {
            let Some(student_id) = record.text("student_id") else {
                excluded += 1;
                continue;
            };

            match by_id.get(student_id) {
                Some(&idx) => merge_into(&mut profiles[idx], record),
                None => {
                    by_id.insert(student_id.to_string(), profiles.len());
                    profiles.push(new_profile(student_id, record));
                }
            }
        }
    }

    if excluded > 0 {
        debug!(excluded, "records without student_id left out of unification");
    }
    info!(profiles = profiles.len(), excluded, "unified student profiles");

    UnifyOutcome { profiles, excluded }
}

fn new_profile(student_id: &str, record: &CleanedRecord) -> UnifiedProfile {
    let fields = record
        .fields
        .iter()
        .filter(|(name, _)| name.as_str() != "student_id")
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    UnifiedProfile {
        student_id: student_id.to_string(),
        fields,
        sources: vec![record.source_id],
    }
}

fn merge_into(profile: &mut UnifiedProfile, record: &CleanedRecord) {
    for (name, incoming) in &record.fields {
        if name == "student_id" {
            continue;
        }
        if ENRICHMENT_FIELDS.contains(&name.as_str()) {
            if !incoming.is_blank() {
                profile.fields.insert(name.clone(), incoming.clone());
            }
            continue;
        }
        match profile.fields.get(name) {
            None => {
                profile.fields.insert(name.clone(), incoming.clone());
            }
            Some(existing) if existing.is_blank() && !incoming.is_blank() => {
                profile.fields.insert(name.clone(), incoming.clone());
            }
            Some(_) => {}
        }
    }
    if !profile.sources.contains(&record.source_id) {
        profile.sources.push(record.source_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::{FieldValue, RecordKind};

    fn text(s: &str) -> FieldValue {
        FieldValue::Text(s.to_string())
    }

    fn rec(source: SourceId, kind: RecordKind, fields: &[(&str, FieldValue)]) -> CleanedRecord {
        let mut r = CleanedRecord::new(source, kind);
        for (name, value) in fields {
            r.set(name, value.clone());
        }
        r
    }

    fn fixture() -> BTreeMap<SourceId, Vec<CleanedRecord>> {
        let mut by_source = BTreeMap::new();
        by_source.insert(
            SourceId::Tableau,
            vec![
                rec(
                    SourceId::Tableau,
                    RecordKind::StudentAnalytics,
                    &[
                        ("student_id", text("STU001")),
                        ("email", text("analytics@example.com")),
                        ("performance_score", FieldValue::Number(85.5)),
                        ("skill_gaps", FieldValue::List(vec!["Machine Learning".to_string()])),
                    ],
                ),
                rec(
                    SourceId::Tableau,
                    RecordKind::StudentAnalytics,
                    &[
                        ("student_id", text("STU001")),
                        ("performance_score", FieldValue::Number(90.0)),
                    ],
                ),
            ],
        );
        by_source.insert(
            SourceId::Oracle,
            vec![
                rec(
                    SourceId::Oracle,
                    RecordKind::Student,
                    &[
                        ("student_id", text("STU001")),
                        ("email", text("john@example.com")),
                        ("gpa", FieldValue::Missing),
                    ],
                ),
                rec(
                    SourceId::Oracle,
                    RecordKind::Student,
                    &[("student_id", FieldValue::Missing), ("email", text("ghost@example.com"))],
                ),
            ],
        );
        by_source.insert(
            SourceId::Workday,
            vec![rec(
                SourceId::Workday,
                RecordKind::Student,
                &[
                    ("student_id", text("STU001")),
                    ("email", text("other@example.com")),
                    ("gpa", FieldValue::Number(3.8)),
                ],
            )],
        );
        by_source
    }

    #[test]
    fn test_one_profile_per_student_id() {
        let outcome = unify(&fixture(), &SourcePriority::default());
        assert_eq!(outcome.profiles.len(), 1);
        assert_eq!(outcome.excluded, 1);
        assert_eq!(
            outcome.profiles[0].sources,
            vec![SourceId::Oracle, SourceId::Workday, SourceId::Tableau]
        );
    }

    #[test]
    fn test_identity_fields_keep_system_of_record_value() {
        let outcome = unify(&fixture(), &SourcePriority::default());
        let profile = &outcome.profiles[0];
        assert_eq!(profile.get("email"), Some(&text("john@example.com")));
    }

    #[test]
    fn test_missing_identity_field_is_filled_by_later_source() {
        let outcome = unify(&fixture(), &SourcePriority::default());
        assert_eq!(outcome.profiles[0].gpa(), Some(3.8));
    }

    #[test]
    fn test_later_enrichment_wins() {
        let outcome = unify(&fixture(), &SourcePriority::default());
        let profile = &outcome.profiles[0];
        assert_eq!(profile.performance_score(), Some(90.0));
        assert_eq!(profile.skill_gaps(), ["Machine Learning"]);
    }

    #[test]
    fn test_priority_order_changes_identity_winner() {
        let priority = SourcePriority::new([SourceId::Workday, SourceId::Oracle]);
        let outcome = unify(&fixture(), &priority);
        assert_eq!(outcome.profiles[0].get("email"), Some(&text("other@example.com")));
    }

    #[test]
    fn test_unify_is_idempotent() {
        let input = fixture();
        let priority = SourcePriority::default();
        assert_eq!(unify(&input, &priority), unify(&input, &priority));
    }

    #[test]
    fn test_analytics_only_student_still_gets_profile() {
        let mut input = BTreeMap::new();
        input.insert(
            SourceId::Tableau,
            vec![rec(
                SourceId::Tableau,
                RecordKind::StudentAnalytics,
                &[("student_id", text("STU009")), ("career_interest", text("Data Science"))],
            )],
        );
        let outcome = unify(&input, &SourcePriority::default());
        assert_eq!(outcome.profiles[0].student_id, "STU009");
        assert_eq!(outcome.profiles[0].career_interest(), Some("Data Science"));
    }

    #[test]
    fn test_non_student_kinds_are_ignored() {
        let mut input = BTreeMap::new();
        input.insert(
            SourceId::Oracle,
            vec![rec(
                SourceId::Oracle,
                RecordKind::Enrollment,
                &[("student_id", text("STU001")), ("grade", text("A"))],
            )],
        );
        let outcome = unify(&input, &SourcePriority::default());
        assert!(outcome.profiles.is_empty());
        assert_eq!(outcome.excluded, 0);
    }

    #[test]
    fn test_source_priority_parse() {
        let priority = SourcePriority::parse("workday, oracle").unwrap();
        assert_eq!(
            priority.ordered(),
            [SourceId::Workday, SourceId::Oracle, SourceId::Tableau]
        );
        assert!(SourcePriority::parse("oracle,sap").is_err());
    }

    #[test]
    fn test_empty_enrichment_list_does_not_wipe_earlier_value() {
        let mut input = BTreeMap::new();
        input.insert(
            SourceId::Tableau,
            vec![
                rec(
                    SourceId::Tableau,
                    RecordKind::StudentAnalytics,
                    &[
                        ("student_id", text("STU001")),
                        ("skill_gaps", FieldValue::List(vec!["SQL".to_string()])),
                    ],
                ),
                rec(
                    SourceId::Tableau,
                    RecordKind::StudentAnalytics,
                    &[("student_id", text("STU001")), ("skill_gaps", FieldValue::List(vec![]))],
                ),
            ],
        );
        let outcome = unify(&input, &SourcePriority::default());
        assert_eq!(outcome.profiles[0].skill_gaps(), ["SQL"]);
    }
}
