use tracing::info;

use crate::models::opportunity::{OpportunityKind, Priority, Recommendation};
use crate::models::profile::UnifiedProfile;

const HIGH_PRIORITY_SCORE: f64 = 1.0;
const MEDIUM_PRIORITY_SCORE: f64 = 0.5;

/// One recommendation per course listed in the profile's
/// `recommended_courses`.
///
/// Priority is High only when the course id literally appears among the
/// student's skill gaps. The reason names up to the first two gaps.
pub fn recommend_courses(profiles: &[UnifiedProfile]) -> Vec<Recommendation> {
    let recommendations: Vec<Recommendation> = profiles
        .iter()
        .flat_map(|profile| {
            let gaps = profile.skill_gaps();
            let reasons = if gaps.is_empty() {
                Vec::new()
            } else {
                let named: Vec<&str> = gaps.iter().take(2).map(String::as_str).collect();
                vec![format!("Addresses skill gap: {}", named.join(", "))]
            };

            profile.recommended_courses().iter().map(move |course_id| {
                let priority = if gaps.contains(course_id) {
                    Priority::High
                } else {
                    Priority::Medium
                };
                Recommendation {
                    student_id: profile.student_id.clone(),
                    opportunity_id: course_id.clone(),
                    opportunity_kind: OpportunityKind::Course,
                    match_score: match priority {
                        Priority::High => HIGH_PRIORITY_SCORE,
                        Priority::Medium => MEDIUM_PRIORITY_SCORE,
                    },
                    reasons: reasons.clone(),
                    priority: Some(priority),
                }
            })
        })
        .collect();

    info!(recommendations = recommendations.len(), "course recommendations built");
    recommendations
}
