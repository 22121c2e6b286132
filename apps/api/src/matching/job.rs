//! Job match scoring. Pluggable behind `MatchScorer`; `AppState` carries an
//! `Arc<dyn MatchScorer>` chosen at startup.
//!
//! Default: `KeywordMatchScorer`
//! 1. +0.3 once if the program aligns with a required skill (see `ProgramSkillTable`)
//! 2. +0.2 if gpa >= 3.5
//! 3. +min(0.5, 0.1 x |skill_gaps ∩ required_skills|), case-insensitive
//!
//! The total is capped at 1.0 and only scores above `MATCH_THRESHOLD` become
//! recommendations.

use std::collections::HashSet;

use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::cleaning::normalize::round_to;
use crate::matching::associations::ProgramSkillTable;
use crate::models::opportunity::{JobPosting, OpportunityKind, Recommendation};
use crate::models::profile::UnifiedProfile;

pub const MATCH_THRESHOLD: f64 = 0.5;

const ALIGNMENT_WEIGHT: f64 = 0.3;
const STRONG_GPA: f64 = 3.5;
const GPA_WEIGHT: f64 = 0.2;
const OVERLAP_STEP: f64 = 0.1;
const OVERLAP_CAP: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobMatch {
    /// In [0, 1].
    pub score: f64,
    pub reasons: Vec<String>,
}

pub trait MatchScorer: Send + Sync {
    fn score(&self, profile: &UnifiedProfile, job: &JobPosting) -> JobMatch;

    /// Reported in logs, e.g. "keyword".
    fn backend(&self) -> &'static str;
}

#[derive(Debug, Clone, Default)]
pub struct KeywordMatchScorer {
    table: ProgramSkillTable,
}

impl KeywordMatchScorer {
    pub fn new(table: ProgramSkillTable) -> Self {
        Self { table }
    }
}

impl MatchScorer for KeywordMatchScorer {
    fn score(&self, profile: &UnifiedProfile, job: &JobPosting) -> JobMatch {
        let mut score: f64 = 0.0;
        let mut reasons = Vec::new();

        let alignment = profile
            .academic_program()
            .and_then(|program| self.table.alignment(program, &job.required_skills));
        if let Some(entry) = alignment {
            score += ALIGNMENT_WEIGHT;
            reasons.push(format!("{} background", entry.label));
        }

        if profile.gpa().is_some_and(|gpa| gpa >= STRONG_GPA) {
            score += GPA_WEIGHT;
            reasons.push("Strong academic performance".to_string());
        }

        let overlap = skill_overlap(profile.skill_gaps(), &job.required_skills);
        if overlap > 0 {
            score += (overlap as f64 * OVERLAP_STEP).min(OVERLAP_CAP);
        }

        JobMatch {
            score: round_to(score.min(1.0), 2),
            reasons,
        }
    }

    fn backend(&self) -> &'static str {
        "keyword"
    }
}

/// Distinct case-insensitive skills present in both lists.
fn skill_overlap(skill_gaps: &[String], required_skills: &[String]) -> usize {
    let gaps: HashSet<String> = skill_gaps.iter().map(|s| s.to_lowercase()).collect();
    required_skills
        .iter()
        .map(|s| s.to_lowercase())
        .collect::<HashSet<_>>()
        .intersection(&gaps)
        .count()
}

/// Scores one pairing; `None` unless the score clears `MATCH_THRESHOLD`.
pub fn match_job(
    scorer: &dyn MatchScorer,
    profile: &UnifiedProfile,
    job: &JobPosting,
) -> Option<Recommendation> {
    let JobMatch { score, reasons } = scorer.score(profile, job);
    if score <= MATCH_THRESHOLD {
        return None;
    }
    Some(Recommendation {
        student_id: profile.student_id.clone(),
        opportunity_id: job.job_id.clone(),
        opportunity_kind: OpportunityKind::Job,
        match_score: score,
        reasons,
        priority: None,
    })
}

/// Every job against every profile, fanned out per job. Output is ordered by
/// job, then by profile.
pub fn recommend_jobs(
    scorer: &dyn MatchScorer,
    profiles: &[UnifiedProfile],
    jobs: &[JobPosting],
) -> Vec<Recommendation> {
    let recommendations: Vec<Recommendation> = jobs
        .par_iter()
        .flat_map_iter(|job| {
            profiles
                .iter()
                .filter_map(move |profile| match_job(scorer, profile, job))
        })
        .collect();

    info!(
        backend = scorer.backend(),
        jobs = jobs.len(),
        profiles = profiles.len(),
        recommendations = recommendations.len(),
        "job matching complete"
    );
    recommendations
}
