// Matching stage: program/skill associations, job scoring and course
// recommendations.

pub mod associations;
pub mod course;
pub mod job;
