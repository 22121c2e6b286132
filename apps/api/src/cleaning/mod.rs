// Record cleaning stage: normalizers, field validation, per-kind transforms,
// and batch quality scoring.

pub mod cleaner;
pub mod normalize;
pub mod quality;
pub mod validation;
