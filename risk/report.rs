//! Read-only views prepared for a presentation layer.
//!
//! Nothing here mutates the population or caches results; callers hand in
//! an immutable snapshot and get plain data back, so every function can be
//! re-invoked on demand.

use crate::records::AdmissionRecord;
use crate::scores::{ScoreName, ScoredAdmission};
use crate::validate::{self, ValidationResult};
use serde::Serialize;

/// Risk classification of a single score against its clinical cut-point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskClass {
    High,
    Low,
    /// The score could not be computed for this admission.
    Unknown,
}

/// One row of the per-admission score panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScorePanelEntry {
    pub score: ScoreName,
    pub value: Option<u32>,
    pub class: RiskClass,
}

/// All six scores for one admission, classified against their cut-points.
#[must_use]
pub fn score_panel(record: &AdmissionRecord) -> Vec<ScorePanelEntry> {
    ScoreName::ALL
        .iter()
        .map(|&name| {
            let def = name.definition();
            let value = def.score(record);
            let class = match value {
                Some(v) if def.classify(v) => RiskClass::High,
                Some(_) => RiskClass::Low,
                None => RiskClass::Unknown,
            };
            ScorePanelEntry {
                score: name,
                value,
                class,
            }
        })
        .collect()
}

/// Diagnostic validation of every score against the reference population.
#[must_use]
pub fn validation_panel(population: &[ScoredAdmission]) -> Vec<ValidationResult> {
    ScoreName::ALL
        .iter()
        .map(|&name| validate::validate_score(population, name, None))
        .collect()
}

/// `(score, outcome)` pairs for one instrument, ready for a histogram
/// renderer. Rows missing either value are skipped.
#[must_use]
pub fn histogram_series(population: &[ScoredAdmission], score: ScoreName) -> Vec<(u32, bool)> {
    population
        .iter()
        .filter_map(|row| Some((row.scores.get(score)?, row.record.af?)))
        .collect()
}
