//! The six risk score calculators.
//!
//! Every score is the same machine: a table of `(points, predicate)` pairs
//! summed over one `AdmissionRecord`, plus a clinical cut-point for binary
//! classification. A predicate returns `Some(bool)` when it can be
//! evaluated and `None` when a field it needs is missing — and a single
//! `None` makes the whole score undefined. Undefined is reported as absent,
//! never as zero.

use crate::records::{AdmissionRecord, Gender};
use serde::Serialize;
use std::fmt;

/// A scoring branch: `points` are added when `predicate` holds.
pub struct ScoreItem {
    pub points: u32,
    pub predicate: fn(&AdmissionRecord) -> Option<bool>,
}

/// A named scoring instrument: its point table and clinical cut-point.
pub struct ScoreDef {
    pub name: ScoreName,
    /// Human-readable instrument name for display surfaces.
    pub label: &'static str,
    /// Scores at or above this threshold classify the patient high-risk.
    pub cut_point: u32,
    items: &'static [ScoreItem],
}

impl ScoreDef {
    /// Total points for a record, or `None` when any required input for any
    /// branch is missing.
    #[must_use]
    pub fn score(&self, record: &AdmissionRecord) -> Option<u32> {
        let mut total = 0;
        for item in self.items {
            if (item.predicate)(record)? {
                total += item.points;
            }
        }
        Some(total)
    }

    /// Binary classification at the clinical cut-point.
    #[must_use]
    pub fn classify(&self, score: u32) -> bool {
        score >= self.cut_point
    }
}

/// Identifies one of the six scoring instruments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ScoreName {
    Afri,
    Chads2Vasc,
    Poaf,
    Npoaf,
    Simplified,
    ComAf,
}

impl ScoreName {
    pub const ALL: [Self; 6] = [
        Self::Afri,
        Self::Chads2Vasc,
        Self::Poaf,
        Self::Npoaf,
        Self::Simplified,
        Self::ComAf,
    ];

    /// The column name used in the flat export.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Afri => "afri",
            Self::Chads2Vasc => "chads2",
            Self::Poaf => "poaf",
            Self::Npoaf => "npoaf",
            Self::Simplified => "simplified",
            Self::ComAf => "comaf",
        }
    }

    /// Parse either the export column name or the display name.
    pub fn parse(s: &str) -> Option<Self> {
        let lowered = s.trim().to_lowercase();
        match lowered.as_str() {
            "afri" => Some(Self::Afri),
            "chads2" | "chads2-vasc" | "cha2ds2-vasc" => Some(Self::Chads2Vasc),
            "poaf" => Some(Self::Poaf),
            "npoaf" => Some(Self::Npoaf),
            "simplified" | "simplified-poaf" => Some(Self::Simplified),
            "comaf" | "com-af" => Some(Self::ComAf),
            _ => None,
        }
    }

    #[must_use]
    pub const fn definition(self) -> &'static ScoreDef {
        match self {
            Self::Afri => &AFRI,
            Self::Chads2Vasc => &CHADS2_VASC,
            Self::Poaf => &POAF,
            Self::Npoaf => &NPOAF,
            Self::Simplified => &SIMPLIFIED,
            Self::ComAf => &COM_AF,
        }
    }
}

impl fmt::Display for ScoreName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = match self {
            Self::Afri => "AFRI",
            Self::Chads2Vasc => "CHA2DS2-VASc",
            Self::Poaf => "POAF",
            Self::Npoaf => "NPOAF",
            Self::Simplified => "Simplified POAF",
            Self::ComAf => "COM-AF",
        };
        f.write_str(short)
    }
}

/// All six score values for one record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreSet {
    pub afri: Option<u32>,
    pub chads2_vasc: Option<u32>,
    pub poaf: Option<u32>,
    pub npoaf: Option<u32>,
    pub simplified: Option<u32>,
    pub com_af: Option<u32>,
}

impl ScoreSet {
    #[must_use]
    pub fn compute(record: &AdmissionRecord) -> Self {
        Self {
            afri: AFRI.score(record),
            chads2_vasc: CHADS2_VASC.score(record),
            poaf: POAF.score(record),
            npoaf: NPOAF.score(record),
            simplified: SIMPLIFIED.score(record),
            com_af: COM_AF.score(record),
        }
    }

    #[must_use]
    pub fn get(&self, name: ScoreName) -> Option<u32> {
        match name {
            ScoreName::Afri => self.afri,
            ScoreName::Chads2Vasc => self.chads2_vasc,
            ScoreName::Poaf => self.poaf,
            ScoreName::Npoaf => self.npoaf,
            ScoreName::Simplified => self.simplified,
            ScoreName::ComAf => self.com_af,
        }
    }
}

/// A record together with its computed scores: one row of the flat table
/// the dashboard and the validator consume.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredAdmission {
    pub record: AdmissionRecord,
    pub scores: ScoreSet,
}

impl ScoredAdmission {
    #[must_use]
    pub fn from_record(record: AdmissionRecord) -> Self {
        let scores = ScoreSet::compute(&record);
        Self { record, scores }
    }
}

/// Atrial Fibrillation Risk Index: gender-specific thresholds on age,
/// weight, and height, plus peripheral vascular disease.
pub static AFRI: ScoreDef = ScoreDef {
    name: ScoreName::Afri,
    label: "Atrial Fibrillation Risk Index",
    cut_point: 2,
    items: &[
        ScoreItem { points: 1, predicate: afri_age },
        ScoreItem { points: 1, predicate: afri_weight },
        ScoreItem { points: 1, predicate: afri_height },
        ScoreItem { points: 1, predicate: |r| r.pvd },
    ],
};

pub static CHADS2_VASC: ScoreDef = ScoreDef {
    name: ScoreName::Chads2Vasc,
    label: "CHA2DS2-VASc Score",
    cut_point: 4,
    items: &[
        ScoreItem { points: 1, predicate: |r| r.chf },
        ScoreItem { points: 1, predicate: |r| r.hbp },
        ScoreItem { points: 2, predicate: |r| Some(r.age? >= 75) },
        ScoreItem { points: 1, predicate: |r| r.dm },
        ScoreItem { points: 2, predicate: |r| r.stroke },
        ScoreItem { points: 1, predicate: |r| r.pvd },
        ScoreItem { points: 1, predicate: |r| Some((65..=74).contains(&r.age?)) },
        ScoreItem { points: 1, predicate: is_female },
    ],
};

pub static POAF: ScoreDef = ScoreDef {
    name: ScoreName::Poaf,
    label: "Postoperative Atrial Fibrillation Score",
    cut_point: 3,
    items: &[
        ScoreItem { points: 1, predicate: |r| Some((60..=69).contains(&r.age?)) },
        ScoreItem { points: 2, predicate: |r| Some((70..=79).contains(&r.age?)) },
        ScoreItem { points: 3, predicate: |r| Some(r.age? >= 80) },
        ScoreItem { points: 1, predicate: |r| r.copd },
        ScoreItem { points: 1, predicate: poaf_renal },
        ScoreItem { points: 1, predicate: |r| r.emergency },
        ScoreItem { points: 1, predicate: |r| r.iabp },
        ScoreItem { points: 1, predicate: |r| r.cvas },
    ],
};

pub static NPOAF: ScoreDef = ScoreDef {
    name: ScoreName::Npoaf,
    label: "New-onset Postoperative Atrial Fibrillation Score",
    cut_point: 2,
    items: &[
        ScoreItem { points: 2, predicate: |r| Some((65..=74).contains(&r.age?)) },
        ScoreItem { points: 3, predicate: |r| Some(r.age? >= 75) },
        ScoreItem { points: 1, predicate: |r| r.mmvd },
        ScoreItem { points: 3, predicate: |r| r.smvd },
        ScoreItem { points: 1, predicate: |r| r.lad },
    ],
};

pub static SIMPLIFIED: ScoreDef = ScoreDef {
    name: ScoreName::Simplified,
    label: "Simplified Postoperative Atrial Fibrillation Score",
    cut_point: 3,
    items: &[
        ScoreItem { points: 2, predicate: |r| Some(r.age? >= 65) },
        ScoreItem { points: 2, predicate: |r| r.hbp },
        ScoreItem { points: 1, predicate: |r| r.mi },
        ScoreItem { points: 2, predicate: |r| r.chf },
    ],
};

/// COM-AF. Both age branches apply additively, so ages 65-74 earn 3 age
/// points and 75+ earn 2.
pub static COM_AF: ScoreDef = ScoreDef {
    name: ScoreName::ComAf,
    label: "Combined Risk Score to Predict Atrial Fibrillation",
    cut_point: 3,
    items: &[
        ScoreItem { points: 1, predicate: |r| Some((65..=74).contains(&r.age?)) },
        ScoreItem { points: 2, predicate: |r| Some(r.age? >= 65) },
        ScoreItem { points: 1, predicate: is_female },
        ScoreItem { points: 1, predicate: |r| r.hbp },
        ScoreItem { points: 1, predicate: |r| r.dm },
        ScoreItem { points: 2, predicate: |r| r.stroke },
    ],
};

fn is_female(r: &AdmissionRecord) -> Option<bool> {
    Some(r.gender? == Gender::Female)
}

fn afri_age(r: &AdmissionRecord) -> Option<bool> {
    let age = r.age?;
    Some(match r.gender? {
        Gender::Male => age > 60,
        Gender::Female => age > 66,
    })
}

fn afri_weight(r: &AdmissionRecord) -> Option<bool> {
    let weight = r.weight?;
    Some(match r.gender? {
        Gender::Male => weight > 76.0,
        Gender::Female => weight > 64.0,
    })
}

fn afri_height(r: &AdmissionRecord) -> Option<bool> {
    let height = r.height?;
    Some(match r.gender? {
        Gender::Male => height > 176.0,
        Gender::Female => height > 168.0,
    })
}

/// Renal branch of POAF: eGFR below 15 scores, otherwise dialysis does.
/// The two conditions are mutually exclusive and never stack.
fn poaf_renal(r: &AdmissionRecord) -> Option<bool> {
    let egfr = r.egfr?;
    if egfr < 15.0 { Some(true) } else { r.dialysis }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A record with every scoring input present and benign.
    fn complete_record() -> AdmissionRecord {
        AdmissionRecord {
            subject_id: 1,
            hadm_id: 100,
            age: Some(50),
            gender: Some(Gender::Male),
            height: Some(170.0),
            weight: Some(70.0),
            creatinine: Some(1.0),
            egfr: Some(80.0),
            chf: Some(false),
            hbp: Some(false),
            dm: Some(false),
            stroke: Some(false),
            pvd: Some(false),
            vd: Some(false),
            lad: Some(false),
            mmvd: Some(false),
            smvd: Some(false),
            copd: Some(false),
            iabp: Some(false),
            cvas: Some(false),
            emergency: Some(false),
            dialysis: Some(false),
            mi: Some(false),
            af: Some(false),
        }
    }

    #[test]
    fn afri_worked_example() {
        // Male, 65, 80 kg, 180 cm, peripheral vascular disease: all four
        // branches hold.
        let mut r = complete_record();
        r.age = Some(65);
        r.weight = Some(80.0);
        r.height = Some(180.0);
        r.pvd = Some(true);
        assert_eq!(AFRI.score(&r), Some(4));
    }

    #[test]
    fn afri_female_thresholds_differ() {
        let mut r = complete_record();
        r.gender = Some(Gender::Female);
        r.age = Some(65);
        r.weight = Some(65.0);
        r.height = Some(168.0);
        // Age 65 is under the female threshold of 67, weight over 64,
        // height not over 168.
        assert_eq!(AFRI.score(&r), Some(1));
    }

    #[test]
    fn afri_is_undefined_without_gender() {
        let mut r = complete_record();
        r.gender = None;
        assert_eq!(AFRI.score(&r), None);
    }

    #[test]
    fn chads2_vasc_stroke_adds_exactly_two() {
        let mut r = complete_record();
        r.age = Some(70);
        r.hbp = Some(true);
        let base = CHADS2_VASC.score(&r).unwrap();
        r.stroke = Some(true);
        assert_eq!(CHADS2_VASC.score(&r), Some(base + 2));
    }

    #[test]
    fn chads2_vasc_age_bands_do_not_stack() {
        let mut r = complete_record();
        r.age = Some(70);
        assert_eq!(CHADS2_VASC.score(&r), Some(1));
        r.age = Some(75);
        assert_eq!(CHADS2_VASC.score(&r), Some(2));
    }

    #[test]
    fn poaf_renal_branch_is_mutually_exclusive() {
        let mut r = complete_record();
        r.egfr = Some(10.0);
        r.dialysis = Some(true);
        // Low eGFR and dialysis together still add exactly one point.
        assert_eq!(POAF.score(&r), Some(1));
        r.egfr = Some(80.0);
        assert_eq!(POAF.score(&r), Some(1));
        r.dialysis = Some(false);
        assert_eq!(POAF.score(&r), Some(0));
    }

    #[test]
    fn poaf_age_bands() {
        let mut r = complete_record();
        for (age, expected) in [(59, 0), (60, 1), (69, 1), (70, 2), (79, 2), (80, 3), (95, 3)] {
            r.age = Some(age);
            assert_eq!(POAF.score(&r), Some(expected), "age {age}");
        }
    }

    #[test]
    fn poaf_undefined_when_egfr_missing() {
        let mut r = complete_record();
        r.egfr = None;
        assert_eq!(POAF.score(&r), None);
    }

    #[test]
    fn poaf_dialysis_only_needed_when_egfr_is_high() {
        let mut r = complete_record();
        r.egfr = Some(10.0);
        r.dialysis = None;
        // The eGFR branch decides before dialysis is consulted.
        assert_eq!(POAF.score(&r), Some(1));
        r.egfr = Some(80.0);
        assert_eq!(POAF.score(&r), None);
    }

    #[test]
    fn npoaf_severity_points() {
        let mut r = complete_record();
        r.age = Some(70);
        r.smvd = Some(true);
        assert_eq!(NPOAF.score(&r), Some(5));
        r.smvd = Some(false);
        r.mmvd = Some(true);
        r.lad = Some(true);
        assert_eq!(NPOAF.score(&r), Some(4));
    }

    #[test]
    fn simplified_full_house() {
        let mut r = complete_record();
        r.age = Some(66);
        r.hbp = Some(true);
        r.mi = Some(true);
        r.chf = Some(true);
        assert_eq!(SIMPLIFIED.score(&r), Some(7));
    }

    #[test]
    fn com_af_age_branches_stack_additively() {
        let mut r = complete_record();
        r.age = Some(70);
        assert_eq!(COM_AF.score(&r), Some(3));
        r.age = Some(80);
        assert_eq!(COM_AF.score(&r), Some(2));
    }

    #[test]
    fn scores_are_never_negative_and_sum_only_active_branches() {
        let r = complete_record();
        for name in ScoreName::ALL {
            assert_eq!(name.definition().score(&r), Some(0), "{name}");
        }
    }

    #[test]
    fn cut_point_classification() {
        assert!(AFRI.classify(2));
        assert!(!AFRI.classify(1));
        assert!(CHADS2_VASC.classify(4));
        assert!(!CHADS2_VASC.classify(3));
        assert!(POAF.classify(3));
        assert!(NPOAF.classify(2));
        assert!(SIMPLIFIED.classify(3));
        assert!(COM_AF.classify(3));
    }

    #[test]
    fn score_name_round_trips_through_column_names() {
        for name in ScoreName::ALL {
            assert_eq!(ScoreName::parse(name.column()), Some(name));
        }
        assert_eq!(ScoreName::parse("CHA2DS2-VASc"), Some(ScoreName::Chads2Vasc));
        assert_eq!(ScoreName::parse("unknown"), None);
    }

    #[test]
    fn score_set_reports_missing_as_absent() {
        let mut r = complete_record();
        r.gender = None;
        let set = ScoreSet::compute(&r);
        // Gender gates AFRI, CHA2DS2-VASc, and COM-AF; the rest survive.
        assert_eq!(set.afri, None);
        assert_eq!(set.chads2_vasc, None);
        assert_eq!(set.com_af, None);
        assert!(set.poaf.is_some());
        assert!(set.npoaf.is_some());
        assert!(set.simplified.is_some());
    }
}
