//! The strongly-typed per-admission data model.
//!
//! Every downstream stage (imputation, scoring, validation) operates on
//! `AdmissionRecord` rather than on loosely-keyed rows. A field that could
//! not be determined is `None`, and `None` is a real third state: it is never
//! collapsed to `false` or `0.0` anywhere in the crate. Score calculators
//! that touch a missing field report the whole score as undefined.

use serde::Serialize;
use std::fmt;

/// Patient gender as recorded on the admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Gender {
    Female,
    Male,
}

impl Gender {
    /// Parse the single-letter encoding used by the raw tables.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "F" => Some(Self::Female),
            "M" => Some(Self::Male),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Female => "F",
            Self::Male => "M",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the flat feature table: a single hospital admission that
/// underwent a qualifying procedure, with demographics, vitals, and the
/// boolean clinical indicators the risk scores consume.
///
/// Indicators are the logical OR across every diagnosis/procedure row of the
/// admission. The `af` field is the ground-truth outcome used by the
/// validator, not an input to any score.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AdmissionRecord {
    pub subject_id: i64,
    pub hadm_id: i64,

    /// Age in whole years at admission, floored.
    pub age: Option<i64>,
    pub gender: Option<Gender>,

    /// Height in cm.
    pub height: Option<f64>,
    /// Weight in kg.
    pub weight: Option<f64>,
    /// Serum creatinine in mg/dL.
    pub creatinine: Option<f64>,
    /// Estimated glomerular filtration rate, derived from creatinine.
    pub egfr: Option<f64>,

    /// Congestive heart failure.
    pub chf: Option<bool>,
    /// Hypertension.
    pub hbp: Option<bool>,
    /// Diabetes mellitus.
    pub dm: Option<bool>,
    /// History of stroke / transient ischemic attack.
    pub stroke: Option<bool>,
    /// Peripheral vascular disease.
    pub pvd: Option<bool>,
    /// Vascular disease (broad set).
    pub vd: Option<bool>,
    /// Left atrial dilation.
    pub lad: Option<bool>,
    /// Mild mitral valve disease.
    pub mmvd: Option<bool>,
    /// Moderate-to-severe mitral valve disease.
    pub smvd: Option<bool>,
    /// Chronic obstructive pulmonary disease.
    pub copd: Option<bool>,
    /// Intra-aortic balloon pump.
    pub iabp: Option<bool>,
    /// Combined valve/artery surgery.
    pub cvas: Option<bool>,
    /// Emergency admission.
    pub emergency: Option<bool>,
    /// Dialysis procedure.
    pub dialysis: Option<bool>,
    /// Myocardial infarction.
    pub mi: Option<bool>,

    /// Outcome: postoperative atrial fibrillation.
    pub af: Option<bool>,
}

impl AdmissionRecord {
    #[must_use]
    pub fn new(subject_id: i64, hadm_id: i64) -> Self {
        Self {
            subject_id,
            hadm_id,
            ..Self::default()
        }
    }

    /// The (subject, admission) identity of this record.
    #[must_use]
    pub const fn key(&self) -> (i64, i64) {
        (self.subject_id, self.hadm_id)
    }
}
