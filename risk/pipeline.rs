//! The two batch stages glued end to end.
//!
//! Stage one reads the six raw tables, extracts one record per qualifying
//! admission, and runs the in-cohort imputation passes. Stage two folds in
//! the externally completed creatinine, derives eGFR, and computes the six
//! scores. The split exists because the external imputation round trip
//! happens between them.

use crate::data::{self, DataError};
use crate::features::{self, RawTables};
use crate::impute;
use crate::records::AdmissionRecord;
use crate::scores::ScoredAdmission;
use std::path::PathBuf;

/// Locations of the six raw input tables.
#[derive(Debug, Clone)]
pub struct RawTablePaths {
    pub procedures: PathBuf,
    pub diagnoses: PathBuf,
    pub admissions: PathBuf,
    pub patients: PathBuf,
    pub vitals: PathBuf,
    pub notes: PathBuf,
}

/// Load, extract, and impute: everything up to the external creatinine
/// handoff.
pub fn extract_stage(paths: &RawTablePaths) -> Result<Vec<AdmissionRecord>, DataError> {
    let raw = RawTables {
        procedures: data::load_procedures(&paths.procedures)?,
        diagnoses: data::load_diagnoses(&paths.diagnoses)?,
        admissions: data::load_admissions(&paths.admissions)?,
        patients: data::load_patients(&paths.patients)?,
        vitals: data::load_vitals(&paths.vitals)?,
        notes: data::load_notes(&paths.notes)?,
    };
    log::info!(
        "loaded {} procedure, {} diagnosis, {} admission, {} patient, {} vitals, {} note rows",
        raw.procedures.len(),
        raw.diagnoses.len(),
        raw.admissions.len(),
        raw.patients.len(),
        raw.vitals.len(),
        raw.notes.len()
    );

    let mut records = features::extract(&raw);
    log::info!("extracted {} qualifying admissions", records.len());
    impute::impute_vitals(&mut records);
    Ok(records)
}

/// Fold in the completed creatinine, derive eGFR, and score everything.
#[must_use]
pub fn score_stage(
    mut records: Vec<AdmissionRecord>,
    completed_creatinine: &[(i64, i64, f64)],
) -> Vec<ScoredAdmission> {
    impute::apply_completed_creatinine(&mut records, completed_creatinine);
    impute::derive_egfr(&mut records);
    records.into_iter().map(ScoredAdmission::from_record).collect()
}
