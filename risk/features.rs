//! The feature extractor: raw clinical tables in, one `AdmissionRecord` per
//! qualifying (subject, admission) pair out.
//!
//! An admission qualifies when any of its procedure codes is in the CABG
//! set; everything else is outside the target population and is dropped
//! without comment. Indicators are the logical OR over every diagnosis or
//! procedure row of the admission, so row multiplicity never matters.

use crate::codes::{self, CodeSet};
use crate::data::{
    AdmissionRow, DiagnosisRow, NoteRow, PatientRow, ProcedureRow, VitalsRow,
};
use crate::impute::median;
use crate::records::AdmissionRecord;
use std::collections::{BTreeSet, HashMap};

/// The phrase in a discharge summary that marks mitral valve disease as
/// mild. Admissions with a mitral diagnosis code but no phrase match default
/// to the moderate/severe category.
const MILD_MITRAL_PHRASE: &str = "mild mitral";

const DISCHARGE_SUMMARY: &str = "Discharge summary";

/// The six raw tables the extractor joins.
#[derive(Debug, Default)]
pub struct RawTables {
    pub procedures: Vec<ProcedureRow>,
    pub diagnoses: Vec<DiagnosisRow>,
    pub admissions: Vec<AdmissionRow>,
    pub patients: Vec<PatientRow>,
    pub vitals: Vec<VitalsRow>,
    pub notes: Vec<NoteRow>,
}

/// Join the raw tables into one record per qualifying admission, ordered by
/// (subject, admission) key.
pub fn extract(raw: &RawTables) -> Vec<AdmissionRecord> {
    let qualifying: BTreeSet<(i64, i64)> = raw
        .procedures
        .iter()
        .filter(|p| codes::CABG.contains(&p.icd9_code))
        .map(|p| (p.subject_id, p.hadm_id))
        .collect();

    let mut diagnoses: HashMap<(i64, i64), Vec<&str>> = HashMap::new();
    for d in &raw.diagnoses {
        diagnoses
            .entry((d.subject_id, d.hadm_id))
            .or_default()
            .push(&d.icd9_code);
    }

    let mut procedures: HashMap<(i64, i64), Vec<&str>> = HashMap::new();
    for p in &raw.procedures {
        procedures
            .entry((p.subject_id, p.hadm_id))
            .or_default()
            .push(&p.icd9_code);
    }

    let mut admissions: HashMap<(i64, i64), &AdmissionRow> = HashMap::new();
    for a in &raw.admissions {
        admissions.entry((a.subject_id, a.hadm_id)).or_insert(a);
    }

    let mut patients: HashMap<i64, &PatientRow> = HashMap::new();
    for p in &raw.patients {
        patients.entry(p.subject_id).or_insert(p);
    }

    let mut vitals: HashMap<(i64, i64), VitalsSamples> = HashMap::new();
    for v in &raw.vitals {
        let entry = vitals.entry((v.subject_id, v.hadm_id)).or_default();
        entry.heights.extend(v.height);
        entry.weights.extend(v.weight);
        entry.creatinines.extend(v.creatinine);
    }

    let mut mild_phrase: HashMap<(i64, i64), bool> = HashMap::new();
    for n in &raw.notes {
        if !is_usable_discharge_note(n) {
            continue;
        }
        let matched = n
            .text
            .as_deref()
            .is_some_and(|t| t.to_lowercase().contains(MILD_MITRAL_PHRASE));
        let entry = mild_phrase.entry((n.subject_id, n.hadm_id)).or_insert(false);
        *entry |= matched;
    }

    let mut records = Vec::with_capacity(qualifying.len());
    for key in qualifying {
        let (subject_id, hadm_id) = key;
        let mut record = AdmissionRecord::new(subject_id, hadm_id);

        let diag: &[&str] = diagnoses.get(&key).map_or(&[], Vec::as_slice);
        let proc: &[&str] = procedures.get(&key).map_or(&[], Vec::as_slice);

        if let Some(patient) = patients.get(&subject_id) {
            record.gender = patient.gender;
            record.age = admissions
                .get(&key)
                .and_then(|a| a.admit_date)
                .zip(patient.birth_date)
                .and_then(|(admit, dob)| admit.years_since(dob))
                .map(i64::from);
        }

        if let Some(samples) = vitals.get(&key) {
            record.height = median(&samples.heights);
            record.weight = median(&samples.weights);
            record.creatinine = median(&samples.creatinines);
        }

        record.chf = Some(any_in(diag, &codes::CHF));
        record.hbp = Some(any_in(diag, &codes::HYPERTENSION));
        record.dm = Some(any_in(diag, &codes::DIABETES));
        record.stroke = Some(any_in(diag, &codes::STROKE));
        record.vd = Some(any_in(diag, &codes::VASCULAR_DISEASE));
        record.pvd = Some(any_in(diag, &codes::PERIPHERAL_VASCULAR));
        record.lad = Some(any_in(diag, &codes::LEFT_ATRIAL_DILATION));
        record.copd = Some(any_in(diag, &codes::COPD));
        record.mi = Some(any_in(diag, &codes::MYOCARDIAL_INFARCTION));
        record.af = Some(any_in(diag, &codes::AF_OUTCOME));

        // Severity tie-break: the diagnosis code alone says "mitral valve
        // disease"; only a phrase match in the notes downgrades it to mild.
        let mitral = any_in(diag, &codes::MITRAL_VALVE);
        let mild = mild_phrase.get(&key).copied().unwrap_or(false);
        record.mmvd = Some(mitral && mild);
        record.smvd = Some(mitral && !mild);

        record.iabp = Some(any_in(proc, &codes::IABP));
        record.cvas = Some(any_in(proc, &codes::COMBINED_VALVE_ARTERY));
        record.dialysis = Some(any_in(proc, &codes::DIALYSIS));

        record.emergency = admissions
            .get(&key)
            .and_then(|a| a.admission_type.as_deref())
            .map(|t| t.eq_ignore_ascii_case("EMERGENCY"));

        records.push(record);
    }
    records
}

#[derive(Debug, Default)]
struct VitalsSamples {
    heights: Vec<f64>,
    weights: Vec<f64>,
    creatinines: Vec<f64>,
}

fn any_in(row_codes: &[&str], set: &CodeSet) -> bool {
    row_codes.iter().any(|c| set.contains(c))
}

fn is_usable_discharge_note(note: &NoteRow) -> bool {
    let is_discharge = note
        .category
        .as_deref()
        .is_some_and(|c| c.trim() == DISCHARGE_SUMMARY);
    // A note flagged as entered in error never contributes.
    is_discharge && note.is_error.unwrap_or(0) == 0
}
