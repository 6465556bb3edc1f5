//! Missing-value imputation for the continuous vitals.
//!
//! The fallback order is fixed: keep a measured value; else the subject's
//! own median across their admissions; else the median of the (age-bin ×
//! gender) cohort. Creatinine stops after the subject-median step — the
//! hardest gaps go to an external multiple-imputation collaborator and come
//! back as a completed column. A cohort with no usable reference value
//! leaves the field `None`; an unfillable gap must stay visible rather than
//! quietly become zero.

use crate::records::{AdmissionRecord, Gender};
use std::collections::HashMap;

/// Fixed age bins used to form imputation cohorts.
const AGE_BIN_EDGES: [i64; 5] = [46, 55, 65, 75, 90];

/// Index of the cohort age bin for an age: `<=46`, `47-55`, `56-65`,
/// `66-75`, `76-90`, `>90`.
#[must_use]
pub fn age_bin(age: i64) -> u8 {
    for (i, edge) in AGE_BIN_EDGES.iter().enumerate() {
        if age <= *edge {
            return i as u8 + 1;
        }
    }
    AGE_BIN_EDGES.len() as u8 + 1
}

/// Median of a sample, `None` when empty. Even-length samples average the
/// two central values.
#[must_use]
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

/// Run the full fallback hierarchy over the extracted records, in place.
///
/// Height and weight go through both fallback steps. Creatinine only gets
/// the subject-median step; whatever is still missing afterwards is the
/// external collaborator's problem (see [`apply_completed_creatinine`]).
pub fn impute_vitals(records: &mut [AdmissionRecord]) {
    fill_from_subject_median(records, |r| &mut r.height);
    fill_from_subject_median(records, |r| &mut r.weight);
    fill_from_subject_median(records, |r| &mut r.creatinine);

    fill_from_cohort_median(records, "height", |r| &mut r.height);
    fill_from_cohort_median(records, "weight", |r| &mut r.weight);
}

/// Overwrite creatinine with an externally completed column, matched by
/// (subject, admission) key. Keys absent from the completed column keep
/// whatever they had.
pub fn apply_completed_creatinine(
    records: &mut [AdmissionRecord],
    completed: &[(i64, i64, f64)],
) {
    let by_key: HashMap<(i64, i64), f64> = completed
        .iter()
        .map(|&(subject_id, hadm_id, value)| ((subject_id, hadm_id), value))
        .collect();
    for record in records.iter_mut() {
        if let Some(&value) = by_key.get(&record.key()) {
            record.creatinine = Some(value);
        }
    }
}

/// Derive eGFR for every record with completed creatinine, gender, and age,
/// using the CKD-EPI 2009 creatinine equation. Records missing any input
/// keep `egfr = None`.
pub fn derive_egfr(records: &mut [AdmissionRecord]) {
    for record in records.iter_mut() {
        record.egfr = match (record.creatinine, record.gender, record.age) {
            (Some(creatinine), Some(gender), Some(age)) => {
                Some(ckd_epi(creatinine, gender, age))
            }
            _ => None,
        };
    }
}

/// CKD-EPI 2009 estimated glomerular filtration rate.
#[must_use]
pub fn ckd_epi(creatinine: f64, gender: Gender, age: i64) -> f64 {
    let (kappa, alpha, factor) = match gender {
        Gender::Female => (0.7, -0.329, 144.0),
        Gender::Male => (0.9, -0.411, 141.0),
    };
    let exponent = if creatinine <= kappa { alpha } else { -1.209 };
    factor * (creatinine / kappa).powf(exponent) * 0.993_f64.powi(age as i32)
}

fn fill_from_subject_median(
    records: &mut [AdmissionRecord],
    field: impl Fn(&mut AdmissionRecord) -> &mut Option<f64>,
) {
    let mut by_subject: HashMap<i64, Vec<f64>> = HashMap::new();
    for record in records.iter_mut() {
        let subject_id = record.subject_id;
        if let Some(value) = *field(record) {
            by_subject.entry(subject_id).or_default().push(value);
        }
    }
    for record in records.iter_mut() {
        let subject_id = record.subject_id;
        let slot = field(record);
        if slot.is_none() {
            if let Some(values) = by_subject.get(&subject_id) {
                *slot = median(values);
            }
        }
    }
}

fn fill_from_cohort_median(
    records: &mut [AdmissionRecord],
    label: &str,
    field: impl Fn(&mut AdmissionRecord) -> &mut Option<f64>,
) {
    // Cohort medians are computed after the subject-median pass, matching
    // the reference population the clinical thresholds were derived on.
    let mut by_cohort: HashMap<(u8, Gender), Vec<f64>> = HashMap::new();
    for record in records.iter_mut() {
        let cohort = record.age.zip(record.gender);
        if let (Some((age, gender)), Some(value)) = (cohort, *field(record)) {
            by_cohort
                .entry((age_bin(age), gender))
                .or_default()
                .push(value);
        }
    }
    for record in records.iter_mut() {
        let key = record.key();
        let cohort = record.age.zip(record.gender);
        let slot = field(record);
        if slot.is_some() {
            continue;
        }
        let Some((age, gender)) = cohort else {
            log::warn!("{key:?}: cannot cohort-impute {label} without age and gender");
            continue;
        };
        match by_cohort.get(&(age_bin(age), gender)).and_then(|v| median(v)) {
            Some(value) => *slot = Some(value),
            None => {
                // The gap stays visible downstream.
                log::warn!(
                    "{key:?}: cohort (bin {}, {gender}) has no reference {label}; leaving missing",
                    age_bin(age)
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn record(subject_id: i64, hadm_id: i64) -> AdmissionRecord {
        AdmissionRecord::new(subject_id, hadm_id)
    }

    #[test]
    fn age_bins_match_the_fixed_edges() {
        assert_eq!(age_bin(30), 1);
        assert_eq!(age_bin(46), 1);
        assert_eq!(age_bin(47), 2);
        assert_eq!(age_bin(55), 2);
        assert_eq!(age_bin(56), 3);
        assert_eq!(age_bin(66), 4);
        assert_eq!(age_bin(76), 5);
        assert_eq!(age_bin(90), 5);
        assert_eq!(age_bin(91), 6);
    }

    #[test]
    fn median_handles_odd_even_and_empty() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[3.0]), Some(3.0));
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
    }

    #[test]
    fn subject_median_takes_precedence_over_cohort_median() {
        // Subject 1 has one measured height and one missing; subject 2's
        // cohort median would disagree.
        let mut a = record(1, 100);
        a.age = Some(70);
        a.gender = Some(Gender::Male);
        a.height = Some(180.0);
        let mut b = record(1, 101);
        b.age = Some(70);
        b.gender = Some(Gender::Male);
        let mut c = record(2, 200);
        c.age = Some(70);
        c.gender = Some(Gender::Male);
        c.height = Some(160.0);

        let mut records = vec![a, b, c];
        impute_vitals(&mut records);
        assert_eq!(records[1].height, Some(180.0));
    }

    #[test]
    fn cohort_median_fills_when_subject_has_no_measurements() {
        let mut a = record(1, 100);
        a.age = Some(70);
        a.gender = Some(Gender::Female);
        let mut b = record(2, 200);
        b.age = Some(68);
        b.gender = Some(Gender::Female);
        b.weight = Some(64.0);
        let mut c = record(3, 300);
        c.age = Some(74);
        c.gender = Some(Gender::Female);
        c.weight = Some(70.0);

        let mut records = vec![a, b, c];
        impute_vitals(&mut records);
        assert_eq!(records[0].weight, Some(67.0));
    }

    #[test]
    fn empty_cohort_leaves_the_value_missing() {
        // The only other record is in a different gender cohort.
        let mut a = record(1, 100);
        a.age = Some(70);
        a.gender = Some(Gender::Female);
        let mut b = record(2, 200);
        b.age = Some(70);
        b.gender = Some(Gender::Male);
        b.height = Some(175.0);

        let mut records = vec![a, b];
        impute_vitals(&mut records);
        assert_eq!(records[0].height, None);
    }

    #[test]
    fn creatinine_never_uses_the_cohort_fallback() {
        let mut a = record(1, 100);
        a.age = Some(70);
        a.gender = Some(Gender::Male);
        let mut b = record(2, 200);
        b.age = Some(70);
        b.gender = Some(Gender::Male);
        b.creatinine = Some(1.2);

        let mut records = vec![a, b];
        impute_vitals(&mut records);
        assert_eq!(records[0].creatinine, None);
    }

    #[test]
    fn completed_creatinine_overwrites_by_key() {
        let a = record(1, 100);
        let mut b = record(2, 200);
        b.creatinine = Some(0.9);
        let mut records = vec![a, b];
        apply_completed_creatinine(&mut records, &[(1, 100, 1.4)]);
        assert_eq!(records[0].creatinine, Some(1.4));
        assert_eq!(records[1].creatinine, Some(0.9));
    }

    #[test]
    fn ckd_epi_matches_published_anchor_points() {
        // At the gender-specific kappa the ratio term is 1, leaving only
        // the scaling factor and the age decay.
        assert_relative_eq!(ckd_epi(0.7, Gender::Female, 0), 144.0);
        assert_relative_eq!(ckd_epi(0.9, Gender::Male, 0), 141.0);
        let egfr = ckd_epi(1.2, Gender::Male, 60);
        assert!(egfr > 60.0 && egfr < 80.0, "unexpected eGFR {egfr}");
    }

    #[test]
    fn egfr_requires_all_three_inputs() {
        let mut a = record(1, 100);
        a.creatinine = Some(1.0);
        a.age = Some(70);
        let mut records = vec![a];
        derive_egfr(&mut records);
        assert_eq!(records[0].egfr, None);

        records[0].gender = Some(Gender::Male);
        derive_egfr(&mut records);
        assert!(records[0].egfr.is_some());
    }
}
