//! Flat-file interchange: the per-admission risk table the dashboard
//! consumes, and the creatinine handoff to the external multiple-imputation
//! collaborator.
//!
//! Writers emit plain delimited text through a buffered writer; a missing
//! value is an empty field, never a sentinel. Readers go back through the
//! same schema-validated polars path as the raw tables.

use crate::data::{self, DataError};
use crate::records::{AdmissionRecord, Gender};
use crate::scores::{ScoreName, ScoreSet, ScoredAdmission};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const RISK_COLUMNS: [&str; 30] = [
    "subject_id",
    "hadm_id",
    "height",
    "weight",
    "gender",
    "age",
    "creatinine",
    "eGFR",
    "chf",
    "hbp",
    "dm",
    "stroke",
    "pvd",
    "vd",
    "lad",
    "mmvd",
    "smvd",
    "copd",
    "iabp",
    "cvas",
    "emergency",
    "dialysis",
    "mi",
    "AF",
    "poaf",
    "chads2",
    "afri",
    "npoaf",
    "simplified",
    "comaf",
];

const PENDING_COLUMNS: [&str; 7] = [
    "subject_id",
    "hadm_id",
    "height",
    "weight",
    "creatinine",
    "gender",
    "age",
];

/// Write the full feature+score table, one row per scored admission.
pub fn write_risk_table(path: &Path, population: &[ScoredAdmission]) -> Result<(), DataError> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "{}", RISK_COLUMNS.join(","))?;
    for row in population {
        let r = &row.record;
        let s = &row.scores;
        let fields = [
            r.subject_id.to_string(),
            r.hadm_id.to_string(),
            opt_float(r.height),
            opt_float(r.weight),
            opt_gender(r.gender),
            opt_int(r.age),
            opt_float(r.creatinine),
            opt_float(r.egfr),
            opt_flag(r.chf),
            opt_flag(r.hbp),
            opt_flag(r.dm),
            opt_flag(r.stroke),
            opt_flag(r.pvd),
            opt_flag(r.vd),
            opt_flag(r.lad),
            opt_flag(r.mmvd),
            opt_flag(r.smvd),
            opt_flag(r.copd),
            opt_flag(r.iabp),
            opt_flag(r.cvas),
            opt_flag(r.emergency),
            opt_flag(r.dialysis),
            opt_flag(r.mi),
            opt_flag(r.af),
            opt_score(s.poaf),
            opt_score(s.chads2_vasc),
            opt_score(s.afri),
            opt_score(s.npoaf),
            opt_score(s.simplified),
            opt_score(s.com_af),
        ];
        writeln!(writer, "{}", fields.join(","))?;
    }
    writer.flush()?;
    Ok(())
}

/// Load a previously written risk table back into scored records.
pub fn read_risk_table(path: &Path) -> Result<Vec<ScoredAdmission>, DataError> {
    let df = data::read_csv(path)?;
    data::require_columns(&df, &RISK_COLUMNS)?;

    let subjects = data::id_column(&df, "subject_id")?;
    let admissions = data::id_column(&df, "hadm_id")?;
    let heights = data::float_column(&df, "height")?;
    let weights = data::float_column(&df, "weight")?;
    let genders = data::string_column(&df, "gender")?;
    let ages = data::int_column(&df, "age")?;
    let creatinines = data::float_column(&df, "creatinine")?;
    let egfrs = data::float_column(&df, "eGFR")?;

    let flag_columns = [
        "chf",
        "hbp",
        "dm",
        "stroke",
        "pvd",
        "vd",
        "lad",
        "mmvd",
        "smvd",
        "copd",
        "iabp",
        "cvas",
        "emergency",
        "dialysis",
        "mi",
        "AF",
    ];
    let mut flags = Vec::with_capacity(flag_columns.len());
    for name in flag_columns {
        flags.push(data::int_column(&df, name)?);
    }

    let mut score_columns = Vec::with_capacity(ScoreName::ALL.len());
    for name in ScoreName::ALL {
        score_columns.push(data::int_column(&df, name.column())?);
    }

    let mut population = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let mut record = AdmissionRecord::new(subjects[i], admissions[i]);
        record.height = heights[i];
        record.weight = weights[i];
        record.gender = genders[i].as_deref().and_then(Gender::parse);
        record.age = ages[i];
        record.creatinine = creatinines[i];
        record.egfr = egfrs[i];

        let slots = [
            &mut record.chf,
            &mut record.hbp,
            &mut record.dm,
            &mut record.stroke,
            &mut record.pvd,
            &mut record.vd,
            &mut record.lad,
            &mut record.mmvd,
            &mut record.smvd,
            &mut record.copd,
            &mut record.iabp,
            &mut record.cvas,
            &mut record.emergency,
            &mut record.dialysis,
            &mut record.mi,
            &mut record.af,
        ];
        for (slot, column) in slots.into_iter().zip(&flags) {
            *slot = column[i].map(|v| v != 0);
        }

        let mut scores = ScoreSet::default();
        for (&name, column) in ScoreName::ALL.iter().zip(&score_columns) {
            let value = column[i].map(|v| v as u32);
            match name {
                ScoreName::Afri => scores.afri = value,
                ScoreName::Chads2Vasc => scores.chads2_vasc = value,
                ScoreName::Poaf => scores.poaf = value,
                ScoreName::Npoaf => scores.npoaf = value,
                ScoreName::Simplified => scores.simplified = value,
                ScoreName::ComAf => scores.com_af = value,
            }
        }

        population.push(ScoredAdmission { record, scores });
    }
    Ok(population)
}

/// Write the creatinine handoff table for the external imputation
/// collaborator. Every admission goes out, measured or not: the imputer
/// needs the complete covariate columns to model the gaps.
pub fn write_pending_creatinine(
    path: &Path,
    records: &[AdmissionRecord],
) -> Result<(), DataError> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "{}", PENDING_COLUMNS.join(","))?;
    for r in records {
        let fields = [
            r.subject_id.to_string(),
            r.hadm_id.to_string(),
            opt_float(r.height),
            opt_float(r.weight),
            opt_float(r.creatinine),
            opt_gender(r.gender),
            opt_int(r.age),
        ];
        writeln!(writer, "{}", fields.join(","))?;
    }
    writer.flush()?;
    Ok(())
}

/// Read the completed creatinine column back as (subject, admission, value)
/// triples. Rows the collaborator still left empty are skipped with a
/// warning.
pub fn read_completed_creatinine(path: &Path) -> Result<Vec<(i64, i64, f64)>, DataError> {
    let df = data::read_csv(path)?;
    data::require_columns(&df, &["subject_id", "hadm_id", "creatinine"])?;
    let subjects = data::id_column(&df, "subject_id")?;
    let admissions = data::id_column(&df, "hadm_id")?;
    let creatinines = data::float_column(&df, "creatinine")?;

    let mut completed = Vec::with_capacity(df.height());
    for ((subject_id, hadm_id), creatinine) in
        subjects.into_iter().zip(admissions).zip(creatinines)
    {
        match creatinine {
            Some(value) => completed.push((subject_id, hadm_id, value)),
            None => {
                log::warn!("({subject_id}, {hadm_id}): completed creatinine still missing");
            }
        }
    }
    Ok(completed)
}

fn opt_float(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn opt_int(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn opt_score(value: Option<u32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn opt_flag(value: Option<bool>) -> String {
    value.map(|v| i32::from(v).to_string()).unwrap_or_default()
}

fn opt_gender(value: Option<Gender>) -> String {
    value.map(|g| g.as_str().to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scores::ScoredAdmission;
    use tempfile::NamedTempFile;

    fn sample_population() -> Vec<ScoredAdmission> {
        let mut a = AdmissionRecord::new(1, 100);
        a.gender = Some(Gender::Female);
        a.age = Some(72);
        a.height = Some(161.5);
        a.weight = Some(70.0);
        a.creatinine = Some(1.1);
        a.egfr = Some(52.3);
        a.chf = Some(true);
        a.hbp = Some(false);
        a.af = Some(true);
        let mut sa = ScoreSet::default();
        sa.afri = Some(3);
        sa.poaf = Some(4);

        let mut b = AdmissionRecord::new(2, 200);
        b.gender = None;
        b.af = Some(false);
        let sb = ScoreSet::default();

        vec![
            ScoredAdmission {
                record: a,
                scores: sa,
            },
            ScoredAdmission {
                record: b,
                scores: sb,
            },
        ]
    }

    #[test]
    fn risk_table_round_trips_including_missing_values() {
        let population = sample_population();
        let file = NamedTempFile::new().unwrap();
        write_risk_table(file.path(), &population).unwrap();
        let loaded = read_risk_table(file.path()).unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].record, population[0].record);
        assert_eq!(loaded[0].scores.afri, Some(3));
        assert_eq!(loaded[0].scores.chads2_vasc, None);
        assert_eq!(loaded[1].record.gender, None);
        assert_eq!(loaded[1].record.af, Some(false));
    }

    #[test]
    fn missing_values_are_empty_fields_not_zero() {
        let population = sample_population();
        let file = NamedTempFile::new().unwrap();
        write_risk_table(file.path(), &population).unwrap();
        let text = std::fs::read_to_string(file.path()).unwrap();
        let second = text.lines().nth(2).unwrap();
        assert!(second.starts_with("2,200,,,,"), "row was: {second}");
    }

    #[test]
    fn pending_creatinine_lists_every_admission() {
        let population = sample_population();
        let records: Vec<AdmissionRecord> =
            population.into_iter().map(|p| p.record).collect();
        let file = NamedTempFile::new().unwrap();
        write_pending_creatinine(file.path(), &records).unwrap();
        let text = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.starts_with("subject_id,hadm_id,height,weight,creatinine,gender,age\n"));
    }

    #[test]
    fn completed_creatinine_skips_rows_still_missing() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"subject_id,hadm_id,creatinine\n1,100,1.4\n2,200,\n")
            .unwrap();
        file.flush().unwrap();
        let completed = read_completed_creatinine(file.path()).unwrap();
        assert_eq!(completed, vec![(1, 100, 1.4)]);
    }
}
