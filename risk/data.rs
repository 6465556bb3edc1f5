//! Raw table ingestion and schema validation.
//!
//! This module is the exclusive entry point for tabular input. It reads
//! delimited text files with polars, validates the presence and type of
//! every required column once, and hands the rest of the crate plain typed
//! row structs. Nothing downstream ever looks a field up by string key.
//!
//! Failures are assumed to be user-input errors, so the `DataError` variants
//! carry actionable messages. A malformed individual value (for example an
//! unparseable date) is a row-local problem: the value becomes `None` and is
//! logged, and the batch continues.

use crate::records::Gender;
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

/// A comprehensive error type for all loading and validation failures.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("error from the underlying DataFrame library: {0}")]
    Polars(#[from] PolarsError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("the required column '{0}' was not found in the input file; check spelling and case")]
    ColumnNotFound(String),
    #[error(
        "the required column '{column_name}' could not be converted to type '{expected_type}' (found type: {found_type})"
    )]
    ColumnWrongType {
        column_name: String,
        expected_type: &'static str,
        found_type: String,
    },
    #[error("missing or null values were found in the key column '{0}'")]
    MissingKeyValues(String),
}

/// One row of the procedures table.
#[derive(Debug, Clone)]
pub struct ProcedureRow {
    pub subject_id: i64,
    pub hadm_id: i64,
    pub icd9_code: String,
}

/// One row of the diagnoses table.
#[derive(Debug, Clone)]
pub struct DiagnosisRow {
    pub subject_id: i64,
    pub hadm_id: i64,
    pub icd9_code: String,
}

/// One row of the admissions table.
#[derive(Debug, Clone)]
pub struct AdmissionRow {
    pub subject_id: i64,
    pub hadm_id: i64,
    pub admit_date: Option<NaiveDate>,
    pub admission_type: Option<String>,
}

/// One row of the patients table.
#[derive(Debug, Clone)]
pub struct PatientRow {
    pub subject_id: i64,
    pub gender: Option<Gender>,
    pub birth_date: Option<NaiveDate>,
}

/// One row of the vitals/labs extract: a single (possibly hourly)
/// measurement set for an admission.
#[derive(Debug, Clone)]
pub struct VitalsRow {
    pub subject_id: i64,
    pub hadm_id: i64,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub creatinine: Option<f64>,
}

/// One row of the clinical notes table.
#[derive(Debug, Clone)]
pub struct NoteRow {
    pub subject_id: i64,
    pub hadm_id: i64,
    pub category: Option<String>,
    pub is_error: Option<i64>,
    pub text: Option<String>,
}

pub fn load_procedures(path: &Path) -> Result<Vec<ProcedureRow>, DataError> {
    let df = read_csv(path)?;
    require_columns(&df, &["SUBJECT_ID", "HADM_ID", "ICD9_CODE"])?;
    let subjects = id_column(&df, "SUBJECT_ID")?;
    let admissions = id_column(&df, "HADM_ID")?;
    let codes = string_column(&df, "ICD9_CODE")?;

    let mut rows = Vec::with_capacity(df.height());
    for ((subject_id, hadm_id), code) in subjects.into_iter().zip(admissions).zip(codes) {
        let Some(icd9_code) = code else {
            log::warn!("procedure row for ({subject_id}, {hadm_id}) has no code; skipping");
            continue;
        };
        rows.push(ProcedureRow {
            subject_id,
            hadm_id,
            icd9_code,
        });
    }
    Ok(rows)
}

pub fn load_diagnoses(path: &Path) -> Result<Vec<DiagnosisRow>, DataError> {
    let df = read_csv(path)?;
    require_columns(&df, &["SUBJECT_ID", "HADM_ID", "ICD9_CODE"])?;
    let subjects = id_column(&df, "SUBJECT_ID")?;
    let admissions = id_column(&df, "HADM_ID")?;
    let codes = string_column(&df, "ICD9_CODE")?;

    let mut rows = Vec::with_capacity(df.height());
    for ((subject_id, hadm_id), code) in subjects.into_iter().zip(admissions).zip(codes) {
        let Some(icd9_code) = code else {
            log::warn!("diagnosis row for ({subject_id}, {hadm_id}) has no code; skipping");
            continue;
        };
        rows.push(DiagnosisRow {
            subject_id,
            hadm_id,
            icd9_code,
        });
    }
    Ok(rows)
}

pub fn load_admissions(path: &Path) -> Result<Vec<AdmissionRow>, DataError> {
    let df = read_csv(path)?;
    require_columns(&df, &["SUBJECT_ID", "HADM_ID", "ADMITTIME", "ADMISSION_TYPE"])?;
    let subjects = id_column(&df, "SUBJECT_ID")?;
    let admissions = id_column(&df, "HADM_ID")?;
    let admit_times = string_column(&df, "ADMITTIME")?;
    let types = string_column(&df, "ADMISSION_TYPE")?;

    let mut rows = Vec::with_capacity(df.height());
    for (((subject_id, hadm_id), admit), admission_type) in
        subjects.into_iter().zip(admissions).zip(admit_times).zip(types)
    {
        let admit_date = admit.as_deref().and_then(|s| parse_date(s, "ADMITTIME"));
        rows.push(AdmissionRow {
            subject_id,
            hadm_id,
            admit_date,
            admission_type,
        });
    }
    Ok(rows)
}

pub fn load_patients(path: &Path) -> Result<Vec<PatientRow>, DataError> {
    let df = read_csv(path)?;
    require_columns(&df, &["SUBJECT_ID", "GENDER", "DOB"])?;
    let subjects = id_column(&df, "SUBJECT_ID")?;
    let genders = string_column(&df, "GENDER")?;
    let dobs = string_column(&df, "DOB")?;

    let mut rows = Vec::with_capacity(df.height());
    for ((subject_id, gender), dob) in subjects.into_iter().zip(genders).zip(dobs) {
        let gender = gender.as_deref().and_then(Gender::parse);
        let birth_date = dob.as_deref().and_then(|s| parse_date(s, "DOB"));
        rows.push(PatientRow {
            subject_id,
            gender,
            birth_date,
        });
    }
    Ok(rows)
}

pub fn load_vitals(path: &Path) -> Result<Vec<VitalsRow>, DataError> {
    let df = read_csv(path)?;
    require_columns(&df, &["subject_id", "hadm_id", "height", "weight", "creatinine"])?;
    let subjects = id_column(&df, "subject_id")?;
    let admissions = id_column(&df, "hadm_id")?;
    let heights = float_column(&df, "height")?;
    let weights = float_column(&df, "weight")?;
    let creatinines = float_column(&df, "creatinine")?;

    let mut rows = Vec::with_capacity(df.height());
    for ((((subject_id, hadm_id), height), weight), creatinine) in subjects
        .into_iter()
        .zip(admissions)
        .zip(heights)
        .zip(weights)
        .zip(creatinines)
    {
        rows.push(VitalsRow {
            subject_id,
            hadm_id,
            height,
            weight,
            creatinine,
        });
    }
    Ok(rows)
}

pub fn load_notes(path: &Path) -> Result<Vec<NoteRow>, DataError> {
    let df = read_csv(path)?;
    require_columns(&df, &["SUBJECT_ID", "HADM_ID", "CATEGORY", "ISERROR", "TEXT"])?;
    let subjects = id_column(&df, "SUBJECT_ID")?;
    let admissions = id_column(&df, "HADM_ID")?;
    let categories = string_column(&df, "CATEGORY")?;
    let errors = int_column(&df, "ISERROR")?;
    let texts = string_column(&df, "TEXT")?;

    let mut rows = Vec::with_capacity(df.height());
    for ((((subject_id, hadm_id), category), is_error), text) in subjects
        .into_iter()
        .zip(admissions)
        .zip(categories)
        .zip(errors)
        .zip(texts)
    {
        rows.push(NoteRow {
            subject_id,
            hadm_id,
            category,
            is_error,
            text,
        });
    }
    Ok(rows)
}

pub(crate) fn read_csv(path: &Path) -> Result<DataFrame, DataError> {
    let df = CsvReader::new(File::open(path)?)
        .with_options(CsvReadOptions::default().with_has_header(true))
        .finish()?;
    Ok(df)
}

pub(crate) fn require_columns(df: &DataFrame, cols: &[&str]) -> Result<(), DataError> {
    let present: HashSet<String> = df
        .get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();
    for col in cols {
        if !present.contains(*col) {
            return Err(DataError::ColumnNotFound((*col).to_string()));
        }
    }
    Ok(())
}

/// Extract a key column. Keys may never be null: a row without an identity
/// cannot be attributed to any admission.
pub(crate) fn id_column(df: &DataFrame, name: &str) -> Result<Vec<i64>, DataError> {
    let series = df.column(name)?;
    let casted = series
        .cast(&DataType::Int64)
        .map_err(|_| DataError::ColumnWrongType {
            column_name: name.to_string(),
            expected_type: "i64 (integer key)",
            found_type: format!("{:?}", series.dtype()),
        })?;
    if casted.null_count() > 0 {
        return Err(DataError::MissingKeyValues(name.to_string()));
    }
    let chunked = casted.i64()?.rechunk();
    Ok(chunked.into_no_null_iter().collect())
}

/// Extract a nullable numeric column as `Option<f64>` per row.
pub(crate) fn float_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, DataError> {
    let series = df.column(name)?;
    let casted = series
        .cast(&DataType::Float64)
        .map_err(|_| DataError::ColumnWrongType {
            column_name: name.to_string(),
            expected_type: "f64 (numeric)",
            found_type: format!("{:?}", series.dtype()),
        })?;
    let chunked = casted.f64()?.rechunk();
    Ok((&chunked).into_iter().collect())
}

/// Extract a nullable integer column as `Option<i64>` per row.
pub(crate) fn int_column(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>, DataError> {
    let series = df.column(name)?;
    let casted = series
        .cast(&DataType::Int64)
        .map_err(|_| DataError::ColumnWrongType {
            column_name: name.to_string(),
            expected_type: "i64 (integer)",
            found_type: format!("{:?}", series.dtype()),
        })?;
    let chunked = casted.i64()?.rechunk();
    Ok((&chunked).into_iter().collect())
}

/// Extract a nullable column as `Option<String>` per row. Numeric-looking
/// code columns are cast to their textual form, so "3610" matches whether
/// the file quoted it or not.
pub(crate) fn string_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, DataError> {
    let series = df.column(name)?;
    let casted = series
        .cast(&DataType::String)
        .map_err(|_| DataError::ColumnWrongType {
            column_name: name.to_string(),
            expected_type: "string",
            found_type: format!("{:?}", series.dtype()),
        })?;
    let chunked = casted.str()?.rechunk();
    Ok((&chunked)
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect())
}

/// Parse a timestamp or date string. An unparseable value is a row-local
/// defect: log it and return `None` so the row is excluded from any
/// date-dependent derivation without aborting the batch.
fn parse_date(raw: &str, column: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt.date());
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(d);
    }
    log::warn!("unparseable {column} value '{raw}'; treating as missing");
    None
}
