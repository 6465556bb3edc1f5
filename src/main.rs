use afrisk::export;
use afrisk::pipeline::{self, RawTablePaths};
use afrisk::scores::ScoreName;
use afrisk::validate;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(
    name = "afrisk",
    about = "Compute and validate post-CABG atrial fibrillation risk scores",
    long_about = "A batch pipeline that extracts per-admission clinical features from raw \
                 hospital tables, imputes missing vitals, computes six published AF risk \
                 scores, and validates each score against the observed outcome."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract features from the raw tables and write the creatinine handoff
    #[command(about = "Extract features (outputs: pending creatinine CSV)")]
    Extract {
        /// Directory containing the six raw CSV tables
        #[arg(long, value_name = "DIR")]
        input_dir: PathBuf,

        /// Output path for the pending-creatinine handoff table
        #[arg(long, default_value = "na_creatinine.csv")]
        pending: PathBuf,
    },

    /// Score every admission once the completed creatinine is available
    #[command(about = "Compute the six risk scores (outputs: risk table CSV)")]
    Score {
        /// Directory containing the six raw CSV tables
        #[arg(long, value_name = "DIR")]
        input_dir: PathBuf,

        /// Completed creatinine table from the external imputation
        #[arg(long, default_value = "imp_creatinine.csv")]
        completed: PathBuf,

        /// Output path for the per-admission feature+score table
        #[arg(long, default_value = "risk.csv")]
        output: PathBuf,
    },

    /// Validate one score against the outcomes in a risk table
    #[command(about = "Print diagnostic statistics for one score")]
    Validate {
        /// Risk table produced by the score subcommand
        #[arg(long, default_value = "risk.csv")]
        risk_table: PathBuf,

        /// Score to validate: afri, chads2, poaf, npoaf, simplified, comaf
        score: String,

        /// Optional new-patient score to rank within the population
        #[arg(long)]
        patient: Option<u32>,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Extract { input_dir, pending } => extract_command(&input_dir, &pending),
        Commands::Score {
            input_dir,
            completed,
            output,
        } => score_command(&input_dir, &completed, &output),
        Commands::Validate {
            risk_table,
            score,
            patient,
        } => validate_command(&risk_table, &score, patient),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn table_paths(input_dir: &std::path::Path) -> RawTablePaths {
    RawTablePaths {
        procedures: input_dir.join("PROCEDURES_ICD.csv"),
        diagnoses: input_dir.join("DIAGNOSES_ICD.csv"),
        admissions: input_dir.join("ADMISSIONS.csv"),
        patients: input_dir.join("PATIENTS.csv"),
        vitals: input_dir.join("vitals.csv"),
        notes: input_dir.join("NOTEEVENTS.csv"),
    }
}

fn extract_command(
    input_dir: &std::path::Path,
    pending: &std::path::Path,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Loading raw tables from: {}", input_dir.display());
    let records = pipeline::extract_stage(&table_paths(input_dir))?;
    println!("Extracted {} qualifying admissions", records.len());

    let missing = records.iter().filter(|r| r.creatinine.is_none()).count();
    export::write_pending_creatinine(pending, &records)?;
    println!(
        "Creatinine handoff written to: {} ({} of {} rows still missing)",
        pending.display(),
        missing,
        records.len()
    );
    Ok(())
}

fn score_command(
    input_dir: &std::path::Path,
    completed: &std::path::Path,
    output: &std::path::Path,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Loading raw tables from: {}", input_dir.display());
    let records = pipeline::extract_stage(&table_paths(input_dir))?;
    println!("Extracted {} qualifying admissions", records.len());

    println!("Loading completed creatinine from: {}", completed.display());
    let creatinine = export::read_completed_creatinine(completed)?;
    println!("Loaded {} completed values", creatinine.len());

    let population = pipeline::score_stage(records, &creatinine);
    export::write_risk_table(output, &population)?;
    println!("Risk table saved to: {}", output.display());
    Ok(())
}

fn validate_command(
    risk_table: &std::path::Path,
    score: &str,
    patient: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(name) = ScoreName::parse(score) else {
        return Err(format!(
            "unknown score '{score}'; expected one of afri, chads2, poaf, npoaf, simplified, comaf"
        )
        .into());
    };

    println!("Loading risk table from: {}", risk_table.display());
    let population = export::read_risk_table(risk_table)?;
    println!("Loaded {} scored admissions", population.len());

    let result = validate::validate_score(&population, name, patient);
    println!();
    println!("{} (positive at score >= {})", name, result.cut_point);
    println!(
        "  confusion: TP={} FP={} FN={} TN={}",
        result.counts.true_positive,
        result.counts.false_positive,
        result.counts.false_negative,
        result.counts.true_negative
    );
    println!("  sensitivity: {}", fmt_percent(result.sensitivity));
    println!("  specificity: {}", fmt_percent(result.specificity));
    println!("  PPV: {}", fmt_percent(result.positive_predictive_value));
    println!("  NPV: {}", fmt_percent(result.negative_predictive_value));
    match result.odds_ratio {
        Some(or) => println!(
            "  odds ratio per point: {:.2} (95% CI {:.2}-{:.2})",
            or.estimate, or.ci_lower, or.ci_upper
        ),
        None => println!("  odds ratio per point: not computable"),
    }
    if let Some(p) = result.percentile {
        println!("  patient percentile: {p}");
    }
    Ok(())
}

fn fmt_percent(value: Option<i64>) -> String {
    match value {
        Some(v) => format!("{v}%"),
        None => "not computable".to_string(),
    }
}
